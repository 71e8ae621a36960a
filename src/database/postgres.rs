use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::{Error, ErrorKind, QueryError},
    pagination::{PageContext, PageRequest},
    schema::{
        CartPart, Ingredient, NewUser, Recipe, RecipeData, RecipeFilter, RecipePart, RecipeRow,
        RelationKind, Tag, User, UserInfo, UserRow, Uuid,
    },
    store::Store,
};

pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(QueryError::from)?;

        Ok(Self::new(pool))
    }
}

/// Escapes LIKE wildcards so that user input only ever matches literally.
fn like_prefix(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}

/// `COUNT(*) OVER()` rides on the returned rows, so a page past the end
/// carries no total. `None` means it has to be counted separately.
fn window_total(first_row_count: Option<i64>, page: &PageRequest) -> Option<i64> {
    match first_row_count {
        Some(count) => Some(count),
        None if page.page > 1 => None,
        None => Some(0),
    }
}

fn push_recipe_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter) {
    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(user_id) = filter.favorited_by {
        query
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(user_id) = filter.in_cart_of {
        query
            .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

fn recipe_count_query(filter: &RecipeFilter) -> QueryBuilder<'_, Postgres> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
    push_recipe_filter(&mut query, filter);
    query
}

fn missing_ids(requested: &[Uuid], found: Vec<(Uuid,)>) -> Vec<Uuid> {
    let found: HashSet<Uuid> = found.into_iter().map(|row| row.0).collect();
    requested
        .iter()
        .filter(|id| !found.contains(id))
        .copied()
        .collect()
}

async fn insert_recipe_links(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    data: &RecipeData,
) -> Result<(), Error> {
    let (ingredient_ids, amounts): (Vec<Uuid>, Vec<i32>) = data.ingredients.iter().copied().unzip();

    sqlx::query(
        "
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, i.ingredient_id, i.amount
        FROM UNNEST($2::int4[], $3::int4[]) AS i(ingredient_id, amount)
    ",
    )
    .bind(recipe_id)
    .bind(ingredient_ids)
    .bind(amounts)
    .execute(&mut **tx)
    .await
    .map_err(QueryError::from)?;

    sqlx::query(
        "
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, t.tag_id
        FROM UNNEST($2::int4[]) AS t(tag_id)
    ",
    )
    .bind(recipe_id)
    .bind(&data.tags)
    .execute(&mut **tx)
    .await
    .map_err(QueryError::from)?;

    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let row: Option<User> = sqlx::query_as(
            "
            INSERT INTO users (email, username, first_name, last_name, password)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING RETURNING *
        ",
        )
        .bind(user.email)
        .bind(user.username)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.password)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        row.ok_or_else(|| {
            ErrorKind::AlreadyExists.new("A user with that email or username already exists")
        })
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, Error> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn fetch_users(&self, page: PageRequest) -> Result<PageContext<UserInfo>, Error> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "
            SELECT id, email, username, first_name, last_name, COUNT(*) OVER() AS count
            FROM users
            ORDER BY id
            LIMIT $1 OFFSET $2
        ",
        )
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        let total_count = match window_total(rows.first().map(|row| row.count), &page) {
            Some(count) => count,
            None => {
                let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                    .fetch_one(&self.pool)
                    .await
                    .map_err(QueryError::from)?;
                count
            }
        };
        let rows = rows.into_iter().map(UserInfo::from).collect();
        Ok(PageContext::from_rows(rows, total_count, page))
    }

    async fn set_password(&self, user_id: Uuid, password: &str) -> Result<(), Error> {
        sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(())
    }

    async fn create_tag(&self, name: &str, color: &str, slug: &str) -> Result<Tag, Error> {
        let row: Option<Tag> = sqlx::query_as(
            "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
        )
        .bind(name)
        .bind(color)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        row.ok_or_else(|| ErrorKind::AlreadyExists.new("Tag already exists"))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(list)
    }

    async fn get_tag(&self, id: Uuid) -> Result<Option<Tag>, Error> {
        let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn create_ingredient(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Ingredient, Error> {
        let row: Option<Ingredient> = sqlx::query_as(
            "
            INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2)
            ON CONFLICT DO NOTHING RETURNING *
        ",
        )
        .bind(name)
        .bind(measurement_unit)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        row.ok_or_else(|| ErrorKind::AlreadyExists.new("Ingredient already exists"))
    }

    async fn list_ingredients(&self, name: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        let list: Vec<Ingredient> = match name {
            Some(name) => sqlx::query_as(
                "SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, id",
            )
            .bind(like_prefix(name))
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?,
            None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
                .fetch_all(&self.pool)
                .await
                .map_err(QueryError::from)?,
        };

        Ok(list)
    }

    async fn get_ingredient(&self, id: Uuid) -> Result<Option<Ingredient>, Error> {
        let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn find_missing_ingredients(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, Error> {
        let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(missing_ids(ids, found))
    }

    async fn find_missing_tags(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, Error> {
        let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(missing_ids(ids, found))
    }

    async fn create_recipe(&self, author_id: Uuid, data: &RecipeData) -> Result<Uuid, Error> {
        let mut tx = self.pool.begin().await.map_err(QueryError::from)?;

        let id: (Uuid,) = sqlx::query_as(
            "
            INSERT INTO recipes (author_id, name, image, text, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
        ",
        )
        .bind(author_id)
        .bind(&data.name)
        .bind(&data.image)
        .bind(&data.text)
        .bind(data.cooking_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(QueryError::from)?;

        insert_recipe_links(&mut tx, id.0, data).await?;
        tx.commit().await.map_err(QueryError::from)?;

        Ok(id.0)
    }

    async fn update_recipe(&self, id: Uuid, data: &RecipeData) -> Result<(), Error> {
        let mut tx = self.pool.begin().await.map_err(QueryError::from)?;

        sqlx::query(
            "UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4 WHERE id = $5",
        )
        .bind(&data.name)
        .bind(&data.image)
        .bind(&data.text)
        .bind(data.cooking_time)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(QueryError::from)?;

        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(QueryError::from)?;

        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(QueryError::from)?;

        insert_recipe_links(&mut tx, id, data).await?;
        tx.commit().await.map_err(QueryError::from)?;

        Ok(())
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<bool, Error> {
        // Links, favorites and cart entries go with ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, Error> {
        let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<PageContext<Recipe>, Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

        push_recipe_filter(&mut query, filter);

        query
            .push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<RecipeRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        let total_count = match window_total(rows.first().map(|row| row.count), &page) {
            Some(count) => count,
            None => {
                let (count,): (i64,) = recipe_count_query(filter)
                    .build_query_as()
                    .fetch_one(&self.pool)
                    .await
                    .map_err(QueryError::from)?;
                count
            }
        };
        let rows = rows.into_iter().map(Recipe::from).collect();
        Ok(PageContext::from_rows(rows, total_count, page))
    }

    async fn list_recipe_parts(&self, recipe_id: Uuid) -> Result<Vec<RecipePart>, Error> {
        let rows: Vec<RecipePart> = sqlx::query_as(
            "
            SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
                i.measurement_unit AS measurement_unit, ri.amount AS amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = $1
            ORDER BY ri.id
        ",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn list_recipe_tags(&self, recipe_id: Uuid) -> Result<Vec<Tag>, Error> {
        let rows: Vec<Tag> = sqlx::query_as(
            "
            SELECT t.*
            FROM recipe_tags rt
            INNER JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = $1
            ORDER BY rt.id
        ",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn list_author_recipes(
        &self,
        author_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, Error> {
        // LIMIT NULL means no limit
        let rows: Vec<Recipe> = sqlx::query_as(
            "SELECT * FROM recipes WHERE author_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn count_author_recipes(&self, author_id: Uuid) -> Result<i64, Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(count.0)
    }

    async fn insert_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, Error> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.table(),
            kind.target_column()
        ))
        .bind(user_id)
        .bind(target_id)
        .execute(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, Error> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
            kind.table(),
            kind.target_column()
        ))
        .bind(user_id)
        .bind(target_id)
        .execute(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, Error> {
        let result: Option<(i32,)> = sqlx::query_as(&format!(
            "SELECT 1 FROM {} WHERE user_id = $1 AND {} = $2",
            kind.table(),
            kind.target_column()
        ))
        .bind(user_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(result.is_some())
    }

    async fn fetch_subscriptions(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<PageContext<UserInfo>, Error> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "
            SELECT u.id, u.email, u.username, u.first_name, u.last_name, COUNT(*) OVER() AS count
            FROM follows f
            INNER JOIN users u ON u.id = f.author_id
            WHERE f.user_id = $1
            ORDER BY f.id
            LIMIT $2 OFFSET $3
        ",
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        let total_count = match window_total(rows.first().map(|row| row.count), &page) {
            Some(count) => count,
            None => {
                let (count,): (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM follows WHERE user_id = $1")
                        .bind(user_id)
                        .fetch_one(&self.pool)
                        .await
                        .map_err(QueryError::from)?;
                count
            }
        };
        let rows = rows.into_iter().map(UserInfo::from).collect();
        Ok(PageContext::from_rows(rows, total_count, page))
    }

    async fn list_cart_parts(&self, user_id: Uuid) -> Result<Vec<CartPart>, Error> {
        let rows: Vec<CartPart> = sqlx::query_as(
            "
            SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
            FROM shopping_cart c
            INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE c.user_id = $1
            ORDER BY c.id, ri.id
        ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("sal"), "sal%");
        assert_eq!(like_prefix("100%_"), "100\\%\\_%");
    }

    #[test]
    fn totals_past_the_last_page_are_recounted() {
        let first = PageRequest::new(Some(1), Some(6));
        let beyond = PageRequest::new(Some(4), Some(6));

        assert_eq!(window_total(Some(9), &beyond), Some(9));
        assert_eq!(window_total(None, &first), Some(0));
        assert_eq!(window_total(None, &beyond), None);
    }

    #[test]
    fn recipe_count_uses_the_listing_filter() {
        let filter = RecipeFilter {
            author: Some(3),
            tags: vec![String::from("dinner")],
            favorited_by: Some(7),
            in_cart_of: None,
        };

        let mut listing: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.* FROM recipes r WHERE TRUE");
        push_recipe_filter(&mut listing, &filter);
        let count = recipe_count_query(&filter);

        let clauses = listing.sql().trim_start_matches("SELECT r.* FROM recipes r WHERE TRUE");
        assert_eq!(
            count.sql(),
            format!("SELECT COUNT(*) FROM recipes r WHERE TRUE{clauses}")
        );
        assert!(clauses.contains("r.author_id = $1"));
        assert!(clauses.contains("t.slug = ANY($2)"));
        assert!(clauses.contains("f.user_id = $3"));
        assert!(!clauses.contains("shopping_cart"));
    }

    #[test]
    fn missing_ids_keep_request_order() {
        assert_eq!(missing_ids(&[5, 1, 9, 3], vec![(1,), (3,)]), vec![5, 9]);
    }
}
