use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    error::{Error, ErrorKind},
    pagination::{PageContext, PageRequest},
    schema::{
        CartPart, Ingredient, NewUser, Recipe, RecipeData, RecipeFilter, RecipePart,
        RelationKind, Tag, User, UserInfo, UserRole, Uuid,
    },
    store::Store,
};

#[derive(Default)]
struct Tables {
    sequence: Uuid,
    users: Vec<User>,
    tags: Vec<Tag>,
    ingredients: Vec<Ingredient>,
    recipes: Vec<Recipe>,
    /// (recipe, ingredient, amount)
    recipe_ingredients: Vec<(Uuid, Uuid, i32)>,
    /// (recipe, tag)
    recipe_tags: Vec<(Uuid, Uuid)>,
    /// (kind, user, target), in insertion order
    relations: Vec<(RelationKind, Uuid, Uuid)>,
}

impl Tables {
    fn next_id(&mut self) -> Uuid {
        self.sequence += 1;
        self.sequence
    }

    fn link_recipe(&mut self, recipe_id: Uuid, data: &RecipeData) {
        self.recipe_ingredients.extend(
            data.ingredients
                .iter()
                .map(|(ingredient_id, amount)| (recipe_id, *ingredient_id, *amount)),
        );
        self.recipe_tags
            .extend(data.tags.iter().map(|tag_id| (recipe_id, *tag_id)));
    }

    fn unlink_recipe(&mut self, recipe_id: Uuid) {
        self.recipe_ingredients.retain(|(r, _, _)| *r != recipe_id);
        self.recipe_tags.retain(|(r, _)| *r != recipe_id);
    }

    fn has_relation(&self, kind: RelationKind, user_id: Uuid, target_id: Uuid) -> bool {
        self.relations.contains(&(kind, user_id, target_id))
    }

    fn tag_slug(&self, tag_id: Uuid) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.id == tag_id)
            .map(|tag| tag.slug.as_str())
    }

    fn recipe_matches(&self, recipe: &Recipe, filter: &RecipeFilter) -> bool {
        if filter.author.is_some_and(|author| author != recipe.author_id) {
            return false;
        }
        if !filter.tags.is_empty() {
            let tagged = self
                .recipe_tags
                .iter()
                .filter(|(r, _)| *r == recipe.id)
                .filter_map(|(_, tag_id)| self.tag_slug(*tag_id))
                .any(|slug| filter.tags.iter().any(|wanted| wanted == slug));
            if !tagged {
                return false;
            }
        }
        if let Some(user_id) = filter.favorited_by {
            if !self.has_relation(RelationKind::Favorite, user_id, recipe.id) {
                return false;
            }
        }
        if let Some(user_id) = filter.in_cart_of {
            if !self.has_relation(RelationKind::ShoppingCart, user_id, recipe.id) {
                return false;
            }
        }
        true
    }
}

fn paginate<T: Clone>(rows: &[T], page: PageRequest) -> PageContext<T> {
    let total = rows.len() as i64;
    let results = rows
        .iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .cloned()
        .collect();
    PageContext::from_rows(results, total, page)
}

fn newest_first(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// Store kept entirely in process memory. Used by the test-suite and for
/// running the service without a database.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, Error> {
        self.tables
            .lock()
            .map_err(|_| ErrorKind::InternalServerError.new("Memory store poisoned"))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut tables = self.lock()?;

        let taken = tables.users.iter().any(|u| {
            u.email.eq_ignore_ascii_case(&user.email) || u.username == user.username
        });
        if taken {
            return Err(ErrorKind::AlreadyExists
                .new("A user with that email or username already exists"));
        }

        let user = User {
            id: tables.next_id(),
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            password: user.password,
            role: UserRole::User,
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, Error> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn fetch_users(&self, page: PageRequest) -> Result<PageContext<UserInfo>, Error> {
        let tables = self.lock()?;
        let users: Vec<UserInfo> = tables.users.iter().map(User::info).collect();

        Ok(paginate(&users, page))
    }

    async fn set_password(&self, user_id: Uuid, password: &str) -> Result<(), Error> {
        let mut tables = self.lock()?;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.password = password.to_string();
        }

        Ok(())
    }

    async fn create_tag(&self, name: &str, color: &str, slug: &str) -> Result<Tag, Error> {
        let mut tables = self.lock()?;

        let taken = tables
            .tags
            .iter()
            .any(|t| t.name == name || t.color.eq_ignore_ascii_case(color) || t.slug == slug);
        if taken {
            return Err(ErrorKind::AlreadyExists.new("Tag already exists"));
        }

        let tag = Tag {
            id: tables.next_id(),
            name: name.to_string(),
            color: color.to_string(),
            slug: slug.to_string(),
        };
        tables.tags.push(tag.clone());

        Ok(tag)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, Error> {
        Ok(self.lock()?.tags.clone())
    }

    async fn get_tag(&self, id: Uuid) -> Result<Option<Tag>, Error> {
        Ok(self.lock()?.tags.iter().find(|t| t.id == id).cloned())
    }

    async fn create_ingredient(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Ingredient, Error> {
        let mut tables = self.lock()?;

        let taken = tables
            .ingredients
            .iter()
            .any(|i| i.name == name && i.measurement_unit == measurement_unit);
        if taken {
            return Err(ErrorKind::AlreadyExists.new("Ingredient already exists"));
        }

        let ingredient = Ingredient {
            id: tables.next_id(),
            name: name.to_string(),
            measurement_unit: measurement_unit.to_string(),
        };
        tables.ingredients.push(ingredient.clone());

        Ok(ingredient)
    }

    async fn list_ingredients(&self, name: Option<&str>) -> Result<Vec<Ingredient>, Error> {
        let prefix = name.map(str::to_lowercase);
        let mut list: Vec<Ingredient> = self
            .lock()?
            .ingredients
            .iter()
            .filter(|i| match &prefix {
                Some(prefix) => i.name.to_lowercase().starts_with(prefix.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(list)
    }

    async fn get_ingredient(&self, id: Uuid) -> Result<Option<Ingredient>, Error> {
        Ok(self.lock()?.ingredients.iter().find(|i| i.id == id).cloned())
    }

    async fn find_missing_ingredients(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, Error> {
        let tables = self.lock()?;
        Ok(ids
            .iter()
            .filter(|id| !tables.ingredients.iter().any(|i| i.id == **id))
            .copied()
            .collect())
    }

    async fn find_missing_tags(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, Error> {
        let tables = self.lock()?;
        Ok(ids
            .iter()
            .filter(|id| !tables.tags.iter().any(|t| t.id == **id))
            .copied()
            .collect())
    }

    async fn create_recipe(&self, author_id: Uuid, data: &RecipeData) -> Result<Uuid, Error> {
        let mut tables = self.lock()?;

        let id = tables.next_id();
        tables.recipes.push(Recipe {
            id,
            author_id,
            name: data.name.to_owned(),
            image: data.image.to_owned(),
            text: data.text.to_owned(),
            cooking_time: data.cooking_time,
            created_at: Utc::now(),
        });
        tables.link_recipe(id, data);

        Ok(id)
    }

    async fn update_recipe(&self, id: Uuid, data: &RecipeData) -> Result<(), Error> {
        let mut tables = self.lock()?;

        let recipe = tables
            .recipes
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ErrorKind::NotFound.new("Recipe not found"))?;
        recipe.name = data.name.to_owned();
        recipe.image = data.image.to_owned();
        recipe.text = data.text.to_owned();
        recipe.cooking_time = data.cooking_time;

        tables.unlink_recipe(id);
        tables.link_recipe(id, data);

        Ok(())
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<bool, Error> {
        let mut tables = self.lock()?;

        let before = tables.recipes.len();
        tables.recipes.retain(|r| r.id != id);
        if tables.recipes.len() == before {
            return Ok(false);
        }

        tables.unlink_recipe(id);
        tables.relations.retain(|(kind, _, target)| {
            *kind == RelationKind::Follow || *target != id
        });

        Ok(true)
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, Error> {
        Ok(self.lock()?.recipes.iter().find(|r| r.id == id).cloned())
    }

    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<PageContext<Recipe>, Error> {
        let tables = self.lock()?;

        let mut recipes: Vec<Recipe> = tables
            .recipes
            .iter()
            .filter(|r| tables.recipe_matches(r, filter))
            .cloned()
            .collect();
        newest_first(&mut recipes);

        Ok(paginate(&recipes, page))
    }

    async fn list_recipe_parts(&self, recipe_id: Uuid) -> Result<Vec<RecipePart>, Error> {
        let tables = self.lock()?;

        Ok(tables
            .recipe_ingredients
            .iter()
            .filter(|(r, _, _)| *r == recipe_id)
            .filter_map(|(_, ingredient_id, amount)| {
                tables
                    .ingredients
                    .iter()
                    .find(|i| i.id == *ingredient_id)
                    .map(|i| RecipePart {
                        recipe_id,
                        ingredient_id: i.id,
                        name: i.name.to_owned(),
                        measurement_unit: i.measurement_unit.to_owned(),
                        amount: *amount,
                    })
            })
            .collect())
    }

    async fn list_recipe_tags(&self, recipe_id: Uuid) -> Result<Vec<Tag>, Error> {
        let tables = self.lock()?;

        Ok(tables
            .recipe_tags
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .filter_map(|(_, tag_id)| tables.tags.iter().find(|t| t.id == *tag_id).cloned())
            .collect())
    }

    async fn list_author_recipes(
        &self,
        author_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, Error> {
        let mut recipes: Vec<Recipe> = self
            .lock()?
            .recipes
            .iter()
            .filter(|r| r.author_id == author_id)
            .cloned()
            .collect();
        newest_first(&mut recipes);

        if let Some(limit) = limit {
            recipes.truncate(limit.max(0) as usize);
        }

        Ok(recipes)
    }

    async fn count_author_recipes(&self, author_id: Uuid) -> Result<i64, Error> {
        Ok(self
            .lock()?
            .recipes
            .iter()
            .filter(|r| r.author_id == author_id)
            .count() as i64)
    }

    async fn insert_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, Error> {
        let mut tables = self.lock()?;

        if tables.has_relation(kind, user_id, target_id) {
            return Ok(false);
        }
        tables.relations.push((kind, user_id, target_id));

        Ok(true)
    }

    async fn delete_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, Error> {
        let mut tables = self.lock()?;

        let before = tables.relations.len();
        tables
            .relations
            .retain(|relation| *relation != (kind, user_id, target_id));

        Ok(tables.relations.len() < before)
    }

    async fn has_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, Error> {
        Ok(self.lock()?.has_relation(kind, user_id, target_id))
    }

    async fn fetch_subscriptions(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<PageContext<UserInfo>, Error> {
        let tables = self.lock()?;

        let authors: Vec<UserInfo> = tables
            .relations
            .iter()
            .filter(|(kind, user, _)| *kind == RelationKind::Follow && *user == user_id)
            .filter_map(|(_, _, author_id)| {
                tables.users.iter().find(|u| u.id == *author_id).map(User::info)
            })
            .collect();

        Ok(paginate(&authors, page))
    }

    async fn list_cart_parts(&self, user_id: Uuid) -> Result<Vec<CartPart>, Error> {
        let tables = self.lock()?;

        let parts = tables
            .relations
            .iter()
            .filter(|(kind, user, _)| *kind == RelationKind::ShoppingCart && *user == user_id)
            .flat_map(|(_, _, recipe_id)| {
                tables
                    .recipe_ingredients
                    .iter()
                    .filter(move |(r, _, _)| r == recipe_id)
            })
            .filter_map(|(_, ingredient_id, amount)| {
                tables
                    .ingredients
                    .iter()
                    .find(|i| i.id == *ingredient_id)
                    .map(|i| CartPart {
                        name: i.name.to_owned(),
                        measurement_unit: i.measurement_unit.to_owned(),
                        amount: *amount,
                    })
            })
            .collect();

        Ok(parts)
    }
}
