use async_trait::async_trait;

use crate::{
    error::Error,
    pagination::{PageContext, PageRequest},
    schema::{
        CartPart, Ingredient, NewUser, Recipe, RecipeData, RecipeFilter, RecipePart,
        RelationKind, Tag, User, UserInfo, Uuid,
    },
};

/// Persistence boundary of the service. Every call is a single unit of work;
/// writes touching several tables run in one transaction.
///
/// Uniqueness of users, catalog entries and toggle relations is enforced by
/// the implementation atomically, callers never check-then-insert.
#[async_trait]
pub trait Store: Send + Sync {
    // Users

    /// Fails with `AlreadyExists` when the email or username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, Error>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    async fn fetch_users(&self, page: PageRequest) -> Result<PageContext<UserInfo>, Error>;
    async fn set_password(&self, user_id: Uuid, password: &str) -> Result<(), Error>;

    // Catalog

    async fn create_tag(&self, name: &str, color: &str, slug: &str) -> Result<Tag, Error>;
    async fn list_tags(&self) -> Result<Vec<Tag>, Error>;
    async fn get_tag(&self, id: Uuid) -> Result<Option<Tag>, Error>;
    async fn create_ingredient(&self, name: &str, measurement_unit: &str)
        -> Result<Ingredient, Error>;
    /// Ordered by name. `name` is a case-insensitive prefix.
    async fn list_ingredients(&self, name: Option<&str>) -> Result<Vec<Ingredient>, Error>;
    async fn get_ingredient(&self, id: Uuid) -> Result<Option<Ingredient>, Error>;
    /// Returns the ids of `ids` that have no catalog row.
    async fn find_missing_ingredients(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, Error>;
    async fn find_missing_tags(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, Error>;

    // Recipes

    async fn create_recipe(&self, author_id: Uuid, data: &RecipeData) -> Result<Uuid, Error>;
    /// Replaces the fields and the ingredient/tag links of the recipe.
    async fn update_recipe(&self, id: Uuid, data: &RecipeData) -> Result<(), Error>;
    /// Removes the recipe with its links, favorites and cart entries.
    async fn delete_recipe(&self, id: Uuid) -> Result<bool, Error>;
    async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>, Error>;
    /// Newest first.
    async fn fetch_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<PageContext<Recipe>, Error>;
    async fn list_recipe_parts(&self, recipe_id: Uuid) -> Result<Vec<RecipePart>, Error>;
    async fn list_recipe_tags(&self, recipe_id: Uuid) -> Result<Vec<Tag>, Error>;
    /// Newest first, at most `limit` rows when given.
    async fn list_author_recipes(
        &self,
        author_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, Error>;
    async fn count_author_recipes(&self, author_id: Uuid) -> Result<i64, Error>;

    // Toggle relations

    /// Returns `false` when the pair already existed.
    async fn insert_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, Error>;
    /// Returns `false` when there was no such pair.
    async fn delete_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, Error>;
    async fn has_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<bool, Error>;
    /// Authors followed by `user_id`, in subscription order.
    async fn fetch_subscriptions(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<PageContext<UserInfo>, Error>;

    /// Ingredient rows of every recipe in the user's cart, in cart order and
    /// then recipe order.
    async fn list_cart_parts(&self, user_id: Uuid) -> Result<Vec<CartPart>, Error>;
}
