use serde::Serialize;

use super::schema::{Recipe, RecipePart, Tag, UserInfo, Uuid};

/// User as seen by the requesting user.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserView {
    #[serde(flatten)]
    pub user: UserInfo,
    pub is_subscribed: bool,
}

/// Short form of a recipe, returned by the favorite and cart toggles and
/// nested in subscriptions.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<Recipe> for RecipeSummary {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct RecipeView {
    pub id: Uuid,
    pub author: UserView,
    pub name: String,
    pub image: String,
    pub text: String,
    pub ingredients: Vec<RecipePart>,
    pub tags: Vec<Tag>,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Followed author with their recipes.
#[derive(Serialize, Debug, Clone)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub user: UserInfo,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}
