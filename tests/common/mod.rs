#![allow(dead_code)]

use std::sync::Arc;

use foodgram::{
    actions::users::{register_user, RegisterForm},
    jwt::{JwtKeys, SessionData},
    memory::MemoryStore,
    schema::{Ingredient, Tag, Uuid},
    state::State,
    store::Store,
    validation::{IngredientAmount, RecipeForm},
};

pub const IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";
pub const SECRET: &str = "integration-secret";

pub struct Catalog {
    pub salt: Ingredient,
    pub pepper: Ingredient,
    pub milk: Ingredient,
    pub breakfast: Tag,
    pub dinner: Tag,
}

pub async fn catalog(store: &dyn Store) -> Catalog {
    Catalog {
        salt: store.create_ingredient("Salt", "g").await.unwrap(),
        pepper: store.create_ingredient("Pepper", "g").await.unwrap(),
        milk: store.create_ingredient("Milk", "ml").await.unwrap(),
        breakfast: store
            .create_tag("Breakfast", "#E26C2D", "breakfast")
            .await
            .unwrap(),
        dinner: store.create_tag("Dinner", "#49B64E", "dinner").await.unwrap(),
    }
}

pub fn register_form(username: &str) -> RegisterForm {
    RegisterForm {
        email: format!("{username}@example.com"),
        username: username.to_string(),
        first_name: String::from("Test"),
        last_name: String::from("Cook"),
        password: format!("{username}-password"),
    }
}

pub async fn user(store: &dyn Store, username: &str) -> SessionData {
    let info = register_user(store, register_form(username)).await.unwrap();
    let user = store.get_user_by_id(info.id).await.unwrap().unwrap();
    SessionData::from(&user)
}

pub fn recipe_form(name: &str, ingredients: &[(Uuid, i64)], tags: &[Uuid]) -> RecipeForm {
    RecipeForm {
        name: Some(name.to_string()),
        image: Some(IMAGE.to_string()),
        text: Some(String::from("Mix and serve.")),
        cooking_time: Some(10),
        ingredients: Some(
            ingredients
                .iter()
                .map(|&(id, amount)| IngredientAmount { id, amount })
                .collect(),
        ),
        tags: Some(tags.to_vec()),
    }
}

pub fn state(store: Arc<MemoryStore>) -> State {
    State::new(store, JwtKeys::new(SECRET, 1).unwrap(), None)
}
