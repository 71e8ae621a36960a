mod common;

use std::sync::Arc;

use serde_json::{json, Value};
use warp::{http::StatusCode, test::request};

use foodgram::{memory::MemoryStore, routes::api, state::State};

use common::{catalog, Catalog, IMAGE};

async fn setup() -> (State, Catalog) {
    let store = Arc::new(MemoryStore::new());
    let catalog = catalog(store.as_ref()).await;
    (common::state(store), catalog)
}

fn body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

async fn signup(state: &State, username: &str) -> (i64, String) {
    let filter = api(state.clone());

    let res = request()
        .method("POST")
        .path("/api/users/")
        .json(&json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "first_name": "Test",
            "last_name": "Cook",
            "password": "secret-password",
        }))
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let id = body(res.body())["id"].as_i64().unwrap();
    assert!(body(res.body()).get("password").is_none());

    let res = request()
        .method("POST")
        .path("/api/auth/token/login/")
        .json(&json!({
            "email": format!("{username}@example.com"),
            "password": "secret-password",
        }))
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let token = body(res.body())["auth_token"].as_str().unwrap().to_string();

    (id, format!("Token {token}"))
}

async fn post_recipe(state: &State, token: &str, recipe: Value) -> i64 {
    let res = request()
        .method("POST")
        .path("/api/recipes/")
        .header("authorization", token)
        .json(&recipe)
        .reply(&api(state.clone()))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED, "{:?}", res.body());
    body(res.body())["id"].as_i64().unwrap()
}

fn recipe(catalog: &Catalog, name: &str) -> Value {
    json!({
        "name": name,
        "image": IMAGE,
        "text": "Boil everything.",
        "cooking_time": 15,
        "ingredients": [
            {"id": catalog.salt.id, "amount": 2},
            {"id": catalog.pepper.id, "amount": 1},
        ],
        "tags": [catalog.dinner.id],
    })
}

#[tokio::test]
async fn recipe_lifecycle() {
    let (state, catalog) = setup().await;
    let (author_id, token) = signup(&state, "author").await;
    let filter = api(state.clone());

    let id = post_recipe(&state, &token, recipe(&catalog, "Soup")).await;

    let res = request()
        .path(&format!("/api/recipes/{id}/"))
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let view = body(res.body());
    assert_eq!(view["author"]["id"].as_i64(), Some(author_id));
    assert_eq!(view["author"]["is_subscribed"], json!(false));
    assert_eq!(view["ingredients"][0]["name"], json!("Salt"));
    assert_eq!(view["ingredients"][0]["amount"], json!(2));
    assert_eq!(view["tags"][0]["slug"], json!("dinner"));
    assert_eq!(view["is_favorited"], json!(false));

    let res = request()
        .method("PATCH")
        .path(&format!("/api/recipes/{id}/"))
        .header("authorization", &token)
        .json(&json!({"cooking_time": 20}))
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res.body())["cooking_time"], json!(20));
    assert_eq!(body(res.body())["name"], json!("Soup"));

    let res = request()
        .method("DELETE")
        .path(&format!("/api/recipes/{id}/"))
        .header("authorization", &token)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = request()
        .path(&format!("/api/recipes/{id}/"))
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_recipe_reports_fields() {
    let (state, catalog) = setup().await;
    let (_, token) = signup(&state, "author").await;

    let mut invalid = recipe(&catalog, "");
    invalid["cooking_time"] = json!(0);
    invalid["ingredients"] = json!([]);

    let res = request()
        .method("POST")
        .path("/api/recipes/")
        .header("authorization", &token)
        .json(&invalid)
        .reply(&api(state))
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let errors = body(res.body());
    assert!(errors.get("name").is_some());
    assert!(errors.get("cooking_time").is_some());
    assert!(errors.get("ingredients").is_some());
}

#[tokio::test]
async fn authentication_is_required_for_writes() {
    let (state, catalog) = setup().await;
    let filter = api(state);

    let res = request()
        .method("POST")
        .path("/api/recipes/")
        .json(&recipe(&catalog, "Soup"))
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = request()
        .path("/api/users/me/")
        .header("authorization", "Token garbage")
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = request().path("/api/recipes/").reply(&filter).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res.body())["count"], json!(0));
}

#[tokio::test]
async fn strangers_cannot_edit() {
    let (state, catalog) = setup().await;
    let (_, author) = signup(&state, "author").await;
    let (_, stranger) = signup(&state, "stranger").await;
    let id = post_recipe(&state, &author, recipe(&catalog, "Soup")).await;

    let res = request()
        .method("PATCH")
        .path(&format!("/api/recipes/{id}/"))
        .header("authorization", &stranger)
        .json(&json!({"name": "Mine now"}))
        .reply(&api(state))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn favorite_endpoint_toggles() {
    let (state, catalog) = setup().await;
    let (_, token) = signup(&state, "cook").await;
    let id = post_recipe(&state, &token, recipe(&catalog, "Soup")).await;
    let filter = api(state);
    let path = format!("/api/recipes/{id}/favorite/");

    let res = request()
        .method("POST")
        .path(&path)
        .header("authorization", &token)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(body(res.body())["name"], json!("Soup"));

    let res = request()
        .method("POST")
        .path(&path)
        .header("authorization", &token)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = request()
        .path("/api/recipes/?is_favorited=1")
        .header("authorization", &token)
        .reply(&filter)
        .await;
    assert_eq!(body(res.body())["count"], json!(1));
    assert_eq!(body(res.body())["results"][0]["is_favorited"], json!(true));

    let res = request()
        .method("DELETE")
        .path(&path)
        .header("authorization", &token)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = request()
        .method("DELETE")
        .path(&path)
        .header("authorization", &token)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = request()
        .method("POST")
        .path("/api/recipes/9999/favorite/")
        .header("authorization", &token)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subscriptions() {
    let (state, catalog) = setup().await;
    let (author_id, author) = signup(&state, "author").await;
    let (reader_id, reader) = signup(&state, "reader").await;
    post_recipe(&state, &author, recipe(&catalog, "One")).await;
    post_recipe(&state, &author, recipe(&catalog, "Two")).await;
    let filter = api(state);

    let res = request()
        .method("POST")
        .path(&format!("/api/users/{reader_id}/subscribe/"))
        .header("authorization", &reader)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = request()
        .method("POST")
        .path(&format!("/api/users/{author_id}/subscribe/?recipes_limit=1"))
        .header("authorization", &reader)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let view = body(res.body());
    assert_eq!(view["recipes_count"], json!(2));
    assert_eq!(view["recipes"].as_array().unwrap().len(), 1);
    assert_eq!(view["is_subscribed"], json!(true));

    let res = request()
        .path("/api/users/subscriptions/")
        .header("authorization", &reader)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res.body())["results"][0]["username"], json!("author"));

    let res = request()
        .path(&format!("/api/users/{author_id}/"))
        .header("authorization", &reader)
        .reply(&filter)
        .await;
    assert_eq!(body(res.body())["is_subscribed"], json!(true));

    let res = request()
        .method("DELETE")
        .path(&format!("/api/users/{author_id}/subscribe/"))
        .header("authorization", &reader)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn shopping_cart_download() {
    let (state, catalog) = setup().await;
    let (_, token) = signup(&state, "cook").await;
    let soup = post_recipe(&state, &token, recipe(&catalog, "Soup")).await;
    let stew = post_recipe(&state, &token, recipe(&catalog, "Stew")).await;
    let filter = api(state);

    for id in [soup, stew] {
        let res = request()
            .method("POST")
            .path(&format!("/api/recipes/{id}/shopping_cart/"))
            .header("authorization", &token)
            .reply(&filter)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = request()
        .path("/api/recipes/download_shopping_cart/?format=txt")
        .header("authorization", &token)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename=\"ShoppingList.txt\""
    );
    let text = String::from_utf8(res.body().to_vec()).unwrap();
    assert_eq!(text, "Shopping list\n\n1. Salt - 4 g\n2. Pepper - 2 g\n");

    let res = request()
        .path("/api/recipes/download_shopping_cart/")
        .header("authorization", &token)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/pdf");
    assert!(res.body().starts_with(b"%PDF-"));

    let res = request()
        .path("/api/recipes/download_shopping_cart/")
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_endpoints() {
    let (state, catalog) = setup().await;
    let filter = api(state);

    let res = request().path("/api/tags/").reply(&filter).await;
    assert_eq!(body(res.body()).as_array().unwrap().len(), 2);

    let res = request()
        .path(&format!("/api/tags/{}/", catalog.dinner.id))
        .reply(&filter)
        .await;
    assert_eq!(body(res.body())["slug"], json!("dinner"));

    let res = request().path("/api/ingredients/?name=sA").reply(&filter).await;
    let ingredients = body(res.body());
    assert_eq!(ingredients.as_array().unwrap().len(), 1);
    assert_eq!(ingredients[0]["name"], json!("Salt"));

    let res = request().path("/api/ingredients/9999/").reply(&filter).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = request().path("/api/nothing/").reply(&filter).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registration_conflicts() {
    let (state, _) = setup().await;
    signup(&state, "cook").await;

    let res = request()
        .method("POST")
        .path("/api/users/")
        .json(&json!({
            "email": "cook@example.com",
            "username": "cook2",
            "first_name": "Test",
            "last_name": "Cook",
            "password": "secret-password",
        }))
        .reply(&api(state))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn huge_page_numbers_are_answered() {
    let (state, catalog) = setup().await;
    let (_, token) = signup(&state, "cook").await;
    post_recipe(&state, &token, recipe(&catalog, "Soup")).await;
    let filter = api(state);

    for path in [
        "/api/recipes/?page=9223372036854775807",
        "/api/users/?page=9223372036854775807&limit=100",
    ] {
        let res = request().path(path).reply(&filter).await;
        assert_eq!(res.status(), StatusCode::OK, "{path}");
        let page = body(res.body());
        assert!(page["results"].as_array().unwrap().is_empty());
        assert_eq!(page["next"], Value::Null);
    }

    let res = request()
        .path("/api/users/subscriptions/?page=9223372036854775807")
        .header("authorization", &token)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
}
