use warp::{
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    reject::Rejection,
    reply::{self, Response},
    Filter, Reply,
};

use crate::{
    actions::{
        recipes::{create_recipe, delete_recipe, fetch_recipes, get_recipe, update_recipe, RecipeQuery},
        relations::{
            add_to_favorites, add_to_shopping_cart, remove_from_favorites,
            remove_from_shopping_cart,
        },
        shopping_list::shopping_list,
    },
    constants::SHOPPING_LIST_FILE_NAME,
    document::ShoppingListDocument,
    error::{Error, TypeError},
    form::Form,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::Uuid,
    state::State,
    validation::RecipeForm,
};

use super::{created, json_body, no_content, with_form, with_state};

pub fn routes(state: State) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let keys = state.keys.clone();

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .and(with_form())
        .and_then(list_handler);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(json_body())
        .and_then(create_handler);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(with_form())
        .and_then(download_handler);

    let retrieve = warp::path!("recipes" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .and_then(retrieve_handler);

    let update = warp::path!("recipes" / Uuid)
        .and(warp::patch())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(json_body())
        .and_then(update_handler);

    let delete = warp::path!("recipes" / Uuid)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and_then(delete_handler);

    let favorite = warp::path!("recipes" / Uuid / "favorite")
        .and(warp::post().map(|| true).or(warp::delete().map(|| false)).unify())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and_then(favorite_handler);

    let cart = warp::path!("recipes" / Uuid / "shopping_cart")
        .and(warp::post().map(|| true).or(warp::delete().map(|| false)).unify())
        .and(with_state(state))
        .and(with_session(keys))
        .and_then(shopping_cart_handler);

    list.or(create)
        .or(download)
        .or(retrieve)
        .or(update)
        .or(delete)
        .or(favorite)
        .or(cart)
}

async fn list_handler(
    state: State,
    session: Option<SessionData>,
    form: Form,
) -> Result<impl Reply, Rejection> {
    let query = RecipeQuery::try_from(&form)?;
    let recipes = fetch_recipes(state.store.as_ref(), session.as_ref(), &query).await?;
    Ok(reply::json(&recipes))
}

async fn create_handler(
    state: State,
    session: SessionData,
    form: RecipeForm,
) -> Result<impl Reply, Rejection> {
    let recipe = create_recipe(state.store.as_ref(), &session, form).await?;
    Ok(created(&recipe))
}

async fn retrieve_handler(
    id: Uuid,
    state: State,
    session: Option<SessionData>,
) -> Result<impl Reply, Rejection> {
    let recipe = get_recipe(state.store.as_ref(), session.as_ref(), id).await?;
    Ok(reply::json(&recipe))
}

async fn update_handler(
    id: Uuid,
    state: State,
    session: SessionData,
    form: RecipeForm,
) -> Result<impl Reply, Rejection> {
    let recipe = update_recipe(state.store.as_ref(), &session, id, form).await?;
    Ok(reply::json(&recipe))
}

async fn delete_handler(
    id: Uuid,
    state: State,
    session: SessionData,
) -> Result<impl Reply, Rejection> {
    delete_recipe(state.store.as_ref(), &session, id).await?;
    Ok(no_content())
}

async fn favorite_handler(
    id: Uuid,
    add: bool,
    state: State,
    session: SessionData,
) -> Result<Response, Rejection> {
    if add {
        let recipe = add_to_favorites(state.store.as_ref(), &session, id).await?;
        Ok(created(&recipe).into_response())
    } else {
        remove_from_favorites(state.store.as_ref(), &session, id).await?;
        Ok(no_content().into_response())
    }
}

async fn shopping_cart_handler(
    id: Uuid,
    add: bool,
    state: State,
    session: SessionData,
) -> Result<Response, Rejection> {
    if add {
        let recipe = add_to_shopping_cart(state.store.as_ref(), &session, id).await?;
        Ok(created(&recipe).into_response())
    } else {
        remove_from_shopping_cart(state.store.as_ref(), &session, id).await?;
        Ok(no_content().into_response())
    }
}

/// PDF by default, plain text with `?format=txt`.
fn attachment(document: &ShoppingListDocument, format: Option<&str>) -> Result<Response, Error> {
    let (body, content_type, extension) = match format {
        None | Some("") | Some("pdf") => (document.to_pdf()?, "application/pdf", "pdf"),
        Some("txt") => (
            document.to_text().into_bytes(),
            "text/plain; charset=utf-8",
            "txt",
        ),
        Some(other) => {
            return Err(TypeError::new(&format!("Unsupported format '{other}'")).into());
        }
    };

    let disposition = format!("attachment; filename=\"{SHOPPING_LIST_FILE_NAME}.{extension}\"");
    Ok(reply::with_header(
        reply::with_header(body, CONTENT_TYPE, content_type),
        CONTENT_DISPOSITION,
        disposition,
    )
    .into_response())
}

async fn download_handler(
    state: State,
    session: SessionData,
    form: Form,
) -> Result<Response, Rejection> {
    let items = shopping_list(state.store.as_ref(), &session).await?;
    let document = ShoppingListDocument::new(&items);
    log::debug!(
        "{} downloaded a shopping list of {} items",
        session.username,
        items.len()
    );

    Ok(attachment(&document, form.get_str("format").as_deref())?)
}
