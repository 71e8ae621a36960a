use warp::{reject::Rejection, reply, Filter, Reply};

use crate::{
    actions::{
        ingredients::{get_ingredient, list_ingredients},
        tags::{get_tag, list_tags},
    },
    form::Form,
    schema::Uuid,
    state::State,
};

use super::{with_form, with_state};

pub fn routes(state: State) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let tags = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(tags_handler);

    let tag = warp::path!("tags" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(tag_handler);

    let ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_form())
        .and_then(ingredients_handler);

    let ingredient = warp::path!("ingredients" / Uuid)
        .and(warp::get())
        .and(with_state(state))
        .and_then(ingredient_handler);

    tags.or(tag).or(ingredients).or(ingredient)
}

async fn tags_handler(state: State) -> Result<impl Reply, Rejection> {
    let tags = list_tags(state.store.as_ref(), state.cache.clone()).await?;
    Ok(reply::json(&tags))
}

async fn tag_handler(id: Uuid, state: State) -> Result<impl Reply, Rejection> {
    let tag = get_tag(state.store.as_ref(), id).await?;
    Ok(reply::json(&tag))
}

async fn ingredients_handler(state: State, form: Form) -> Result<impl Reply, Rejection> {
    let name = form.get_str("name");
    let ingredients = list_ingredients(
        state.store.as_ref(),
        state.cache.clone(),
        name.as_deref(),
    )
    .await?;
    Ok(reply::json(&ingredients))
}

async fn ingredient_handler(id: Uuid, state: State) -> Result<impl Reply, Rejection> {
    let ingredient = get_ingredient(state.store.as_ref(), id).await?;
    Ok(reply::json(&ingredient))
}
