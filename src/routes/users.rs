use serde::Serialize;
use warp::{reject::Rejection, reply, Filter, Reply};

use crate::{
    actions::{
        relations::{fetch_subscriptions, subscribe, unsubscribe},
        users::{
            current_user, fetch_users, get_user, login_user, register_user, set_password,
            LoginForm, RegisterForm, SetPasswordForm,
        },
    },
    form::Form,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::Uuid,
    state::State,
};

use super::{created, json_body, no_content, page_request, recipes_limit, with_form, with_state};

#[derive(Serialize)]
struct TokenReply {
    auth_token: String,
}

pub fn routes(state: State) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let keys = state.keys.clone();

    let register = warp::path!("users")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(register_handler);

    let list = warp::path!("users")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_possible_session(keys.clone()))
        .and(with_form())
        .and_then(list_handler);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and_then(me_handler);

    let password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(json_body())
        .and_then(set_password_handler);

    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(login_handler);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(with_form())
        .and_then(subscriptions_handler);

    let follow = warp::path!("users" / Uuid / "subscribe")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and(with_form())
        .and_then(subscribe_handler);

    let unfollow = warp::path!("users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(with_session(keys.clone()))
        .and_then(unsubscribe_handler);

    let profile = warp::path!("users" / Uuid)
        .and(warp::get())
        .and(with_state(state))
        .and(with_possible_session(keys))
        .and_then(profile_handler);

    register
        .or(list)
        .or(me)
        .or(password)
        .or(login)
        .or(subscriptions)
        .or(follow)
        .or(unfollow)
        .or(profile)
}

async fn register_handler(state: State, form: RegisterForm) -> Result<impl Reply, Rejection> {
    let user = register_user(state.store.as_ref(), form).await?;
    Ok(created(&user))
}

async fn list_handler(
    state: State,
    session: Option<SessionData>,
    form: Form,
) -> Result<impl Reply, Rejection> {
    let page = page_request(&form)?;
    let users = fetch_users(state.store.as_ref(), session.as_ref(), page).await?;
    Ok(reply::json(&users))
}

async fn me_handler(state: State, session: SessionData) -> Result<impl Reply, Rejection> {
    let user = current_user(state.store.as_ref(), &session).await?;
    Ok(reply::json(&user))
}

async fn set_password_handler(
    state: State,
    session: SessionData,
    form: SetPasswordForm,
) -> Result<impl Reply, Rejection> {
    set_password(state.store.as_ref(), &session, form).await?;
    Ok(no_content())
}

async fn login_handler(state: State, form: LoginForm) -> Result<impl Reply, Rejection> {
    let auth_token = login_user(state.store.as_ref(), &state.keys, form).await?;
    Ok(reply::json(&TokenReply { auth_token }))
}

async fn subscriptions_handler(
    state: State,
    session: SessionData,
    form: Form,
) -> Result<impl Reply, Rejection> {
    let page = page_request(&form)?;
    let limit = recipes_limit(&form)?;
    let authors = fetch_subscriptions(state.store.as_ref(), &session, page, limit).await?;
    Ok(reply::json(&authors))
}

async fn subscribe_handler(
    author_id: Uuid,
    state: State,
    session: SessionData,
    form: Form,
) -> Result<impl Reply, Rejection> {
    let limit = recipes_limit(&form)?;
    let author = subscribe(state.store.as_ref(), &session, author_id, limit).await?;
    Ok(created(&author))
}

async fn unsubscribe_handler(
    author_id: Uuid,
    state: State,
    session: SessionData,
) -> Result<impl Reply, Rejection> {
    unsubscribe(state.store.as_ref(), &session, author_id).await?;
    Ok(no_content())
}

async fn profile_handler(
    id: Uuid,
    state: State,
    session: Option<SessionData>,
) -> Result<impl Reply, Rejection> {
    let user = get_user(state.store.as_ref(), session.as_ref(), id).await?;
    Ok(reply::json(&user))
}
