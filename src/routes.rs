//! HTTP surface of the service, everything lives under `/api`.

use std::convert::Infallible;

use serde::de::DeserializeOwned;
use warp::{
    filters::body::BodyDeserializeError,
    http::StatusCode,
    reject::{InvalidQuery, MethodNotAllowed, PayloadTooLarge, Rejection, UnsupportedMediaType},
    reply, Filter, Reply,
};

use crate::{
    error::{Error, ErrorKind, TypeError},
    form::{Form, FormData},
    pagination::PageRequest,
    state::State,
};

pub mod catalog;
pub mod recipes;
pub mod users;

/// Recipe images travel inline as base64.
const MAX_BODY_SIZE: u64 = 16 * 1024 * 1024;

pub fn api(state: State) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    warp::path("api")
        .and(
            users::routes(state.clone())
                .or(catalog::routes(state.clone()))
                .or(recipes::routes(state)),
        )
        .recover(handle_rejection)
        .with(warp::log("foodgram::api"))
}

pub fn with_state(state: State) -> impl Filter<Extract = (State,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn with_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::query::<FormData>().map(Form::from_data)
}

pub fn json_body<T: DeserializeOwned + Send>(
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

pub fn page_request(form: &Form) -> Result<PageRequest, Error> {
    Ok(PageRequest::new(
        form.get_number("page")?,
        form.get_number("limit")?,
    ))
}

/// `recipes_limit` of the subscription endpoints.
pub fn recipes_limit(form: &Form) -> Result<Option<i64>, Error> {
    match form.get_number::<i64>("recipes_limit")? {
        Some(limit) if limit < 0 => {
            Err(TypeError::new("'recipes_limit' must not be negative").into())
        }
        limit => Ok(limit),
    }
}

pub fn created<T: serde::Serialize>(value: &T) -> reply::WithStatus<reply::Json> {
    reply::with_status(reply::json(value), StatusCode::CREATED)
}

pub fn no_content() -> reply::WithStatus<impl Reply> {
    reply::with_status(reply(), StatusCode::NO_CONTENT)
}

fn error_reply(error: &Error) -> reply::WithStatus<reply::Json> {
    reply::with_status(reply::json(&error.body()), error.status())
}

/// Renders every rejection as a JSON error body.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(error) = err.find::<Error>() {
        if error.kind == ErrorKind::InternalServerError {
            log::error!("{error}");
            return Ok(error_reply(&ErrorKind::InternalServerError.default()));
        }
        return Ok(error_reply(error));
    }

    if err.is_not_found() {
        return Ok(error_reply(&ErrorKind::NotFound.default()));
    }

    if let Some(e) = err.find::<BodyDeserializeError>() {
        return Ok(error_reply(&TypeError::new(&e.to_string()).into()));
    }

    if let Some(e) = err.find::<InvalidQuery>() {
        return Ok(error_reply(&TypeError::new(&e.to_string()).into()));
    }

    let status = if err.find::<MethodNotAllowed>().is_some() {
        StatusCode::METHOD_NOT_ALLOWED
    } else if err.find::<PayloadTooLarge>().is_some() {
        StatusCode::PAYLOAD_TOO_LARGE
    } else if err.find::<UnsupportedMediaType>().is_some() {
        StatusCode::UNSUPPORTED_MEDIA_TYPE
    } else {
        log::error!("Unhandled rejection: {err:?}");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let error = Error {
        kind: ErrorKind::InvalidRequest,
        info: status.canonical_reason().map(String::from),
        fields: None,
    };
    Ok(reply::with_status(reply::json(&error.body()), status))
}
