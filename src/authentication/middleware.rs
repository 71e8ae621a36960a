use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::{
    constants::SESSION_HEADER_PREFIX,
    error::{Error, ErrorKind},
};

use super::jwt::{JwtKeys, SessionData};

/// Parses `Authorization: Token <jwt>`.
pub fn session_from_header(keys: &JwtKeys, header: &str) -> Result<SessionData, Error> {
    let token = header
        .strip_prefix(SESSION_HEADER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ErrorKind::Unauthorized.new("Invalid session; Malformed header"))?;

    keys.verify_session(token).map(SessionData::from)
}

pub fn with_session(
    keys: Arc<JwtKeys>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move {
            let header = header.ok_or_else(|| ErrorKind::Unauthorized.default())?;
            session_from_header(&keys, &header).map_err(Rejection::from)
        }
    })
}

/// Anonymous requests pass with `None`; a present but invalid token is
/// still rejected.
pub fn with_possible_session(
    keys: Arc<JwtKeys>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move {
            match header {
                Some(header) => session_from_header(&keys, &header)
                    .map(Some)
                    .map_err(Rejection::from),
                None => Ok(None),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{User, UserRole};

    fn keys() -> JwtKeys {
        JwtKeys::new("test-secret", 1).unwrap()
    }

    fn token(keys: &JwtKeys) -> String {
        let user = User {
            id: 3,
            email: String::from("a@b.c"),
            username: String::from("abc"),
            first_name: String::from("A"),
            last_name: String::from("B"),
            password: String::new(),
            role: UserRole::User,
        };
        keys.generate_session(&user).unwrap()
    }

    #[test]
    fn header_needs_token_prefix() {
        let keys = keys();
        let token = token(&keys);

        assert_eq!(
            session_from_header(&keys, &format!("Token {token}"))
                .unwrap()
                .user_id,
            3
        );
        assert!(session_from_header(&keys, &format!("Bearer {token}")).is_err());
        assert!(session_from_header(&keys, "Token ").is_err());
    }

    #[tokio::test]
    async fn anonymous_request_has_no_session() {
        let filter = with_possible_session(Arc::new(keys()));
        let session = warp::test::request().filter(&filter).await.unwrap();
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn required_session_rejects_anonymous() {
        let filter = with_session(Arc::new(keys()));
        assert!(warp::test::request().filter(&filter).await.is_err());
    }

    #[tokio::test]
    async fn required_session_accepts_token() {
        let keys = Arc::new(keys());
        let token = token(&keys);
        let filter = with_session(keys);

        let session = warp::test::request()
            .header("authorization", format!("Token {token}"))
            .filter(&filter)
            .await
            .unwrap();
        assert_eq!(session.username, "abc");
    }
}
