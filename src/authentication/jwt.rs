use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::{Error, ErrorKind};
use crate::schema::{User, UserRole, Uuid};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = now
            .checked_add_signed(lifetime)
            .map_or(i64::MAX, |exp| exp.timestamp());

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

/// Identity of the user making the request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(ErrorKind::PermissionDenied.default());
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

impl From<&User> for SessionData {
    fn from(user: &User) -> Self {
        SessionData {
            user_id: user.id,
            username: user.username.to_owned(),
            is_admin: user.role == UserRole::Admin,
            role: user.role.to_owned(),
        }
    }
}

/// Signing key and token lifetime, built once from the configuration.
#[derive(Clone)]
pub struct JwtKeys {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, lifetime_hours: i64) -> Result<Self, Error> {
        let key: Hmac<Sha256> = Hmac::new_from_slice(secret.as_bytes())
            .map_err(|_| ErrorKind::InternalServerError.new("Invalid JWT secret"))?;

        let lifetime = Duration::try_hours(lifetime_hours)
            .ok_or_else(|| ErrorKind::InternalServerError.new("Invalid JWT lifetime"))?;

        Ok(Self { key, lifetime })
    }

    pub fn generate_session(&self, user: &User) -> Result<String, Error> {
        let claims = JwtSessionData::new(
            user.id,
            user.username.to_owned(),
            user.role.to_owned(),
            self.lifetime,
        );

        claims.sign_with_key(&self.key).map_err(|e| {
            log::error!("Failed to sign session: {e}");
            ErrorKind::InternalServerError.default()
        })
    }

    pub fn verify_session(&self, token: &str) -> Result<JwtSessionData, Error> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| ErrorKind::Unauthorized.new("Invalid session; Invalid token"))?;

        let now = Local::now().timestamp();
        if (session.exp - now).is_negative() {
            return Err(ErrorKind::Unauthorized.new("Invalid session; Token expired"));
        }

        Ok(session)
    }
}
