use serde::Deserialize;

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{JwtKeys, SessionData},
    },
    constants::{EMAIL_MAX_LENGTH, USERNAME_MAX_LENGTH},
    error::{Error, ErrorKind, ValidationErrors},
    pagination::{PageContext, PageRequest},
    schema::{NewUser, RelationKind, UserInfo, Uuid},
    store::Store,
    views::UserView,
};

#[derive(Deserialize, Debug, Clone)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SetPasswordForm {
    pub current_password: String,
    pub new_password: String,
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'))
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn validate_registration(form: &RegisterForm) -> Result<(), Error> {
    let mut errors = ValidationErrors::new();
    let mut add = |field: &str, message: &str| {
        errors
            .entry(field.to_string())
            .or_default()
            .push(message.to_string())
    };

    if !is_valid_email(&form.email) || form.email.len() > EMAIL_MAX_LENGTH {
        add("email", "Enter a valid email address");
    }
    if form.username.is_empty() || form.username.chars().count() > USERNAME_MAX_LENGTH {
        add(
            "username",
            &format!("Username must be 1 to {USERNAME_MAX_LENGTH} characters long"),
        );
    } else if !is_valid_username(&form.username) {
        add(
            "username",
            "Username may contain only letters, digits and @/./+/-/_",
        );
    }
    for (field, value) in [("first_name", &form.first_name), ("last_name", &form.last_name)] {
        if value.trim().is_empty() || value.chars().count() > USERNAME_MAX_LENGTH {
            add(
                field,
                &format!("Must be 1 to {USERNAME_MAX_LENGTH} characters long"),
            );
        }
    }
    if form.password.is_empty() {
        add("password", "This field is required");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(errors))
    }
}

/// Decorates `user` with whether `viewer` follows them.
pub async fn user_view(
    store: &dyn Store,
    viewer: Option<&SessionData>,
    user: UserInfo,
) -> Result<UserView, Error> {
    let is_subscribed = match viewer {
        Some(session) => {
            store
                .has_relation(RelationKind::Follow, session.user_id, user.id)
                .await?
        }
        None => false,
    };

    Ok(UserView {
        user,
        is_subscribed,
    })
}

pub async fn register_user(store: &dyn Store, form: RegisterForm) -> Result<UserInfo, Error> {
    validate_registration(&form)?;

    let user = store
        .create_user(NewUser {
            email: form.email.trim().to_string(),
            username: form.username,
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            password: hash_password(&form.password)?,
        })
        .await?;
    log::info!("Registered user {} ({})", user.username, user.id);

    Ok(user.info())
}

/// Exchanges credentials for a session token.
pub async fn login_user(
    store: &dyn Store,
    keys: &JwtKeys,
    form: LoginForm,
) -> Result<String, Error> {
    let user = store
        .get_user_by_email(&form.email)
        .await?
        .ok_or_else(|| ErrorKind::InvalidRequest.new("Invalid credentials"))?;

    if !verify_password(&form.password, &user.password)? {
        return Err(ErrorKind::InvalidRequest.new("Invalid credentials"));
    }

    keys.generate_session(&user)
}

pub async fn get_user(
    store: &dyn Store,
    viewer: Option<&SessionData>,
    id: Uuid,
) -> Result<UserView, Error> {
    let user = store
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("User not found"))?;

    user_view(store, viewer, user.info()).await
}

pub async fn current_user(store: &dyn Store, session: &SessionData) -> Result<UserView, Error> {
    let user = store
        .get_user_by_id(session.user_id)
        .await?
        .ok_or_else(|| ErrorKind::Unauthorized.new("User no longer exists"))?;

    Ok(UserView {
        user: user.info(),
        is_subscribed: false,
    })
}

pub async fn fetch_users(
    store: &dyn Store,
    viewer: Option<&SessionData>,
    page: PageRequest,
) -> Result<PageContext<UserView>, Error> {
    let users = store.fetch_users(page).await?;

    let mut results = Vec::with_capacity(users.results.len());
    for user in users.results {
        results.push(user_view(store, viewer, user).await?);
    }

    Ok(PageContext {
        count: users.count,
        next: users.next,
        previous: users.previous,
        results,
    })
}

pub async fn set_password(
    store: &dyn Store,
    session: &SessionData,
    form: SetPasswordForm,
) -> Result<(), Error> {
    let user = store
        .get_user_by_id(session.user_id)
        .await?
        .ok_or_else(|| ErrorKind::Unauthorized.new("User no longer exists"))?;

    if !verify_password(&form.current_password, &user.password)? {
        let mut errors = ValidationErrors::new();
        errors.insert(
            String::from("current_password"),
            vec![String::from("Invalid password")],
        );
        return Err(Error::validation(errors));
    }
    if form.new_password.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.insert(
            String::from("new_password"),
            vec![String::from("This field is required")],
        );
        return Err(Error::validation(errors));
    }

    store
        .set_password(user.id, &hash_password(&form.new_password)?)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegisterForm {
        RegisterForm {
            email: String::from("cook@example.com"),
            username: String::from("cook_1"),
            first_name: String::from("Ann"),
            last_name: String::from("Cook"),
            password: String::from("pass"),
        }
    }

    #[test]
    fn registration_rules() {
        assert!(validate_registration(&form()).is_ok());

        let mut bad = form();
        bad.email = String::from("nope");
        bad.username = String::from("has space");
        bad.first_name = String::new();
        let fields = validate_registration(&bad).unwrap_err().fields.unwrap();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("first_name"));
        assert!(!fields.contains_key("last_name"));
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@bco"));
        assert!(!is_valid_email("a@.co"));
    }
}
