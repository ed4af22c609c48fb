use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::password::{hash_password, verify_dummy, verify_password};
use crate::{
    error::ApiError,
    store::{normalize_email, NewUser, UserRecord, UserStore},
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Checks shared by registration and profile updates.
pub fn validate_identity(name: &str, email: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    if !is_valid_email(&normalize_email(email)) {
        return Err(ApiError::validation("Invalid email"));
    }
    Ok(())
}

/// Validate, hash and insert a new user.
pub async fn create_user(
    store: &dyn UserStore,
    name: &str,
    email: &str,
    password: &str,
) -> Result<UserRecord, ApiError> {
    validate_identity(name, email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(password)?;
    let user = store
        .create_user(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
        })
        .await?;
    info!(user_id = %user.id, "user created");
    Ok(user)
}

/// Resolve credentials to a user. Unknown email and wrong password fail
/// identically with [`ApiError::InvalidCredentials`].
pub async fn authenticate(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<UserRecord, ApiError> {
    let Some(user) = store.find_by_email(email).await? else {
        verify_dummy(password);
        warn!("login for unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }
    Ok(user)
}
