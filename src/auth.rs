//! Signup/login rules: field validation, bcrypt hashing and verification.
//!
//! Session handling lives with whatever front end sits on top; everything
//! past login works from a resolved user id.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Pool, Sqlite};

use crate::database::db::queries;
use crate::database::models::User;
use crate::error::TrackerError;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// Validates signup fields, hashes the password and creates the user.
/// Returns the new user id. Nothing is written when validation fails.
pub async fn signup(
    pool: &Pool<Sqlite>,
    username: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<i64, TrackerError> {
    let username = username.trim();
    let email = email.trim().to_lowercase();

    if username.len() < MIN_USERNAME_LEN {
        return Err(TrackerError::Validation(format!(
            "username must be at least {} characters long",
            MIN_USERNAME_LEN
        )));
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(TrackerError::Validation(
            "please enter a valid email address".to_string(),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(TrackerError::Validation(format!(
            "password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    if password != confirm_password {
        return Err(TrackerError::Validation(
            "passwords do not match".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    queries::create_user(pool, username, &email, &password_hash).await
}

/// Verifies the credentials against the stored hash for an active user.
pub async fn authenticate(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<User, TrackerError> {
    let user = queries::get_user_by_username(pool, username.trim())
        .await?
        .ok_or(TrackerError::NotAuthenticated)?;

    if bcrypt::verify(password, &user.password_hash)? {
        Ok(user)
    } else {
        Err(TrackerError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::connection::test_pool;

    #[tokio::test]
    async fn signup_rejects_bad_fields_before_writing() {
        let pool = test_pool().await;

        let cases = [
            ("ab", "ab@example.com", "secret1", "secret1"),
            ("alice", "not-an-email", "secret1", "secret1"),
            ("alice", "alice@example.com", "short", "short"),
            ("alice", "alice@example.com", "secret1", "secret2"),
        ];
        for (username, email, password, confirm) in cases {
            let result = signup(&pool, username, email, password, confirm).await;
            assert!(matches!(result, Err(TrackerError::Validation(_))));
        }

        assert_eq!(queries::user_count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn signup_then_login_round_trip() {
        let pool = test_pool().await;

        let id = signup(&pool, "alice", "Alice@Example.COM", "secret1", "secret1")
            .await
            .unwrap();
        assert!(id > 0);

        let user = authenticate(&pool, "alice", "secret1").await.unwrap();
        assert_eq!(user.id, id);
        // Email is stored lowercased.
        assert_eq!(user.email, "alice@example.com");

        let wrong = authenticate(&pool, "alice", "wrong-password").await;
        assert!(matches!(wrong, Err(TrackerError::NotAuthenticated)));

        let unknown = authenticate(&pool, "nobody", "secret1").await;
        assert!(matches!(unknown, Err(TrackerError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn duplicate_signup_is_a_conflict() {
        let pool = test_pool().await;

        signup(&pool, "alice", "alice@example.com", "secret1", "secret1")
            .await
            .unwrap();
        let again = signup(&pool, "alice", "alice2@example.com", "secret1", "secret1").await;
        assert!(matches!(again, Err(TrackerError::Duplicate(_))));
        assert_eq!(queries::user_count(&pool).await.unwrap(), 1);
    }
}
