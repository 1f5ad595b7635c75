//! Authentication service.
//!
//! Accounts are keyed by a normalized email. Passwords are stored as an
//! unsalted SHA-256 hex digest, so identical passwords share a digest and the
//! table is open to precomputed lookups. Existing rows depend on the format;
//! moving to a salted KDF needs a rehash-on-login migration.

mod error;

pub use error::AuthError;

use sha2::{Digest, Sha256};
use tracing::instrument;

use freshmart_core::{Email, UserId};

use crate::db::{NewUser, RepositoryError, Store};
use crate::models::User;

/// Authentication service.
///
/// Handles user registration, login, and profile updates.
pub struct AuthService<'a> {
    store: &'a dyn Store,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Register a new user.
    ///
    /// Name and email are trimmed; the password is digested as given.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if a field is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    #[instrument(skip(self, password), fields(email = %email.trim()))]
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let name = required("name", name)?;
        required("email", email)?;
        if password.trim().is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        let email = Email::parse(email)?;

        let user = self
            .store
            .create_user(&NewUser {
                name: name.to_owned(),
                email,
                password_digest: password_digest(password),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check an email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if no account matches, including
    /// when the email is malformed.
    #[instrument(skip(self, password), fields(email = %email.trim()))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        self.store
            .find_user_by_credentials(&email, &password_digest(password))
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }

    /// Overwrite the name and email of an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` or `AuthError::InvalidEmail` for bad
    /// input, `AuthError::EmailTaken` if another account owns the email.
    #[instrument(skip(self, name, email))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        name: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let name = required("name", name)?;
        required("email", email)?;
        let email = Email::parse(email)?;

        self.store
            .update_user(user_id, name, &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })
    }
}

/// Hex SHA-256 of the password bytes.
#[must_use]
pub fn password_digest(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

fn required<'s>(field: &'static str, value: &'s str) -> Result<&'s str, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(trimmed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;

    async fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    #[test]
    fn test_password_digest_is_hex_sha256() {
        assert_eq!(
            password_digest("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
        assert_eq!(password_digest("").len(), 64);
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let store = store().await;
        let auth = AuthService::new(&store);

        let user = auth
            .signup("  Asha  ", " Asha@Example.com ", "s3cret")
            .await
            .unwrap();
        assert_eq!(user.name, "Asha");
        assert_eq!(user.email.as_str(), "asha@example.com");

        let logged_in = auth.login("ASHA@example.com", "s3cret").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let store = store().await;
        let auth = AuthService::new(&store);
        auth.signup("Ravi", "ravi@example.com", "right").await.unwrap();

        assert!(matches!(
            auth.login("ravi@example.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("not-an-email", "right").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let store = store().await;
        let auth = AuthService::new(&store);
        auth.signup("One", "dup@example.com", "pw").await.unwrap();

        let second = auth.signup("Two", "DUP@example.com", "pw2").await;
        assert!(matches!(second, Err(AuthError::EmailTaken)));

        let dump = store.dump_tables().await.unwrap();
        let users = dump.iter().find(|t| t.name == "users").unwrap();
        assert_eq!(users.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_signup_requires_all_fields() {
        let store = store().await;
        let auth = AuthService::new(&store);

        assert!(matches!(
            auth.signup("   ", "a@b.c", "pw").await,
            Err(AuthError::MissingField("name"))
        ));
        assert!(matches!(
            auth.signup("A", "", "pw").await,
            Err(AuthError::MissingField("email"))
        ));
        assert!(matches!(
            auth.signup("A", "a@b.c", "  ").await,
            Err(AuthError::MissingField("password"))
        ));
        assert!(matches!(
            auth.signup("A", "no-at", "pw").await,
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_taken_email() {
        let store = store().await;
        let auth = AuthService::new(&store);
        let first = auth.signup("First", "first@example.com", "pw").await.unwrap();
        auth.signup("Second", "second@example.com", "pw").await.unwrap();

        let updated = auth
            .update_profile(first.id, "Renamed", "FIRST2@example.com")
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.email.as_str(), "first2@example.com");

        assert!(matches!(
            auth.update_profile(first.id, "Renamed", "second@example.com")
                .await,
            Err(AuthError::EmailTaken)
        ));
    }
}
