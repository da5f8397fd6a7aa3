//! Authentication service.
//!
//! Provides account registration and password login. Password hashes use
//! Argon2id; the session itself is managed by the tower-sessions layer.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use tamarind_core::{Email, Phone, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Special characters a password must draw from.
const PASSWORD_SPECIALS: &str = "!@#$%^&*";

/// Authentication service.
///
/// Handles user registration and password login.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if a required field is blank.
    /// Returns `AuthError::InvalidEmail` / `AuthError::InvalidPhone` for
    /// malformed values, `AuthError::WeakPassword` if the password does not
    /// meet requirements, and `AuthError::EmailTaken` / `AuthError::PhoneTaken`
    /// on duplicates.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: &str,
    ) -> Result<User, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }

        let email = Email::parse(email)?;
        let phone = Phone::parse(phone)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(name, &email, &phone, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) if msg.starts_with("phone") => AuthError::PhoneTaken,
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Login with email and password, stamping the last-login time on
    /// success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is
    /// wrong. A malformed email maps to the same error so login does not
    /// reveal which part failed.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        self.users.touch_last_login(user.id).await?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Validate password meets requirements: minimum length plus at least one
/// lowercase letter, uppercase letter, digit, and special character.
fn validate_password(password: &str) -> Result<(), AuthError> {
    let strong = password.len() >= MIN_PASSWORD_LENGTH
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if strong {
        Ok(())
    } else {
        Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters and include uppercase, \
             lowercase, number, and special character ({PASSWORD_SPECIALS})"
        )))
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_accepts_strong() {
        assert!(validate_password("Sup3r!ok").is_ok());
    }

    #[test]
    fn test_validate_password_rejects_short() {
        assert!(validate_password("A1!b").is_err());
    }

    #[test]
    fn test_validate_password_requires_every_class() {
        assert!(validate_password("alllower1!").is_err()); // no uppercase
        assert!(validate_password("ALLUPPER1!").is_err()); // no lowercase
        assert!(validate_password("NoDigits!!").is_err()); // no digit
        assert!(validate_password("NoSpecial1").is_err()); // no special
    }

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("Sup3r!ok").unwrap();
        assert!(verify_password("Sup3r!ok", &hash).is_ok());
        assert!(matches!(
            verify_password("Wr0ng!pw", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
