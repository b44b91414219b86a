use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use password_hash::SaltString;
use rand_core::OsRng;

use super::Password;

/// A salted argon2 hash of a user's password.
///
/// Passwords are never stored or compared in plain text; login attempts are
/// checked with [`Hash::matches`].
#[derive(Clone, Debug)]
pub struct Hash(String);

impl Hash {
    /// Hash a password with a freshly generated salt.
    ///
    /// # Arguments
    ///
    /// * `password` - The user's password.
    ///
    /// # Returns
    ///
    /// Returns a [`Result`] containing the hashed password if the operation
    /// completed successfully.
    pub fn new(password: &Password) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), salt.as_ref())?
            .to_string();

        Ok(Self(password_hash))
    }

    /// Construct a hash from the PHC string stored in the `user` table.
    ///
    /// # Returns
    ///
    /// A [`Result`] containing the parsed hash. This will contain an [`Err`]
    /// variant if the provided string is not a valid hash.
    pub fn from_hash_str(hash: &str) -> Result<Self> {
        Ok(Self(PasswordHash::new(hash)?.to_string()))
    }

    /// Determine if a login attempt's password matches the hash.
    ///
    /// # Returns
    ///
    /// A [`Result`] containing a [`bool`] that indicates if the password
    /// matches the hash. Errors only occur if the stored hash is unusable.
    pub fn matches(&self, attempt: &Password) -> Result<bool> {
        // This should be valid due to a `Hash` only being creatable from valid
        // data.
        let parsed_hash = PasswordHash::new(&self.0)?;

        match Argon2::default().verify_password(attempt.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}
