use anyhow::Result;
use semval::prelude::*;
use uuid::Uuid;

use crate::passwords::{self, Password, PasswordInvalidity};

use super::email::{Email, EmailInvalidity};

const MAX_USERNAME_LENGTH: usize = 32;
const MIN_USERNAME_LENGTH: usize = 3;

/// A username, stored lowercase so logins are case insensitive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Username(String);

impl Username {
    /// Normalize a username as typed by a user.
    pub fn normalized(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UsernameInvalidity {
    MinLength(usize),
    MaxLength(usize),
    /// Only lowercase letters, digits, `_`, `.` and `-` are allowed.
    InvalidCharacters,
}

impl Validate for Username {
    type Invalidity = UsernameInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        let length = self.0.chars().count();
        let has_invalid_chars = !self
            .0
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'));

        ValidationContext::new()
            .invalidate_if(
                length < MIN_USERNAME_LENGTH,
                UsernameInvalidity::MinLength(MIN_USERNAME_LENGTH),
            )
            .invalidate_if(
                length > MAX_USERNAME_LENGTH,
                UsernameInvalidity::MaxLength(MAX_USERNAME_LENGTH),
            )
            .invalidate_if(has_invalid_chars, UsernameInvalidity::InvalidCharacters)
            .into()
    }
}

#[derive(Debug)]
pub struct NewUser {
    id: Uuid,
    username: Username,
    email: Email,
    password: Password,
}

impl NewUser {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn password_hash(&self) -> Result<passwords::Hash> {
        passwords::Hash::new(&self.password)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NewUserInvalidity {
    Username(UsernameInvalidity),
    Email(EmailInvalidity),
    Password(PasswordInvalidity),
}

impl Validate for NewUser {
    type Invalidity = NewUserInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .validate_with(&self.username, NewUserInvalidity::Username)
            .validate_with(&self.email, NewUserInvalidity::Email)
            .validate_with(&self.password, NewUserInvalidity::Password)
            .into()
    }
}

#[derive(Clone, Debug)]
pub struct NewUserData {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl ValidatedFrom<NewUserData> for NewUser {
    fn validated_from(from: NewUserData) -> ValidatedResult<Self> {
        let into = NewUser {
            id: Uuid::new_v4(),
            username: Username::normalized(&from.username),
            email: Email::unvalidated(&from.email),
            password: Password::unvalidated(&from.password),
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}
