use chrono::{DateTime, Duration, Utc};
use rand::{thread_rng, Rng};
use semval::prelude::*;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Email(String);

impl Email {
    /// Create an unvalidated email.
    ///
    /// This can be useful when constructing an object that contains an email
    /// but has not been validated yet.
    ///
    /// # Arguments
    ///
    /// * `address` - The email's address. Surrounding whitespace is dropped.
    pub fn unvalidated(address: &str) -> Self {
        Self(address.trim().to_owned())
    }

    pub fn address(&self) -> &str {
        &self.0
    }

    /// The form of the address used for uniqueness checks and lookups.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    fn has_domain(&self) -> bool {
        if let Some(index) = self.0.rfind('@') {
            index < self.0.len() - 1
        } else {
            false
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EmailInvalidity {
    /// The address does not have a domain portion.
    MissingDomain,

    /// The address is missing the `@` symbol separating the local and domain
    /// parts.
    MissingSeparator,
}

impl Validate for Email {
    type Invalidity = EmailInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(!self.0.contains('@'), EmailInvalidity::MissingSeparator)
            .invalidate_if(!self.has_domain(), EmailInvalidity::MissingDomain)
            .into()
    }
}

impl ValidatedFrom<&str> for Email {
    fn validated_from(from: &str) -> ValidatedResult<Self> {
        let into = Self::unvalidated(from);

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

const VERIFICATION_CODE_LENGTH: usize = 6;

/// How long a verification code is accepted after being issued.
pub const VERIFICATION_CODE_LIFETIME_MINUTES: i64 = 15;

/// A short numeric code mailed to a user to prove they own an address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerificationCode(String);

impl VerificationCode {
    pub fn generate() -> Self {
        let mut rng = thread_rng();
        let code = (0..VERIFICATION_CODE_LENGTH)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();

        Self(code)
    }

    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check a user-provided code against this one.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The code the user typed in. Whitespace is ignored.
    /// * `issued_at` - When this code was issued.
    /// * `now` - The current time.
    pub fn accepts(&self, attempt: &str, issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let expires_at = issued_at + Duration::minutes(VERIFICATION_CODE_LIFETIME_MINUTES);
        let cleaned: String = attempt.chars().filter(|c| !c.is_whitespace()).collect();

        now <= expires_at && cleaned == self.0
    }
}
