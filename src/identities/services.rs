use std::{convert::TryFrom, sync::Arc};

use anyhow::Context;
use chrono::Utc;
use semval::ValidatedFrom;
use tera::Tera;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    email::clients::{EmailClient, Message},
    models::{self, UserModel},
    passwords::{self, Password},
    rate_limit::{RateLimitError, RateLimiter},
    repos::{DynEmailRepo, DynUserRepo, UserPersistenceError},
};

use super::{
    domain::{
        email::{Email, VerificationCode, VERIFICATION_CODE_LIFETIME_MINUTES},
        users::{NewUser, NewUserData, NewUserInvalidity, Username},
    },
    models::email::{NewEmail, NewEmailVerification},
};

pub type DynEmailClient = Arc<dyn EmailClient>;
pub type DynRateLimiter = Arc<dyn RateLimiter>;

/// Requests per minute allowed for each rate limited operation.
const LOGIN_RATE_LIMIT: u64 = 10;
const SIGNUP_RATE_LIMIT: u64 = 10;
const VERIFICATION_RATE_LIMIT: u64 = 10;

/// A service object providing functionality relating to users.
#[derive(Clone)]
pub struct UserService {
    email_client: DynEmailClient,
    email_repo: DynEmailRepo,
    rate_limiter: DynRateLimiter,
    require_verified_email: bool,
    templates: Tera,
    user_repo: DynUserRepo,
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    /// The provided user data is invalid.
    #[error("invalid user data: {0:?}")]
    InvalidUser(semval::context::Context<NewUserInvalidity>),

    #[error("email address is already registered")]
    DuplicateEmail,

    #[error("username is taken")]
    DuplicateUsername,

    /// The operation is rate limited for the provided client.
    #[error("operation is rate limited")]
    RateLimited(#[from] RateLimitError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The username doesn't exist or the password doesn't match.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("email address has not been verified")]
    EmailNotVerified,

    #[error("operation is rate limited")]
    RateLimited(#[from] RateLimitError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum VerificationError {
    /// The code is wrong, expired, or the address has nothing to verify.
    #[error("invalid or expired verification code")]
    InvalidCode,

    #[error("operation is rate limited")]
    RateLimited(#[from] RateLimitError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UserService {
    /// Create a new user service.
    ///
    /// # Arguments
    ///
    /// * `email_client` - The client used to send emails.
    /// * `email_repo` - The repository used to persist and query email
    ///   information.
    /// * `rate_limiter` - The rate limiter to use for rate limited operations.
    /// * `require_verified_email` - Refuse logins from users who haven't
    ///   verified their email address.
    /// * `templates` - The templating engine to use for composing email
    ///   content.
    /// * `user_repo` - The repository used to persist and query user
    ///   information.
    ///
    /// # Returns
    ///
    /// A new [`UserService`] instance.
    pub fn new(
        email_client: DynEmailClient,
        email_repo: DynEmailRepo,
        rate_limiter: DynRateLimiter,
        require_verified_email: bool,
        templates: Tera,
        user_repo: DynUserRepo,
    ) -> Self {
        Self {
            email_client,
            email_repo,
            rate_limiter,
            require_verified_email,
            templates,
            user_repo,
        }
    }

    /// Create a new user.
    ///
    /// The user, their email, and a verification code are persisted together,
    /// and then the code is mailed to the user. A failure to send the email
    /// does not undo the account since a new code can be requested.
    ///
    /// # Arguments
    ///
    /// * `client_identifier` - A unique identifier for the client performing
    ///   the operation. This is used for rate limiting.
    /// * `new_user_data` - The new user's information.
    pub async fn create_user(
        &self,
        client_identifier: &str,
        new_user_data: NewUserData,
    ) -> Result<NewUser, CreateUserError> {
        let rate_limit_key = format!("/identities/users_post_{}", client_identifier);
        self.rate_limiter
            .record_operation(&rate_limit_key, SIGNUP_RATE_LIMIT)?;

        let new_user = NewUser::validated_from(new_user_data)
            .map_err(|(_, context)| CreateUserError::InvalidUser(context))?;

        let user_model = models::NewUserModel::try_from(&new_user)
            .context("Failed to convert from domain to model.")?;
        let email_model = NewEmail::for_user(new_user.id(), new_user.email());
        let code = VerificationCode::generate();
        let verification_model = NewEmailVerification::new(email_model.id(), &code);

        match self
            .user_repo
            .persist_new_user(&user_model, &email_model, &verification_model)
            .await
        {
            Ok(()) => (),
            Err(UserPersistenceError::DuplicateEmail(_)) => {
                return Err(CreateUserError::DuplicateEmail)
            }
            Err(UserPersistenceError::DuplicateUsername(username)) => {
                debug!(%username, "Rejected duplicate username.");

                return Err(CreateUserError::DuplicateUsername);
            }
            Err(UserPersistenceError::Other(error)) => {
                error!(?error, "Failed to persist new user.");

                return Err(error.into());
            }
        }

        info!(user_id = %new_user.id(), "Created user.");

        if let Err(error) = self
            .send_verification_code(
                new_user.email().address(),
                new_user.username().as_str(),
                &code,
            )
            .await
        {
            error!(?error, user_id = %new_user.id(), "Failed to send verification email.");
        }

        Ok(new_user)
    }

    /// Check a user's login credentials.
    ///
    /// # Arguments
    ///
    /// * `client_identifier` - Identifies the client for rate limiting.
    /// * `username` - The username as typed. Case and surrounding whitespace
    ///   are ignored.
    /// * `password` - The password attempt.
    ///
    /// # Returns
    ///
    /// The authenticated user. A successful login is recorded as the user's
    /// last login.
    pub async fn authenticate(
        &self,
        client_identifier: &str,
        username: &str,
        password: &str,
    ) -> Result<UserModel, AuthenticationError> {
        let rate_limit_key = format!("/authentication/sessions_post_{}", client_identifier);
        self.rate_limiter
            .record_operation(&rate_limit_key, LOGIN_RATE_LIMIT)?;

        let username = Username::normalized(username);
        let user = match self.user_repo.get_user_by_username(username.as_str()).await? {
            Some(user) => user,
            None => {
                debug!(username = username.as_str(), "Login for unknown username.");

                return Err(AuthenticationError::InvalidCredentials);
            }
        };

        let hash = passwords::Hash::from_hash_str(&user.password_hash)
            .context("Invalid password hash received from model.")?;
        if !hash.matches(&Password::unvalidated(password))? {
            return Err(AuthenticationError::InvalidCredentials);
        }

        if self.require_verified_email && !user.email_verified {
            return Err(AuthenticationError::EmailNotVerified);
        }

        self.user_repo.record_login(user.id, Utc::now()).await?;
        debug!(user_id = %user.id, "Validated user credentials.");

        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<UserModel>> {
        self.user_repo.get_user(user_id).await
    }

    /// Mail a fresh verification code to an unverified address.
    ///
    /// Nothing is sent for unknown or already verified addresses, but the
    /// outcome looks the same to the caller.
    pub async fn resend_verification(
        &self,
        client_identifier: &str,
        address: &str,
    ) -> Result<(), VerificationError> {
        let rate_limit_key = format!("/identities/email-verifications_post_{}", client_identifier);
        self.rate_limiter
            .record_operation(&rate_limit_key, VERIFICATION_RATE_LIMIT)?;

        let email = Email::unvalidated(address);
        let unverified = match self
            .email_repo
            .get_unverified_email(&email.normalized())
            .await?
        {
            Some(unverified) => unverified,
            None => {
                debug!("No unverified address matches verification request.");

                return Ok(());
            }
        };

        let code = VerificationCode::generate();
        self.email_repo
            .insert_verification(&NewEmailVerification::new(unverified.email_id, &code))
            .await
            .context("Failed to save email verification model.")?;

        // A failed send must look the same as an unknown address.
        if let Err(error) = self
            .send_verification_code(&unverified.provided_address, &unverified.username, &code)
            .await
        {
            error!(?error, email_id = %unverified.email_id, "Failed to resend verification email.");
        }

        Ok(())
    }

    /// Verify an address using the code that was mailed to it.
    pub async fn confirm_email(
        &self,
        client_identifier: &str,
        address: &str,
        attempt: &str,
    ) -> Result<(), VerificationError> {
        let rate_limit_key = format!(
            "/identities/email-verifications/confirm_post_{}",
            client_identifier
        );
        self.rate_limiter
            .record_operation(&rate_limit_key, VERIFICATION_RATE_LIMIT)?;

        let email = Email::unvalidated(address);
        let unverified = self
            .email_repo
            .get_unverified_email(&email.normalized())
            .await?
            .ok_or(VerificationError::InvalidCode)?;

        let accepted = match (unverified.code, unverified.code_created_at) {
            (Some(code), Some(issued_at)) => {
                VerificationCode::from_stored(code).accepts(attempt, issued_at, Utc::now())
            }
            _ => false,
        };

        if !accepted {
            return Err(VerificationError::InvalidCode);
        }

        self.email_repo
            .mark_verified(unverified.email_id, Utc::now())
            .await?;
        info!(email_id = %unverified.email_id, "Verified email address.");

        Ok(())
    }

    async fn send_verification_code(
        &self,
        address: &str,
        username: &str,
        code: &VerificationCode,
    ) -> anyhow::Result<()> {
        let mut verification_context = tera::Context::new();
        verification_context.insert("username", username);
        verification_context.insert("code", code.as_str());
        verification_context.insert("expires_minutes", &VERIFICATION_CODE_LIFETIME_MINUTES);

        let content = self
            .templates
            .render("emails/verify.txt", &verification_context)
            .context("Failed to render email verification template.")?;

        let message = Message {
            to: address.to_owned(),
            subject: "Your Budget Buddy verification code".to_owned(),
            text: content,
        };

        self.email_client
            .send(&message)
            .await
            .context("Failed to send verification email.")
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use crate::{
        email::{
            self,
            clients::test_utils::{FailingMailer, RecordingMailer},
        },
        rate_limit::{test_utils::CountingRateLimiter, NoopRateLimiter},
        repos::memory::InMemoryStore,
    };

    use super::*;

    struct Harness {
        mailer: Arc<RecordingMailer>,
        service: UserService,
        store: Arc<InMemoryStore>,
    }

    fn harness_with(rate_limiter: DynRateLimiter, require_verified_email: bool) -> Harness {
        let mailer = Arc::new(RecordingMailer::default());
        let store = Arc::new(InMemoryStore::default());
        let service = UserService::new(
            mailer.clone(),
            store.clone(),
            rate_limiter,
            require_verified_email,
            email::templates().expect("templates should compile"),
            store.clone(),
        );

        Harness {
            mailer,
            service,
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(NoopRateLimiter), false)
    }

    fn new_user_data() -> NewUserData {
        NewUserData {
            username: "Ann".to_owned(),
            email: "Ann@Example.com".to_owned(),
            password: "correct horse".to_owned(),
        }
    }

    /// Pull the six digit code out of the last verification email.
    fn mailed_code(mailer: &RecordingMailer) -> String {
        let sent = mailer.sent();
        let text = &sent.last().expect("an email should be sent").text;

        text.split_whitespace()
            .find(|word| word.len() == 6 && word.chars().all(|c| c.is_ascii_digit()))
            .expect("email should contain a code")
            .to_owned()
    }

    #[tokio::test]
    async fn create_user_mails_verification_code() {
        let harness = harness();

        let user = harness
            .service
            .create_user("client", new_user_data())
            .await
            .expect("user should be created");

        let sent = harness.mailer.sent();
        assert_eq!("ann", user.username().as_str());
        assert_eq!(1, sent.len());
        assert_eq!("Ann@Example.com", sent[0].to);
        assert!(sent[0].text.contains("ann"));
    }

    #[tokio::test]
    async fn create_user_rejects_duplicates() {
        let harness = harness();
        harness
            .service
            .create_user("client", new_user_data())
            .await
            .expect("first user should be created");

        let same_username = NewUserData {
            email: "other@example.com".to_owned(),
            ..new_user_data()
        };
        let same_email = NewUserData {
            username: "other".to_owned(),
            email: "ANN@example.com".to_owned(),
            ..new_user_data()
        };

        assert!(matches!(
            harness.service.create_user("client", same_username).await,
            Err(CreateUserError::DuplicateUsername)
        ));
        assert!(matches!(
            harness.service.create_user("client", same_email).await,
            Err(CreateUserError::DuplicateEmail)
        ));
    }

    #[tokio::test]
    async fn create_user_is_rate_limited() {
        let harness = harness_with(Arc::new(CountingRateLimiter::default()), false);

        for attempt in 0..SIGNUP_RATE_LIMIT {
            let data = NewUserData {
                username: format!("user{}", attempt),
                email: format!("user{}@example.com", attempt),
                ..new_user_data()
            };
            harness
                .service
                .create_user("client", data)
                .await
                .expect("should be under the limit");
        }

        assert!(matches!(
            harness.service.create_user("client", new_user_data()).await,
            Err(CreateUserError::RateLimited(RateLimitError::Limited(_)))
        ));
    }

    #[tokio::test]
    async fn authenticate_normalizes_username() {
        let harness = harness();
        let user_id = harness.store.add_user("ann", "correct horse");

        let user = harness
            .service
            .authenticate("client", "  ANN ", "correct horse")
            .await
            .expect("credentials should be valid");

        assert_eq!(user_id, user.id);
        assert!(harness.store.last_login(user_id).is_some());
    }

    #[tokio::test]
    async fn authenticate_rejects_bad_credentials() {
        let harness = harness();
        harness.store.add_user("ann", "correct horse");

        assert!(matches!(
            harness
                .service
                .authenticate("client", "ann", "wrong horse")
                .await,
            Err(AuthenticationError::InvalidCredentials)
        ));
        assert!(matches!(
            harness
                .service
                .authenticate("client", "bob", "correct horse")
                .await,
            Err(AuthenticationError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn authenticate_can_require_verified_email() {
        let harness = harness_with(Arc::new(NoopRateLimiter), true);
        harness
            .service
            .create_user("client", new_user_data())
            .await
            .expect("create user");

        let result = harness
            .service
            .authenticate("client", "ann", "correct horse")
            .await;

        assert!(matches!(result, Err(AuthenticationError::EmailNotVerified)));
    }

    #[tokio::test]
    async fn confirm_email_with_mailed_code() {
        let harness = harness();
        harness
            .service
            .create_user("client", new_user_data())
            .await
            .expect("create user");
        let code = mailed_code(&harness.mailer);

        harness
            .service
            .confirm_email("client", "ann@example.com", &code)
            .await
            .expect("code should be accepted");

        assert!(harness.store.is_verified("ann@example.com"));
    }

    #[tokio::test]
    async fn confirm_email_rejects_expired_code() {
        let harness = harness();
        harness
            .service
            .create_user("client", new_user_data())
            .await
            .expect("create user");
        let code = mailed_code(&harness.mailer);
        harness.store.set_verification_issued_at(
            "ann@example.com",
            Utc::now() - Duration::minutes(VERIFICATION_CODE_LIFETIME_MINUTES + 1),
        );

        let result = harness
            .service
            .confirm_email("client", "ann@example.com", &code)
            .await;

        assert!(matches!(result, Err(VerificationError::InvalidCode)));
        assert!(!harness.store.is_verified("ann@example.com"));
    }

    #[tokio::test]
    async fn resend_replaces_code() {
        let harness = harness();
        harness
            .service
            .create_user("client", new_user_data())
            .await
            .expect("create user");

        harness
            .service
            .resend_verification("client", " ann@EXAMPLE.com ")
            .await
            .expect("resend should succeed");
        let code = mailed_code(&harness.mailer);

        assert_eq!(2, harness.mailer.sent().len());
        harness
            .service
            .confirm_email("client", "ann@example.com", &code)
            .await
            .expect("latest code should be accepted");
    }

    #[tokio::test]
    async fn resend_for_unknown_address_sends_nothing() {
        let harness = harness();

        harness
            .service
            .resend_verification("client", "nobody@example.com")
            .await
            .expect("unknown addresses look like success");

        assert!(harness.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn resend_hides_mailer_failures() {
        let store = Arc::new(InMemoryStore::default());
        let service = UserService::new(
            Arc::new(FailingMailer),
            store.clone(),
            Arc::new(NoopRateLimiter),
            false,
            email::templates().expect("templates should compile"),
            store.clone(),
        );
        service
            .create_user("client", new_user_data())
            .await
            .expect("signup survives a mailer failure");

        service
            .resend_verification("client", "ann@example.com")
            .await
            .expect("known addresses look the same as unknown ones");
    }
}
