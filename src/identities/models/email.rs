use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, Postgres};
use thiserror::Error;
use uuid::Uuid;

use crate::identities::domain::email::{Email, VerificationCode};

#[derive(Clone, Debug)]
pub struct NewEmail {
    id: Uuid,
    user_id: Uuid,
    provided_address: String,
    normalized_address: String,
}

impl NewEmail {
    /// Create an email that can be inserted into the database belonging to a
    /// specific user.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The ID of the user who owns the email address.
    /// * `email` - The email address to persist.
    pub fn for_user(user_id: Uuid, email: &Email) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            provided_address: email.address().to_owned(),
            normalized_address: email.normalized(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn provided_address(&self) -> &str {
        &self.provided_address
    }

    pub fn normalized_address(&self) -> &str {
        &self.normalized_address
    }

    pub async fn save<'c, E>(&self, executor: E) -> Result<(), EmailPersistanceError>
    where
        E: Executor<'c, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO email (id, user_id, provided_address, normalized_address)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(&self.provided_address)
        .bind(&self.normalized_address)
        .execute(executor)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                Err(EmailPersistanceError::DuplicateEmail(self.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum EmailPersistanceError {
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("duplicate email address: {0:?}")]
    DuplicateEmail(NewEmail),
}

/// A verification code waiting to be stored. Storing a code replaces any
/// earlier code for the same address.
#[derive(Clone, Debug)]
pub struct NewEmailVerification {
    email_id: Uuid,
    code: String,
}

impl NewEmailVerification {
    pub fn new(email_id: Uuid, code: &VerificationCode) -> Self {
        Self {
            email_id,
            code: code.as_str().to_owned(),
        }
    }

    pub fn email_id(&self) -> Uuid {
        self.email_id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub async fn save<'c, E>(&self, executor: E) -> sqlx::Result<()>
    where
        E: Executor<'c, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO email_verification (email_id, code)
            VALUES ($1, $2)
            ON CONFLICT (email_id)
                DO UPDATE SET code = EXCLUDED.code, created_at = now()
            "#,
        )
        .bind(self.email_id)
        .bind(&self.code)
        .execute(executor)
        .await?;

        Ok(())
    }
}

/// An address that has not been verified yet, along with its outstanding
/// verification code if one was issued.
#[derive(Clone, Debug, FromRow)]
pub struct UnverifiedEmail {
    pub email_id: Uuid,
    pub provided_address: String,
    pub username: String,
    pub code: Option<String>,
    pub code_created_at: Option<DateTime<Utc>>,
}
