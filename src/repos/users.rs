use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    database::PostgresConnection,
    identities::models::email::{EmailPersistanceError, NewEmail, NewEmailVerification},
    models::{NewUserModel, UserModel},
};

#[derive(Debug, Error)]
pub enum UserPersistenceError {
    #[error("duplicate email address: {0:?}")]
    DuplicateEmail(NewEmail),

    #[error("duplicate username: {0}")]
    DuplicateUsername(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DynUserRepo = Arc<dyn UserRepo + Send + Sync>;

#[async_trait]
pub trait UserRepo {
    /// Persist a new user, their email, and its first verification code as a
    /// single unit.
    async fn persist_new_user(
        &self,
        user: &NewUserModel,
        email: &NewEmail,
        verification: &NewEmailVerification,
    ) -> Result<(), UserPersistenceError>;

    async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<UserModel>>;

    /// Find a user by their normalized username.
    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<UserModel>>;

    async fn record_login(&self, user_id: Uuid, logged_in_at: DateTime<Utc>)
        -> anyhow::Result<()>;
}

const USER_COLUMNS: &str = r#"
    SELECT
        u.id,
        u.username,
        u.password AS password_hash,
        EXISTS (
            SELECT 1 FROM email e WHERE e.user_id = u.id AND e.verified_at IS NOT NULL
        ) AS email_verified
    FROM "user" u
"#;

#[async_trait]
impl UserRepo for PostgresConnection {
    async fn persist_new_user(
        &self,
        user: &NewUserModel,
        email: &NewEmail,
        verification: &NewEmailVerification,
    ) -> Result<(), UserPersistenceError> {
        let mut tx = self.begin().await.map_err(anyhow::Error::from)?;

        let user_result = sqlx::query(
            r#"
            INSERT INTO "user" (id, username, password)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .execute(&mut tx)
        .await;

        match user_result {
            Ok(_) => (),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                let constraint = db_err
                    .try_downcast_ref::<PgDatabaseError>()
                    .and_then(|pg_err| pg_err.constraint());

                if constraint == Some("user_username_key") {
                    return Err(UserPersistenceError::DuplicateUsername(
                        user.username.clone(),
                    ));
                }

                return Err(anyhow::Error::from(sqlx::Error::Database(db_err)).into());
            }
            Err(error) => return Err(anyhow::Error::from(error).into()),
        }

        email.save(&mut tx).await.map_err(|error| match error {
            EmailPersistanceError::DuplicateEmail(email) => {
                UserPersistenceError::DuplicateEmail(email)
            }
            other => UserPersistenceError::Other(other.into()),
        })?;

        verification
            .save(&mut tx)
            .await
            .map_err(anyhow::Error::from)?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<UserModel>> {
        let query = format!("{} WHERE u.id = $1", USER_COLUMNS);

        Ok(sqlx::query_as::<_, UserModel>(&query)
            .bind(user_id)
            .fetch_optional(&**self)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<UserModel>> {
        let query = format!("{} WHERE u.username = $1", USER_COLUMNS);

        Ok(sqlx::query_as::<_, UserModel>(&query)
            .bind(username)
            .fetch_optional(&**self)
            .await?)
    }

    async fn record_login(
        &self,
        user_id: Uuid,
        logged_in_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE "user" SET last_login = $2 WHERE id = $1"#)
            .bind(user_id)
            .bind(logged_in_at)
            .execute(&**self)
            .await?;

        Ok(())
    }
}
