use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    database::PostgresConnection,
    identities::models::email::{NewEmailVerification, UnverifiedEmail},
};

pub type DynEmailRepo = Arc<dyn EmailRepo + Send + Sync>;

#[async_trait]
pub trait EmailRepo {
    /// Find an address that is still awaiting verification.
    ///
    /// # Arguments
    ///
    /// * `normalized_address` - The lowercased form of the address.
    ///
    /// # Returns
    ///
    /// The unverified address, or [`None`] if the address is unknown or has
    /// already been verified.
    async fn get_unverified_email(
        &self,
        normalized_address: &str,
    ) -> anyhow::Result<Option<UnverifiedEmail>>;

    async fn insert_verification(
        &self,
        email_verification: &NewEmailVerification,
    ) -> anyhow::Result<()>;

    /// Mark an address as verified and discard its verification code.
    async fn mark_verified(&self, email_id: Uuid, verified_at: DateTime<Utc>)
        -> anyhow::Result<()>;
}

#[async_trait]
impl EmailRepo for PostgresConnection {
    async fn get_unverified_email(
        &self,
        normalized_address: &str,
    ) -> anyhow::Result<Option<UnverifiedEmail>> {
        Ok(sqlx::query_as::<_, UnverifiedEmail>(
            r#"
            SELECT
                e.id AS email_id,
                e.provided_address,
                u.username,
                v.code,
                v.created_at AS code_created_at
            FROM email e
                JOIN "user" u ON e.user_id = u.id
                LEFT JOIN email_verification v ON v.email_id = e.id
            WHERE e.normalized_address = $1 AND e.verified_at IS NULL
            "#,
        )
        .bind(normalized_address)
        .fetch_optional(&**self)
        .await?)
    }

    async fn insert_verification(
        &self,
        email_verification: &NewEmailVerification,
    ) -> anyhow::Result<()> {
        Ok(email_verification.save(&**self).await?)
    }

    async fn mark_verified(
        &self,
        email_id: Uuid,
        verified_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut tx = self.begin().await?;

        sqlx::query("UPDATE email SET verified_at = $2 WHERE id = $1")
            .bind(email_id)
            .bind(verified_at)
            .execute(&mut tx)
            .await?;

        sqlx::query("DELETE FROM email_verification WHERE email_id = $1")
            .bind(email_id)
            .execute(&mut tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
