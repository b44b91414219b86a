use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    budgets::{
        domain::{
            budgets::{Budget, NewBudget},
            categories::Member,
            room_codes::RoomCode,
        },
        models::{BudgetModel, MemberModel},
    },
    database::PostgresConnection,
};

#[derive(Debug, Error)]
pub enum BudgetPersistenceError {
    /// Another budget already uses the room code.
    #[error("duplicate room code: {0:?}")]
    DuplicateRoomCode(RoomCode),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DynBudgetRepo = Arc<dyn BudgetRepo + Send + Sync>;

#[async_trait]
pub trait BudgetRepo {
    /// Persist a new budget and connect its owner to it.
    async fn create_budget(
        &self,
        owner_id: Uuid,
        budget: &NewBudget,
        room_code: &RoomCode,
    ) -> Result<Budget, BudgetPersistenceError>;

    /// Connect a user to a budget.
    ///
    /// # Returns
    ///
    /// `true` if a new connection was made, or `false` if the user was
    /// already a member.
    async fn add_member(&self, user_id: Uuid, budget_id: i64) -> anyhow::Result<bool>;

    async fn get_budget_by_room_code(&self, room_code: &RoomCode)
        -> anyhow::Result<Option<Budget>>;

    /// Get a budget, but only if the user is a member of it.
    async fn get_member_budget(&self, user_id: Uuid, budget_id: i64)
        -> anyhow::Result<Option<Budget>>;

    /// List the budgets a user is a member of, newest first.
    async fn list_member_budgets(&self, user_id: Uuid) -> anyhow::Result<Vec<Budget>>;

    async fn list_members(&self, budget_id: i64) -> anyhow::Result<Vec<Member>>;
}

#[async_trait]
impl BudgetRepo for PostgresConnection {
    async fn create_budget(
        &self,
        owner_id: Uuid,
        budget: &NewBudget,
        room_code: &RoomCode,
    ) -> Result<Budget, BudgetPersistenceError> {
        let mut tx = self.begin().await.map_err(anyhow::Error::from)?;

        let insert_result = sqlx::query_as::<_, BudgetModel>(
            r#"
            INSERT INTO budget (name, total, owner_id, start_date, end_date, room_code)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(budget.name())
        .bind(budget.total())
        .bind(owner_id)
        .bind(budget.start_date())
        .bind(budget.end_date())
        .bind(room_code.as_str())
        .fetch_one(&mut tx)
        .await;

        let model = match insert_result {
            Ok(model) => model,
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                return Err(BudgetPersistenceError::DuplicateRoomCode(room_code.clone()));
            }
            Err(error) => return Err(anyhow::Error::from(error).into()),
        };

        sqlx::query("INSERT INTO budget_member (user_id, budget_id) VALUES ($1, $2)")
            .bind(owner_id)
            .bind(model.id)
            .execute(&mut tx)
            .await
            .map_err(anyhow::Error::from)?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        Ok(model.into())
    }

    async fn add_member(&self, user_id: Uuid, budget_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO budget_member (user_id, budget_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(budget_id)
        .execute(&**self)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_budget_by_room_code(
        &self,
        room_code: &RoomCode,
    ) -> anyhow::Result<Option<Budget>> {
        let model = sqlx::query_as::<_, BudgetModel>("SELECT * FROM budget WHERE room_code = $1")
            .bind(room_code.as_str())
            .fetch_optional(&**self)
            .await?;

        Ok(model.map(Budget::from))
    }

    async fn get_member_budget(
        &self,
        user_id: Uuid,
        budget_id: i64,
    ) -> anyhow::Result<Option<Budget>> {
        let model = sqlx::query_as::<_, BudgetModel>(
            r#"
            SELECT b.*
            FROM budget b
                JOIN budget_member m ON m.budget_id = b.id
            WHERE b.id = $1 AND m.user_id = $2
            "#,
        )
        .bind(budget_id)
        .bind(user_id)
        .fetch_optional(&**self)
        .await?;

        Ok(model.map(Budget::from))
    }

    async fn list_member_budgets(&self, user_id: Uuid) -> anyhow::Result<Vec<Budget>> {
        let models = sqlx::query_as::<_, BudgetModel>(
            r#"
            SELECT b.*
            FROM budget b
                JOIN budget_member m ON m.budget_id = b.id
            WHERE m.user_id = $1
            ORDER BY b.created_at DESC, b.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&**self)
        .await?;

        Ok(models.into_iter().map(Budget::from).collect())
    }

    async fn list_members(&self, budget_id: i64) -> anyhow::Result<Vec<Member>> {
        let models = sqlx::query_as::<_, MemberModel>(
            r#"
            SELECT u.id AS user_id, u.username
            FROM budget_member m
                JOIN "user" u ON m.user_id = u.id
            WHERE m.budget_id = $1
            ORDER BY m.joined_at, u.username
            "#,
        )
        .bind(budget_id)
        .fetch_all(&**self)
        .await?;

        Ok(models.into_iter().map(Member::from).collect())
    }
}
