use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    budgets::{
        domain::items::{ExpenseItem, NewExpenseItem},
        models::ExpenseItemModel,
    },
    database::PostgresConnection,
};

pub type DynExpenseItemRepo = Arc<dyn ExpenseItemRepo + Send + Sync>;

#[async_trait]
pub trait ExpenseItemRepo {
    async fn insert_item(&self, item: &NewExpenseItem) -> anyhow::Result<ExpenseItem>;

    /// List every item logged against a budget, newest first.
    async fn list_items(&self, budget_id: i64) -> anyhow::Result<Vec<ExpenseItem>>;
}

#[async_trait]
impl ExpenseItemRepo for PostgresConnection {
    async fn insert_item(&self, item: &NewExpenseItem) -> anyhow::Result<ExpenseItem> {
        let model = sqlx::query_as::<_, ExpenseItemModel>(
            r#"
            WITH inserted AS (
                INSERT INTO expense_item
                    (budget_id, category_id, user_id, amount, name, notes, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT i.*, u.username
            FROM inserted i
                LEFT JOIN "user" u ON i.user_id = u.id
            "#,
        )
        .bind(item.budget_id())
        .bind(item.category_id())
        .bind(item.user_id())
        .bind(item.amount())
        .bind(item.name())
        .bind(item.notes())
        .bind(item.created_at())
        .fetch_one(&**self)
        .await?;

        Ok(model.into())
    }

    async fn list_items(&self, budget_id: i64) -> anyhow::Result<Vec<ExpenseItem>> {
        let models = sqlx::query_as::<_, ExpenseItemModel>(
            r#"
            SELECT i.*, u.username
            FROM expense_item i
                LEFT JOIN "user" u ON i.user_id = u.id
            WHERE i.budget_id = $1
            ORDER BY i.created_at DESC, i.id DESC
            "#,
        )
        .bind(budget_id)
        .fetch_all(&**self)
        .await?;

        Ok(models.into_iter().map(ExpenseItem::from).collect())
    }
}
