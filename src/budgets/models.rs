//! Rows read from the budget tables.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::domain::{
    budgets::Budget,
    categories::{Category, Member},
    items::ExpenseItem,
    room_codes::RoomCode,
};

#[derive(Clone, Debug, FromRow)]
pub struct BudgetModel {
    pub id: i64,
    pub name: String,
    pub total: i64,
    pub owner_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub room_code: String,
    pub created_at: DateTime<Utc>,
}

impl From<BudgetModel> for Budget {
    fn from(model: BudgetModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            total: model.total,
            owner_id: model.owner_id,
            start_date: model.start_date,
            end_date: model.end_date,
            room_code: RoomCode::from_stored(model.room_code),
            created_at: model.created_at,
        }
    }
}

#[derive(Clone, Debug, FromRow)]
pub struct CategoryModel {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
}

impl From<CategoryModel> for Category {
    fn from(model: CategoryModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            icon: model.icon,
        }
    }
}

#[derive(Clone, Debug, FromRow)]
pub struct MemberModel {
    pub user_id: Uuid,
    pub username: String,
}

impl From<MemberModel> for Member {
    fn from(model: MemberModel) -> Self {
        Self {
            user_id: model.user_id,
            username: model.username,
        }
    }
}

/// An expense item joined with the name of the user it is attributed to.
#[derive(Clone, Debug, FromRow)]
pub struct ExpenseItemModel {
    pub id: i64,
    pub budget_id: i64,
    pub category_id: i64,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub amount: i64,
    pub name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ExpenseItemModel> for ExpenseItem {
    fn from(model: ExpenseItemModel) -> Self {
        Self {
            id: model.id,
            budget_id: model.budget_id,
            category_id: model.category_id,
            user_id: model.user_id,
            username: model.username,
            amount: model.amount,
            name: model.name,
            notes: model.notes,
            created_at: model.created_at,
        }
    }
}
