use chrono::{DateTime, Utc};
use semval::prelude::*;
use uuid::Uuid;

use super::money::{self, AmountInvalidity};

/// The name given to items submitted without one.
pub const UNNAMED_ITEM: &str = "Unnamed Item";

/// A single recorded expense.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseItem {
    pub id: i64,
    pub budget_id: i64,
    pub category_id: i64,
    /// The user the expense is attributed to. [`None`] if that user has since
    /// been deleted.
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    /// Amount spent, in cents.
    pub amount: i64,
    pub name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Expense form data as submitted by a user.
#[derive(Clone, Debug, Default)]
pub struct NewExpenseItemData {
    pub amount: String,
    pub category_id: Option<i64>,
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub spent_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExpenseInvalidity {
    Amount(AmountInvalidity),
    CategoryMissing,
    UserMissing,
}

/// A validated expense that has not been persisted yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewExpenseItem {
    budget_id: i64,
    category_id: i64,
    user_id: Uuid,
    amount: i64,
    name: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl NewExpenseItem {
    /// Validate a submitted expense form.
    ///
    /// # Arguments
    ///
    /// * `budget_id` - The budget the expense is logged against.
    /// * `data` - The submitted form.
    /// * `now` - Timestamp to use if the form doesn't say when the money was
    ///   spent.
    ///
    /// # Returns
    ///
    /// The new item, or every problem found with the form.
    pub fn from_data(
        budget_id: i64,
        data: NewExpenseItemData,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationContext<ExpenseInvalidity>> {
        let context = ValidationContext::new()
            .invalidate_if(data.category_id.is_none(), ExpenseInvalidity::CategoryMissing)
            .invalidate_if(data.user_id.is_none(), ExpenseInvalidity::UserMissing);

        let (amount, context) = match money::parse_non_negative_amount(&data.amount) {
            Ok(amount) => (amount, context),
            Err(invalidity) => (0, context.invalidate(ExpenseInvalidity::Amount(invalidity))),
        };

        let validation: ValidationResult<ExpenseInvalidity> = context.into();
        validation?;

        let name = data
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNNAMED_ITEM)
            .to_owned();
        let notes = data
            .notes
            .map(|notes| notes.trim().to_owned())
            .filter(|notes| !notes.is_empty());

        Ok(Self {
            budget_id,
            category_id: data.category_id.unwrap_or_default(),
            user_id: data.user_id.unwrap_or_default(),
            amount,
            name,
            notes,
            created_at: data.spent_at.unwrap_or(now),
        })
    }

    pub fn budget_id(&self) -> i64 {
        self.budget_id
    }

    pub fn category_id(&self) -> i64 {
        self.category_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
