use std::convert::TryFrom;

use anyhow::anyhow;
use chrono::Utc;
use semval::context::Context as ValidationContext;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::repos::{
    BudgetPersistenceError, DynBudgetRepo, DynCategoryRepo, DynExpenseItemRepo,
};

use super::{
    changes::{BudgetChanges, CHANGE_POLL_TIMEOUT},
    domain::{
        budgets::{Budget, BudgetInvalidity, NewBudget, NewBudgetData},
        categories::{Category, Member},
        items::{ExpenseInvalidity, ExpenseItem, NewExpenseItem, NewExpenseItemData},
        room_codes::RoomCode,
        summary::{self, BudgetSummary, DayGroup},
    },
};

/// Number of room codes tried before giving up on creating a budget.
const ROOM_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum BudgetAccessError {
    /// The budget doesn't exist or the user is not a member of it.
    #[error("budget not found")]
    NotFound,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum CreateBudgetError {
    #[error("invalid budget data: {0:?}")]
    InvalidBudget(ValidationContext<BudgetInvalidity>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum JoinBudgetError {
    /// No budget uses the provided room code.
    #[error("no budget matches the room code")]
    NotFound,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum SubmitExpenseError {
    #[error("budget not found")]
    BudgetNotFound,

    #[error("invalid expense data: {0:?}")]
    InvalidExpense(ValidationContext<ExpenseInvalidity>),

    /// The category does not exist or the selected user is not a member of
    /// the budget.
    #[error("invalid category or user selection")]
    InvalidSelection,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<BudgetAccessError> for SubmitExpenseError {
    fn from(error: BudgetAccessError) -> Self {
        match error {
            BudgetAccessError::NotFound => Self::BudgetNotFound,
            BudgetAccessError::Other(error) => Self::Other(error),
        }
    }
}

/// The outcome of joining a budget by room code.
#[derive(Clone, Debug)]
pub struct JoinedBudget {
    pub budget: Budget,
    /// `false` if the user was already a member.
    pub joined: bool,
}

/// A budget's items grouped by the day they were logged, newest first.
#[derive(Clone, Debug)]
pub struct Ledger {
    pub budget: Budget,
    pub days: Vec<DayGroup>,
    pub revision: u64,
}

/// Everything needed to show how a budget's money has been spent.
#[derive(Clone, Debug)]
pub struct BudgetReport {
    pub budget: Budget,
    pub categories: Vec<Category>,
    pub members: Vec<Member>,
    pub summary: BudgetSummary,
    pub revision: u64,
}

/// A service object providing functionality relating to budgets and the
/// expenses logged against them.
#[derive(Clone)]
pub struct BudgetService {
    budget_repo: DynBudgetRepo,
    category_repo: DynCategoryRepo,
    changes: BudgetChanges,
    item_repo: DynExpenseItemRepo,
}

impl BudgetService {
    pub fn new(
        budget_repo: DynBudgetRepo,
        category_repo: DynCategoryRepo,
        changes: BudgetChanges,
        item_repo: DynExpenseItemRepo,
    ) -> Self {
        Self {
            budget_repo,
            category_repo,
            changes,
            item_repo,
        }
    }

    /// Create a budget owned by a user.
    ///
    /// A random room code is generated for the budget. If the code is already
    /// in use, a new one is generated a limited number of times.
    ///
    /// # Arguments
    ///
    /// * `owner_id` - The creating user. They are connected to the new budget.
    /// * `data` - The submitted budget information.
    pub async fn create_budget(
        &self,
        owner_id: Uuid,
        data: NewBudgetData,
    ) -> Result<Budget, CreateBudgetError> {
        let new_budget = NewBudget::try_from(data).map_err(CreateBudgetError::InvalidBudget)?;

        for attempt in 1..=ROOM_CODE_ATTEMPTS {
            let room_code = RoomCode::generate();

            match self
                .budget_repo
                .create_budget(owner_id, &new_budget, &room_code)
                .await
            {
                Ok(budget) => {
                    info!(budget_id = budget.id, %owner_id, "Created budget.");

                    return Ok(budget);
                }
                Err(BudgetPersistenceError::DuplicateRoomCode(code)) => {
                    warn!(attempt, room_code = code.as_str(), "Generated room code is taken.");
                }
                Err(BudgetPersistenceError::Other(error)) => return Err(error.into()),
            }
        }

        Err(anyhow!(
            "Failed to generate a unique room code after {} attempts.",
            ROOM_CODE_ATTEMPTS
        )
        .into())
    }

    pub async fn list_budgets(&self, user_id: Uuid) -> anyhow::Result<Vec<Budget>> {
        self.budget_repo.list_member_budgets(user_id).await
    }

    /// Get a budget the user is a member of.
    pub async fn get_budget(
        &self,
        user_id: Uuid,
        budget_id: i64,
    ) -> Result<Budget, BudgetAccessError> {
        self.budget_repo
            .get_member_budget(user_id, budget_id)
            .await?
            .ok_or(BudgetAccessError::NotFound)
    }

    pub async fn list_members(
        &self,
        user_id: Uuid,
        budget_id: i64,
    ) -> Result<Vec<Member>, BudgetAccessError> {
        self.get_budget(user_id, budget_id).await?;

        Ok(self.budget_repo.list_members(budget_id).await?)
    }

    pub async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        self.category_repo.list_categories().await
    }

    /// Join the budget identified by a room code.
    ///
    /// Joining a budget the user already belongs to succeeds without creating
    /// a second connection.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The joining user.
    /// * `raw_room_code` - The code as typed by the user.
    pub async fn join_budget(
        &self,
        user_id: Uuid,
        raw_room_code: &str,
    ) -> Result<JoinedBudget, JoinBudgetError> {
        let room_code = match RoomCode::parse(raw_room_code) {
            Some(code) => code,
            None => {
                debug!(raw_room_code, "Received malformed room code.");

                return Err(JoinBudgetError::NotFound);
            }
        };

        let budget = self
            .budget_repo
            .get_budget_by_room_code(&room_code)
            .await?
            .ok_or(JoinBudgetError::NotFound)?;

        let joined = self.budget_repo.add_member(user_id, budget.id).await?;
        if joined {
            info!(budget_id = budget.id, %user_id, "User joined budget.");
            self.changes.notify(budget.id);
        }

        Ok(JoinedBudget { budget, joined })
    }

    /// List a budget's items grouped by day.
    pub async fn ledger(&self, user_id: Uuid, budget_id: i64) -> Result<Ledger, BudgetAccessError> {
        let budget = self.get_budget(user_id, budget_id).await?;
        let revision = self.changes.current(budget_id);
        let items = self.item_repo.list_items(budget_id).await?;

        Ok(Ledger {
            budget,
            days: summary::group_by_day(&items),
            revision,
        })
    }

    /// Aggregate a budget's spending.
    pub async fn report(
        &self,
        user_id: Uuid,
        budget_id: i64,
    ) -> Result<BudgetReport, BudgetAccessError> {
        let budget = self.get_budget(user_id, budget_id).await?;
        let revision = self.changes.current(budget_id);

        let (categories, members, items) = tokio::try_join!(
            self.category_repo.list_categories(),
            self.budget_repo.list_members(budget_id),
            self.item_repo.list_items(budget_id),
        )?;

        let summary = BudgetSummary::compute(budget.total, &items);

        Ok(BudgetReport {
            budget,
            categories,
            members,
            summary,
            revision,
        })
    }

    /// Log an expense against a budget.
    ///
    /// The form is validated before anything is stored, and the category and
    /// attributed user must exist and belong to the budget. A successful
    /// submission bumps the budget's revision.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user submitting the expense.
    /// * `budget_id` - The budget to log the expense against.
    /// * `data` - The submitted expense form.
    pub async fn submit_expense(
        &self,
        user_id: Uuid,
        budget_id: i64,
        data: NewExpenseItemData,
    ) -> Result<ExpenseItem, SubmitExpenseError> {
        self.get_budget(user_id, budget_id).await?;

        let new_item = NewExpenseItem::from_data(budget_id, data, Utc::now())
            .map_err(SubmitExpenseError::InvalidExpense)?;

        let category = self
            .category_repo
            .get_category(new_item.category_id())
            .await?;
        let selected_member = self
            .budget_repo
            .get_member_budget(new_item.user_id(), budget_id)
            .await?;

        if category.is_none() || selected_member.is_none() {
            debug!(
                budget_id,
                category_id = new_item.category_id(),
                selected_user_id = %new_item.user_id(),
                "Rejected expense with invalid selection."
            );

            return Err(SubmitExpenseError::InvalidSelection);
        }

        let item = self.item_repo.insert_item(&new_item).await?;
        let revision = self.changes.notify(budget_id);

        info!(budget_id, item_id = item.id, revision, "Logged expense.");

        Ok(item)
    }

    pub async fn get_revision(&self, user_id: Uuid, budget_id: i64) -> Result<u64, BudgetAccessError> {
        self.get_budget(user_id, budget_id).await?;

        Ok(self.changes.current(budget_id))
    }

    /// Wait until a budget changes from the revision a client last saw.
    pub async fn wait_for_change(
        &self,
        user_id: Uuid,
        budget_id: i64,
        since: u64,
    ) -> Result<u64, BudgetAccessError> {
        self.get_budget(user_id, budget_id).await?;

        Ok(self
            .changes
            .wait_for_change(budget_id, since, CHANGE_POLL_TIMEOUT)
            .await)
    }
}
