use std::convert::TryFrom;

use chrono::{DateTime, NaiveDate, Utc};
use semval::prelude::*;
use uuid::Uuid;

use super::{
    money::{self, AmountInvalidity},
    room_codes::RoomCode,
};

const MAX_BUDGET_NAME_LENGTH: usize = 100;

/// A named, shared spending plan.
#[derive(Clone, Debug, PartialEq)]
pub struct Budget {
    pub id: i64,
    pub name: String,
    /// The amount available to spend, in cents.
    pub total: i64,
    pub owner_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub room_code: RoomCode,
    pub created_at: DateTime<Utc>,
}

/// Budget information as submitted by a user.
#[derive(Clone, Debug)]
pub struct NewBudgetData {
    pub name: String,
    pub total: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A validated budget that has not been persisted yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBudget {
    name: String,
    total: i64,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BudgetInvalidity {
    NameMissing,
    NameTooLong(usize),
    Total(AmountInvalidity),
    EndBeforeStart,
}

impl NewBudget {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }
}

impl TryFrom<NewBudgetData> for NewBudget {
    type Error = ValidationContext<BudgetInvalidity>;

    fn try_from(data: NewBudgetData) -> Result<Self, Self::Error> {
        let name = data.name.trim().to_owned();
        let ends_before_start = matches!(
            (data.start_date, data.end_date),
            (Some(start), Some(end)) if end < start
        );

        let context = ValidationContext::new()
            .invalidate_if(name.is_empty(), BudgetInvalidity::NameMissing)
            .invalidate_if(
                name.chars().count() > MAX_BUDGET_NAME_LENGTH,
                BudgetInvalidity::NameTooLong(MAX_BUDGET_NAME_LENGTH),
            )
            .invalidate_if(ends_before_start, BudgetInvalidity::EndBeforeStart);

        let (total, context) = match money::parse_non_negative_amount(&data.total) {
            Ok(total) => (total, context),
            Err(invalidity) => (0, context.invalidate(BudgetInvalidity::Total(invalidity))),
        };

        let validation: ValidationResult<BudgetInvalidity> = context.into();
        validation?;

        Ok(Self {
            name,
            total,
            start_date: data.start_date,
            end_date: data.end_date,
        })
    }
}
