use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use semval::context::Context as ValidationContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budgets::{
    domain::{
        budgets::{Budget, BudgetInvalidity, NewBudgetData},
        categories::{Category, Member},
        items::{ExpenseInvalidity, ExpenseItem, NewExpenseItemData},
        money::{format_amount, AmountInvalidity, MAX_AMOUNT},
        summary::{BarSegment, DayGroup, SegmentKind, Share},
    },
    services::{BudgetReport, JoinedBudget, Ledger},
};

/// Percentages are reported to a single decimal place.
fn round_percent(percent: f64) -> f64 {
    (percent * 10.0).round() / 10.0
}

fn amount_messages(invalidity: AmountInvalidity, messages: &mut Vec<String>) {
    messages.push(match invalidity {
        AmountInvalidity::Missing => "Please enter an amount.".to_owned(),
        AmountInvalidity::NotANumber => "Amount must be a number.".to_owned(),
        AmountInvalidity::TooPrecise(_) => {
            "Amounts may not have more than two decimal places.".to_owned()
        }
        AmountInvalidity::Negative => "Amount may not be negative.".to_owned(),
        AmountInvalidity::TooLarge => format!(
            "Amounts may not be larger than {}.",
            format_amount(MAX_AMOUNT)
        ),
    });
}

#[derive(Deserialize)]
pub struct NewBudget {
    pub name: String,
    pub total: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<NewBudget> for NewBudgetData {
    fn from(rep: NewBudget) -> Self {
        Self {
            name: rep.name,
            total: rep.total,
            start_date: rep.start_date,
            end_date: rep.end_date,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BudgetValidationError {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub total: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub end_date: Vec<String>,
}

impl From<ValidationContext<BudgetInvalidity>> for BudgetValidationError {
    fn from(validation: ValidationContext<BudgetInvalidity>) -> Self {
        let mut response = Self::default();

        for invalidity in validation.into_iter() {
            match invalidity {
                BudgetInvalidity::NameMissing => {
                    response.name.push("Please name the budget.".to_owned())
                }
                BudgetInvalidity::NameTooLong(max) => response.name.push(format!(
                    "Budget names may not contain more than {} characters.",
                    max
                )),
                BudgetInvalidity::Total(amount) => amount_messages(amount, &mut response.total),
                BudgetInvalidity::EndBeforeStart => response
                    .end_date
                    .push("The end date may not be before the start date.".to_owned()),
            }
        }

        response
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BudgetRep {
    pub id: i64,
    pub name: String,
    pub total: String,
    pub owner_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub room_code: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Budget> for BudgetRep {
    fn from(budget: &Budget) -> Self {
        Self {
            id: budget.id,
            name: budget.name.clone(),
            total: format_amount(budget.total),
            owner_id: budget.owner_id,
            start_date: budget.start_date,
            end_date: budget.end_date,
            room_code: budget.room_code.as_str().to_owned(),
            created_at: budget.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct JoinRequest {
    pub room_code: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct JoinResponse {
    pub budget_id: i64,
    pub name: String,
    pub room_code: String,
    /// `false` if the user was already a member of the budget.
    pub joined: bool,
}

impl From<&JoinedBudget> for JoinResponse {
    fn from(joined: &JoinedBudget) -> Self {
        Self {
            budget_id: joined.budget.id,
            name: joined.budget.name.clone(),
            room_code: joined.budget.room_code.as_str().to_owned(),
            joined: joined.joined,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MemberRep {
    pub user_id: Uuid,
    pub username: String,
}

impl From<&Member> for MemberRep {
    fn from(member: &Member) -> Self {
        Self {
            user_id: member.user_id,
            username: member.username.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CategoryRep {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
}

impl From<&Category> for CategoryRep {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            icon: category.icon.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct NewExpenseItem {
    pub amount: String,
    pub category_id: Option<i64>,
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub spent_at: Option<DateTime<Utc>>,
}

impl From<NewExpenseItem> for NewExpenseItemData {
    fn from(rep: NewExpenseItem) -> Self {
        Self {
            amount: rep.amount,
            category_id: rep.category_id,
            user_id: rep.user_id,
            name: rep.name,
            notes: rep.notes,
            spent_at: rep.spent_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ExpenseValidationError {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amount: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_id: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_id: Vec<String>,
}

impl From<ValidationContext<ExpenseInvalidity>> for ExpenseValidationError {
    fn from(validation: ValidationContext<ExpenseInvalidity>) -> Self {
        let mut response = Self::default();

        for invalidity in validation.into_iter() {
            match invalidity {
                ExpenseInvalidity::Amount(amount) => amount_messages(amount, &mut response.amount),
                ExpenseInvalidity::CategoryMissing => response
                    .category_id
                    .push("Please select a category.".to_owned()),
                ExpenseInvalidity::UserMissing => response
                    .user_id
                    .push("Please select who spent the money.".to_owned()),
            }
        }

        response
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExpenseItemRep {
    pub id: i64,
    pub budget_id: i64,
    pub category_id: i64,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub amount: String,
    pub name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ExpenseItem> for ExpenseItemRep {
    fn from(item: &ExpenseItem) -> Self {
        Self {
            id: item.id,
            budget_id: item.budget_id,
            category_id: item.category_id,
            user_id: item.user_id,
            username: item.username.clone(),
            amount: format_amount(item.amount),
            name: item.name.clone(),
            notes: item.notes.clone(),
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DayRep {
    pub date: NaiveDate,
    pub total: String,
    pub items: Vec<ExpenseItemRep>,
}

impl From<&DayGroup> for DayRep {
    fn from(day: &DayGroup) -> Self {
        Self {
            date: day.date,
            total: format_amount(day.total),
            items: day.items.iter().map(ExpenseItemRep::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LedgerRep {
    pub budget_id: i64,
    pub revision: u64,
    pub days: Vec<DayRep>,
}

impl From<&Ledger> for LedgerRep {
    fn from(ledger: &Ledger) -> Self {
        Self {
            budget_id: ledger.budget.id,
            revision: ledger.revision,
            days: ledger.days.iter().map(DayRep::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CategoryShareRep {
    pub category_id: i64,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub amount: String,
    pub percent_of_budget: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserShareRep {
    pub username: String,
    pub amount: String,
    pub percent_of_budget: f64,
}

impl From<&Share<String>> for UserShareRep {
    fn from(share: &Share<String>) -> Self {
        Self {
            username: share.key.clone(),
            amount: format_amount(share.amount),
            percent_of_budget: round_percent(share.percent_of_budget),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKindRep {
    Category,
    Remaining,
    Placeholder,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BarSegmentRep {
    pub kind: SegmentKindRep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub flex: f64,
}

impl From<&BarSegment> for BarSegmentRep {
    fn from(segment: &BarSegment) -> Self {
        let (kind, category_id) = match segment.kind {
            SegmentKind::Category(id) => (SegmentKindRep::Category, Some(id)),
            SegmentKind::Remaining => (SegmentKindRep::Remaining, None),
            SegmentKind::Placeholder => (SegmentKindRep::Placeholder, None),
        };

        Self {
            kind,
            category_id,
            flex: segment.flex,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SummaryRep {
    pub budget: BudgetRep,
    pub revision: u64,
    pub spent: String,
    pub remaining: String,
    pub usage_percent: Option<f64>,
    pub categories: Vec<CategoryShareRep>,
    pub users: Vec<UserShareRep>,
    pub members: Vec<MemberRep>,
    pub bar: Vec<BarSegmentRep>,
}

impl From<&BudgetReport> for SummaryRep {
    fn from(report: &BudgetReport) -> Self {
        let categories_by_id: HashMap<i64, &Category> = report
            .categories
            .iter()
            .map(|category| (category.id, category))
            .collect();

        let categories = report
            .summary
            .categories
            .iter()
            .map(|share| {
                let category = categories_by_id.get(&share.key);

                CategoryShareRep {
                    category_id: share.key,
                    name: category.map(|c| c.name.clone()),
                    icon: category.and_then(|c| c.icon.clone()),
                    amount: format_amount(share.amount),
                    percent_of_budget: round_percent(share.percent_of_budget),
                }
            })
            .collect();

        Self {
            budget: BudgetRep::from(&report.budget),
            revision: report.revision,
            spent: format_amount(report.summary.spent),
            remaining: format_amount(report.summary.remaining),
            usage_percent: report.summary.usage_percent.map(round_percent),
            categories,
            users: report.summary.users.iter().map(UserShareRep::from).collect(),
            members: report.members.iter().map(MemberRep::from).collect(),
            bar: report.summary.bar.iter().map(BarSegmentRep::from).collect(),
        }
    }
}

#[derive(Deserialize)]
pub struct ChangesParams {
    pub since: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChangesRep {
    pub revision: u64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn percents_round_to_one_decimal() {
        assert_eq!(33.3, round_percent(100.0 / 3.0));
        assert_eq!(66.7, round_percent(200.0 / 3.0));
        assert_eq!(0.0, round_percent(0.0));
    }

    #[test]
    fn expense_errors_are_grouped_by_field() {
        let context = semval::context::Context::new()
            .invalidate(ExpenseInvalidity::Amount(AmountInvalidity::NotANumber))
            .invalidate(ExpenseInvalidity::UserMissing);

        let rep = ExpenseValidationError::from(context);

        assert_eq!(vec!["Amount must be a number.".to_owned()], rep.amount);
        assert!(rep.category_id.is_empty());
        assert_eq!(1, rep.user_id.len());
    }
}
