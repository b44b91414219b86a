//! Aggregations over the expense items of a single budget.
//!
//! Everything here is a pure function of a budget's total and its items, so
//! summaries are recomputed on every request instead of being stored.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::items::ExpenseItem;

/// Name that spending is attributed to when the user who logged it no longer
/// exists.
pub const UNKNOWN_USER: &str = "Unknown";

/// One entry of a category or user breakdown.
#[derive(Clone, Debug, PartialEq)]
pub struct Share<K> {
    pub key: K,
    /// Amount spent, in cents.
    pub amount: i64,
    pub percent_of_budget: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentKind {
    Category(i64),
    Remaining,
    /// Drawn when the budget has no positive total to compare against.
    Placeholder,
}

/// A slice of the budget usage bar. The `flex` values of a bar sum to 100.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarSegment {
    pub kind: SegmentKind,
    pub flex: f64,
}

/// Items logged on the same calendar day.
#[derive(Clone, Debug, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub total: i64,
    pub items: Vec<ExpenseItem>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BudgetSummary {
    pub total: i64,
    pub spent: i64,
    pub remaining: i64,
    /// Share of the budget that has been spent. [`None`] if the budget total
    /// is not positive.
    pub usage_percent: Option<f64>,
    pub categories: Vec<Share<i64>>,
    pub users: Vec<Share<String>>,
    pub bar: Vec<BarSegment>,
}

impl BudgetSummary {
    pub fn compute(total: i64, items: &[ExpenseItem]) -> Self {
        let spent = total_spent(items);

        Self {
            total,
            spent,
            remaining: remaining(total, spent),
            usage_percent: (total > 0).then(|| percent_of_budget(spent, total)),
            categories: category_breakdown(total, items),
            users: user_breakdown(total, items),
            bar: usage_bar(total, items),
        }
    }
}

/// Sums saturate rather than overflow.
pub fn total_spent(items: &[ExpenseItem]) -> i64 {
    items
        .iter()
        .fold(0, |spent: i64, item| spent.saturating_add(item.amount))
}

pub fn remaining(total: i64, spent: i64) -> i64 {
    total.saturating_sub(spent)
}

/// Express an amount as a percentage of the budget total.
///
/// Returns 0 for budgets without a positive total rather than dividing by
/// zero.
pub fn percent_of_budget(amount: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }

    amount as f64 / total as f64 * 100.0
}

/// Spending per category, ordered by category ID.
pub fn category_breakdown(total: i64, items: &[ExpenseItem]) -> Vec<Share<i64>> {
    let mut amounts = BTreeMap::new();
    for item in items {
        let amount: &mut i64 = amounts.entry(item.category_id).or_insert(0);
        *amount = amount.saturating_add(item.amount);
    }

    into_shares(total, amounts)
}

/// Spending per user, ordered by username.
pub fn user_breakdown(total: i64, items: &[ExpenseItem]) -> Vec<Share<String>> {
    let mut amounts = BTreeMap::new();
    for item in items {
        let username = item.username.as_deref().unwrap_or(UNKNOWN_USER);
        let amount: &mut i64 = amounts.entry(username.to_owned()).or_insert(0);
        *amount = amount.saturating_add(item.amount);
    }

    into_shares(total, amounts)
}

fn into_shares<K: Ord>(total: i64, amounts: BTreeMap<K, i64>) -> Vec<Share<K>> {
    amounts
        .into_iter()
        .map(|(key, amount)| Share {
            key,
            amount,
            percent_of_budget: percent_of_budget(amount, total),
        })
        .collect()
}

/// Bucket items by the UTC date they were logged on.
///
/// Buckets keep the order in which their first item appears, so a newest
/// first item list produces newest first days.
pub fn group_by_day(items: &[ExpenseItem]) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();

    for item in items {
        let date = item.created_at.date_naive();

        match groups.iter_mut().find(|group| group.date == date) {
            Some(group) => {
                group.total = group.total.saturating_add(item.amount);
                group.items.push(item.clone());
            }
            None => groups.push(DayGroup {
                date,
                total: item.amount,
                items: vec![item.clone()],
            }),
        }
    }

    groups
}

/// Build the segments of the budget usage bar.
///
/// While the budget isn't overspent, each category gets its share of the
/// total and a remaining segment fills the rest. Once spending exceeds the
/// total, categories are scaled against the amount spent instead.
pub fn usage_bar(total: i64, items: &[ExpenseItem]) -> Vec<BarSegment> {
    if total <= 0 {
        return vec![BarSegment {
            kind: SegmentKind::Placeholder,
            flex: 100.0,
        }];
    }

    let spent = total_spent(items);
    let scale = if spent > total { spent } else { total };

    let mut segments: Vec<BarSegment> = category_breakdown(total, items)
        .into_iter()
        .filter(|share| share.amount > 0)
        .map(|share| BarSegment {
            kind: SegmentKind::Category(share.key),
            flex: share.amount as f64 / scale as f64 * 100.0,
        })
        .collect();

    if spent <= total {
        segments.push(BarSegment {
            kind: SegmentKind::Remaining,
            flex: remaining(total, spent) as f64 / total as f64 * 100.0,
        });
    }

    segments
}
