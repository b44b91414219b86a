mod budgets;
mod categories;
mod email;
mod items;
#[cfg(test)]
pub mod memory;
mod users;

pub use budgets::{BudgetPersistenceError, BudgetRepo, DynBudgetRepo};
pub use categories::{CategoryRepo, DynCategoryRepo};
pub use email::{DynEmailRepo, EmailRepo};
pub use items::{DynExpenseItemRepo, ExpenseItemRepo};
pub use users::{DynUserRepo, UserPersistenceError, UserRepo};
