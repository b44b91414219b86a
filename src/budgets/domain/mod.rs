pub mod budgets;
pub mod categories;
pub mod items;
pub mod money;
pub mod room_codes;
pub mod summary;
