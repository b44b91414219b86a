use uuid::Uuid;

/// A spending category. Categories are shared by every budget.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Name of the icon clients should show for the category.
    pub icon: Option<String>,
}

/// A user connected to a budget.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Member {
    pub user_id: Uuid,
    pub username: String,
}
