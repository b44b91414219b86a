use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    budgets::{domain::categories::Category, models::CategoryModel},
    database::PostgresConnection,
};

pub type DynCategoryRepo = Arc<dyn CategoryRepo + Send + Sync>;

#[async_trait]
pub trait CategoryRepo {
    async fn get_category(&self, category_id: i64) -> anyhow::Result<Option<Category>>;

    async fn list_categories(&self) -> anyhow::Result<Vec<Category>>;
}

#[async_trait]
impl CategoryRepo for PostgresConnection {
    async fn get_category(&self, category_id: i64) -> anyhow::Result<Option<Category>> {
        let model = sqlx::query_as::<_, CategoryModel>("SELECT * FROM category WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&**self)
            .await?;

        Ok(model.map(Category::from))
    }

    async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        let models = sqlx::query_as::<_, CategoryModel>("SELECT * FROM category ORDER BY id")
            .fetch_all(&**self)
            .await?;

        Ok(models.into_iter().map(Category::from).collect())
    }
}
