use crate::goal_repository::GoalRepository;
use crate::models::{BudgetGoal, Category};
use crate::repository::CategoryRepository;
use database::{RepositoryError, Database};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Category not found")]
    NotFound,
}

impl From<RepositoryError> for CategoryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => CategoryError::NotFound,
            RepositoryError::Infrastructure(e) => CategoryError::Infrastructure(e.to_string()),
            _ => CategoryError::Infrastructure(err.to_string()),
        }
    }
}

pub struct CategoryService;

impl CategoryService {
    #[instrument(skip(db))]
    pub async fn list_categories(db: &Database) -> Result<Vec<Category>, CategoryError> {
        let mut uow = db.begin().await?;
        let mut repo = CategoryRepository::new(uow.connection());

        let categories = repo.list().await?;

        Ok(categories)
    }

    #[instrument(skip(db))]
    pub async fn get_category(db: &Database, id: &str) -> Result<Category, CategoryError> {
        let mut uow = db.begin().await?;
        let mut repo = CategoryRepository::new(uow.connection());

        let category = repo.find_by_id(id).await?
            .ok_or(CategoryError::NotFound)?;

        Ok(category)
    }

    #[instrument(skip(db))]
    pub async fn list_goals(db: &Database, customer_id: &str) -> Result<Vec<BudgetGoal>, CategoryError> {
        if customer_id.trim().is_empty() {
            return Err(CategoryError::InvalidInput("Customer id cannot be empty".into()));
        }

        let mut uow = db.begin().await?;
        let mut repo = GoalRepository::new(uow.connection());

        let goals = repo.list_for_customer(customer_id.trim()).await.map_err(|e| {
            tracing::error!("Failed to list goals: {}", e);
            CategoryError::from(e)
        })?;

        Ok(goals)
    }
}
