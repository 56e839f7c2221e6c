use crate::models::Category;
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct CategoryRecord {
    id: String,
    display_name: String,
    color_token: String,
}

impl From<CategoryRecord> for Category {
    fn from(record: CategoryRecord) -> Self {
        Category {
            id: record.id,
            display_name: record.display_name,
            color_token: record.color_token,
        }
    }
}

pub(crate) struct CategoryRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> CategoryRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn list(&mut self) -> Result<Vec<Category>, RepositoryError> {
        let records = sqlx::query_as::<_, CategoryRecord>(
            "SELECT id, display_name, color_token FROM categories ORDER BY id",
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    pub async fn find_by_id(&mut self, id: &str) -> Result<Option<Category>, RepositoryError> {
        let record = sqlx::query_as::<_, CategoryRecord>(
            "SELECT id, display_name, color_token FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(record.map(|r| r.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::get_test_db;

    #[tokio::test]
    async fn test_read_seeded_categories() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = CategoryRepository::new(uow.connection());

        let categories = repo.list().await.unwrap();
        let ids: Vec<&str> = categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["dining", "entertainment", "groceries", "shopping", "transportation", "utilities"]);
    }

    #[tokio::test]
    async fn test_find_category() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = CategoryRepository::new(uow.connection());

        let cat = repo.find_by_id("groceries").await.unwrap().unwrap();
        assert_eq!(cat.display_name, "Groceries");
        assert_eq!(cat.color_token, "#FF6B6B");

        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }
}
