//! Student repository.

use std::sync::Arc;

use crate::entities::{Student, student};
use campus_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Student repository for database operations.
#[derive(Clone)]
pub struct StudentRepository {
    db: Arc<DatabaseConnection>,
}

impl StudentRepository {
    /// Create a new student repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a student by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<student::Model>> {
        Student::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a student by ID, failing if it does not resolve.
    pub async fn get_by_id(&self, id: &str) -> AppResult<student::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::StudentNotFound(id.to_string()))
    }

    /// Get a student by ID, failing if it does not resolve or the account
    /// is inactive/deleted. Relationship mutations go through this.
    pub async fn get_usable_by_id(&self, id: &str) -> AppResult<student::Model> {
        let student = self.get_by_id(id).await?;
        if !student.is_usable() {
            return Err(AppError::StudentInactive(id.to_string()));
        }
        Ok(student)
    }

    /// Find a student by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<student::Model>> {
        Student::find()
            .filter(student::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_student(id: &str, is_private: bool) -> student::Model {
        student::Model {
            id: id.to_string(),
            username: format!("user_{id}"),
            is_private,
            is_active: true,
            is_deleted: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_found() {
        let student = create_test_student("u1", false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[student.clone()]])
                .into_connection(),
        );

        let repo = StudentRepository::new(db);
        let found = repo.get_by_id("u1").await.unwrap();

        assert_eq!(found.id, "u1");
        assert!(!found.is_private);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<student::Model>::new()])
                .into_connection(),
        );

        let repo = StudentRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::StudentNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_username() {
        let student = create_test_student("u1", false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[student]])
                .into_connection(),
        );

        let repo = StudentRepository::new(db);
        let found = repo.find_by_username("user_u1").await.unwrap();

        assert_eq!(found.unwrap().id, "u1");
    }

    #[tokio::test]
    async fn test_get_usable_rejects_deleted() {
        let mut student = create_test_student("u1", false);
        student.is_deleted = true;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[student]])
                .into_connection(),
        );

        let repo = StudentRepository::new(db);
        let result = repo.get_usable_by_id("u1").await;

        assert!(matches!(result, Err(AppError::StudentInactive(_))));
    }
}
