//! Credential store for student records.
//!
//! `CredentialStore` is the seam the login and admin handlers depend on;
//! `PgCredentialStore` is the PostgreSQL implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::models::student::Student;
use crate::types::StudentId;

const TABLE_NAME: &str = "students";
const SELECT_COLUMNS: &str = "id, display_name, pin_hash, created_at, pin_updated_at";
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("student not found")]
    NotFound,
    #[error("display name already taken")]
    Conflict,
    #[error("credential store unavailable: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of a display-name lookup.
#[derive(Debug, Clone)]
pub struct StudentMatch {
    /// First record by creation order.
    pub student: Student,
    /// `true` when more than one row carries the same display name.
    pub duplicate_detected: bool,
}

/// Repository trait for student credentials.
///
/// Use `MockCredentialStore` in unit tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact, case-sensitive match on the display name.
    async fn find_by_display_name(&self, display_name: &str) -> Result<StudentMatch, StoreError>;

    async fn find_by_id(&self, id: StudentId) -> Result<Student, StoreError>;

    /// Replaces the stored PIN digest and bumps `pin_updated_at`.
    async fn update_hash(&self, id: StudentId, new_hash: &str) -> Result<(), StoreError>;

    async fn create(&self, student: &Student) -> Result<Student, StoreError>;

    /// All students ordered by display name.
    async fn list(&self) -> Result<Vec<Student>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn base_select_query() -> String {
        format!("SELECT {} FROM {}", SELECT_COLUMNS, TABLE_NAME)
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_display_name(&self, display_name: &str) -> Result<StudentMatch, StoreError> {
        // Two rows are enough to detect a uniqueness breach.
        let query = format!(
            "{} WHERE display_name = $1 ORDER BY created_at ASC, id ASC LIMIT 2",
            Self::base_select_query()
        );
        let rows = sqlx::query_as::<_, Student>(&query)
            .bind(display_name)
            .fetch_all(&self.pool)
            .await?;
        first_match(rows)
    }

    async fn find_by_id(&self, id: StudentId) -> Result<Student, StoreError> {
        let query = format!("{} WHERE id = $1", Self::base_select_query());
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn update_hash(&self, id: StudentId, new_hash: &str) -> Result<(), StoreError> {
        let query = format!(
            "UPDATE {} SET pin_hash = $1, pin_updated_at = $2 WHERE id = $3",
            TABLE_NAME
        );
        let result = sqlx::query(&query)
            .bind(new_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create(&self, student: &Student) -> Result<Student, StoreError> {
        let query = format!(
            "INSERT INTO {} (id, display_name, pin_hash, created_at, pin_updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            TABLE_NAME, SELECT_COLUMNS
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(student.id)
            .bind(&student.display_name)
            .bind(&student.pin_hash)
            .bind(student.created_at)
            .bind(student.pin_updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)
    }

    async fn list(&self) -> Result<Vec<Student>, StoreError> {
        let query = format!("{} ORDER BY display_name ASC", Self::base_select_query());
        let rows = sqlx::query_as::<_, Student>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

/// Picks the first row of a display-name lookup, flagging duplicates.
pub fn first_match(rows: Vec<Student>) -> Result<StudentMatch, StoreError> {
    let duplicate_detected = rows.len() > 1;
    let student = rows.into_iter().next().ok_or(StoreError::NotFound)?;
    Ok(StudentMatch {
        student,
        duplicate_detected,
    })
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Conflict
        }
        _ => StoreError::Database(err),
    }
}
