use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::employee::{EmployeeChanges, EmployeeDetail, EmployeeDraft};
use crate::models::project::{NewDocument, NewProject, ProjectChanges, ProjectDetail, ProjectDocument};
use crate::models::session::Session;
use crate::models::user::{NewUser, UnknownRole, User, UserChanges};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the column name.
    #[error("duplicate value for {0}")]
    Conflict(&'static str),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<UnknownRole> for StoreError {
    fn from(err: UnknownRole) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Whether another user (other than `except`) already owns `email`.
    async fn user_email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool>;
    async fn insert_user(&self, user: &NewUser) -> StoreResult<User>;
    async fn update_user(&self, id: i64, changes: &UserChanges) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &Session) -> StoreResult<()>;
    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>>;
    async fn delete_session(&self, token: &str) -> StoreResult<bool>;
    /// Removes every session expired at `now`; returns how many went.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Code of the employee with the highest primary key.
    async fn last_employee_code(&self) -> StoreResult<Option<String>>;
    /// Newest first, each with its creator.
    async fn list_employees(&self) -> StoreResult<Vec<EmployeeDetail>>;
    async fn find_employee(&self, id: i64) -> StoreResult<Option<EmployeeDetail>>;
    async fn employee_email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool>;
    /// Fails with `StoreError::Conflict("employee_id")` when `code` is taken.
    async fn insert_employee(&self, code: &str, draft: &EmployeeDraft) -> StoreResult<i64>;
    async fn update_employee(&self, id: i64, changes: &EmployeeChanges) -> StoreResult<bool>;
    async fn delete_employee(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Newest first, each with its creator and documents.
    async fn list_projects(&self) -> StoreResult<Vec<ProjectDetail>>;
    async fn find_project(&self, id: i64) -> StoreResult<Option<ProjectDetail>>;
    async fn insert_project(&self, project: &NewProject) -> StoreResult<i64>;
    async fn update_project(&self, id: i64, changes: &ProjectChanges) -> StoreResult<bool>;
    /// Removes the project row and every document row it owns.
    async fn delete_project(&self, id: i64) -> StoreResult<bool>;
    async fn insert_document(&self, document: &NewDocument) -> StoreResult<ProjectDocument>;
    async fn find_document(&self, project_id: i64, document_id: i64) -> StoreResult<Option<ProjectDocument>>;
    async fn delete_document(&self, document_id: i64) -> StoreResult<bool>;
}

pub trait Store: UserStore + SessionStore + EmployeeStore + ProjectStore {}

impl<T> Store for T where T: UserStore + SessionStore + EmployeeStore + ProjectStore {}

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
