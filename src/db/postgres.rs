use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use super::{EmployeeStore, ProjectStore, SessionStore, StoreError, StoreResult, UserStore};
use crate::models::employee::{Employee, EmployeeChanges, EmployeeDetail, EmployeeDraft};
use crate::models::project::{
    NewDocument, NewProject, Project, ProjectChanges, ProjectDetail, ProjectDocument,
};
use crate::models::session::Session;
use crate::models::user::{NewUser, PublicUser, User, UserChanges, UserRow};

const USER_COLUMNS: &str = "id, name, email, password, role, avatar, created_at, updated_at";

const EMPLOYEE_COLUMNS: &str = "id, employee_id, name, phone, date_of_birth, gender, email, password, \
     address, branch_id, department, designation, date_of_joining, account_holder_name, \
     account_number, bank_name, bank_identifier_code, branch_location, tax_payer_id, document, \
     created_by, created_at, updated_at";

const PROJECT_COLUMNS: &str =
    "id, client_name, project_name, client_email, link, client_password, created_by, created_at, updated_at";

const DOCUMENT_COLUMNS: &str =
    "id, project_id, file_name, file_path, file_type, mime_type, file_size, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    async fn public_users(&self, ids: &[i64]) -> StoreResult<HashMap<i64, PublicUser>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                let user = User::try_from(row)?;
                Ok((user.id, PublicUser::from(&user)))
            })
            .collect()
    }

    async fn documents_for(&self, project_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<ProjectDocument>>> {
        let mut grouped: HashMap<i64, Vec<ProjectDocument>> = HashMap::new();
        if project_ids.is_empty() {
            return Ok(grouped);
        }
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM project_documents WHERE project_id = ANY($1) ORDER BY id"
        );
        let documents = sqlx::query_as::<_, ProjectDocument>(&sql)
            .bind(project_ids)
            .fetch_all(&self.pool)
            .await?;
        for document in documents {
            grouped.entry(document.project_id).or_default().push(document);
        }
        Ok(grouped)
    }

    async fn employee_details(&self, employees: Vec<Employee>) -> StoreResult<Vec<EmployeeDetail>> {
        let creator_ids: Vec<i64> = employees.iter().filter_map(|e| e.created_by).collect();
        let creators = self.public_users(&creator_ids).await?;
        Ok(employees
            .into_iter()
            .map(|employee| EmployeeDetail {
                creator: employee.created_by.and_then(|id| creators.get(&id).cloned()),
                employee,
            })
            .collect())
    }

    async fn project_details(&self, projects: Vec<Project>) -> StoreResult<Vec<ProjectDetail>> {
        let ids: Vec<i64> = projects.iter().map(|p| p.id).collect();
        let creator_ids: Vec<i64> = projects.iter().filter_map(|p| p.created_by).collect();
        let creators = self.public_users(&creator_ids).await?;
        let mut documents = self.documents_for(&ids).await?;
        Ok(projects
            .into_iter()
            .map(|project| ProjectDetail {
                creator: project.created_by.and_then(|id| creators.get(&id).cloned()),
                documents: documents.remove(&project.id).unwrap_or_default(),
                project,
            })
            .collect())
    }
}

/// Translates unique-constraint violations into `StoreError::Conflict`.
fn map_unique(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        match db_err.constraint() {
            Some("employees_employee_id_key") => return StoreError::Conflict("employee_id"),
            Some("employees_email_key") | Some("users_email_key") => {
                return StoreError::Conflict("email")
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn user_email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password, role, avatar) VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.avatar.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique)?;
        Ok(User::try_from(row)?)
    }

    async fn update_user(&self, id: i64, changes: &UserChanges) -> StoreResult<Option<User>> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        {
            let mut separated = query.separated(", ");
            if let Some(name) = &changes.name {
                separated.push("name = ");
                separated.push_bind_unseparated(name);
            }
            if let Some(email) = &changes.email {
                separated.push("email = ");
                separated.push_bind_unseparated(email);
            }
            if let Some(password) = &changes.password_hash {
                separated.push("password = ");
                separated.push_bind_unseparated(password);
            }
            if let Some(avatar) = &changes.avatar {
                separated.push("avatar = ");
                separated.push_bind_unseparated(avatar);
            }
            separated.push("updated_at = NOW()");
        }
        query.push(" WHERE id = ");
        query.push_bind(id);
        query.push(format!(" RETURNING {USER_COLUMNS}"));

        let row = query
            .build_query_as::<UserRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique)?;
        Ok(row.map(User::try_from).transpose()?)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)")
            .bind(&session.token)
            .bind(session.user_id)
            .bind(session.created_at)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, token: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl EmployeeStore for PgStore {
    async fn last_employee_code(&self) -> StoreResult<Option<String>> {
        let code = sqlx::query_scalar::<_, String>("SELECT employee_id FROM employees ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(code)
    }

    async fn list_employees(&self) -> StoreResult<Vec<EmployeeDetail>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY created_at DESC, id DESC");
        let employees = sqlx::query_as::<_, Employee>(&sql)
            .fetch_all(&self.pool)
            .await?;
        self.employee_details(employees).await
    }

    async fn find_employee(&self, id: i64) -> StoreResult<Option<EmployeeDetail>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1");
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match employee {
            Some(employee) => Ok(self.employee_details(vec![employee]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn employee_email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE LOWER(email) = LOWER($1) AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn insert_employee(&self, code: &str, draft: &EmployeeDraft) -> StoreResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO employees (
                employee_id, name, phone, date_of_birth, gender, email, password, address,
                branch_id, department, designation, date_of_joining,
                account_holder_name, account_number, bank_name, bank_identifier_code,
                branch_location, tax_payer_id, document, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING id
            "#,
        )
        .bind(code)
        .bind(&draft.name)
        .bind(&draft.phone)
        .bind(draft.date_of_birth)
        .bind(&draft.gender)
        .bind(&draft.email)
        .bind(&draft.password_hash)
        .bind(&draft.address)
        .bind(draft.branch_id.as_deref())
        .bind(draft.department.as_deref())
        .bind(draft.designation.as_deref())
        .bind(draft.date_of_joining)
        .bind(draft.account_holder_name.as_deref())
        .bind(draft.account_number.as_deref())
        .bind(draft.bank_name.as_deref())
        .bind(draft.bank_identifier_code.as_deref())
        .bind(draft.branch_location.as_deref())
        .bind(draft.tax_payer_id.as_deref())
        .bind(draft.document.as_deref())
        .bind(draft.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(id)
    }

    async fn update_employee(&self, id: i64, changes: &EmployeeChanges) -> StoreResult<bool> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE employees SET ");
        {
            let mut separated = query.separated(", ");
            if let Some(v) = &changes.name {
                separated.push("name = ");
                separated.push_bind_unseparated(v);
            }
            if let Some(v) = &changes.phone {
                separated.push("phone = ");
                separated.push_bind_unseparated(v);
            }
            if let Some(v) = changes.date_of_birth {
                separated.push("date_of_birth = ");
                separated.push_bind_unseparated(v);
            }
            if let Some(v) = &changes.gender {
                separated.push("gender = ");
                separated.push_bind_unseparated(v);
            }
            if let Some(v) = &changes.email {
                separated.push("email = ");
                separated.push_bind_unseparated(v);
            }
            if let Some(v) = &changes.password_hash {
                separated.push("password = ");
                separated.push_bind_unseparated(v);
            }
            if let Some(v) = &changes.address {
                separated.push("address = ");
                separated.push_bind_unseparated(v);
            }
            let nullable = [
                ("branch_id", &changes.branch_id),
                ("department", &changes.department),
                ("designation", &changes.designation),
                ("account_holder_name", &changes.account_holder_name),
                ("account_number", &changes.account_number),
                ("bank_name", &changes.bank_name),
                ("bank_identifier_code", &changes.bank_identifier_code),
                ("branch_location", &changes.branch_location),
                ("tax_payer_id", &changes.tax_payer_id),
            ];
            for (column, value) in nullable {
                if let Some(value) = value {
                    separated.push(format!("{column} = "));
                    separated.push_bind_unseparated(value.as_deref());
                }
            }
            if let Some(v) = changes.date_of_joining {
                separated.push("date_of_joining = ");
                separated.push_bind_unseparated(v);
            }
            if let Some(v) = &changes.document {
                separated.push("document = ");
                separated.push_bind_unseparated(v);
            }
            separated.push("updated_at = NOW()");
        }
        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(&self.pool).await.map_err(map_unique)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_employee(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn list_projects(&self) -> StoreResult<Vec<ProjectDetail>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id DESC");
        let projects = sqlx::query_as::<_, Project>(&sql)
            .fetch_all(&self.pool)
            .await?;
        self.project_details(projects).await
    }

    async fn find_project(&self, id: i64) -> StoreResult<Option<ProjectDetail>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match project {
            Some(project) => Ok(self.project_details(vec![project]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert_project(&self, project: &NewProject) -> StoreResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO projects (client_name, project_name, client_email, link, client_password, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&project.client_name)
        .bind(&project.project_name)
        .bind(&project.client_email)
        .bind(project.link.as_deref())
        .bind(&project.client_password_hash)
        .bind(project.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_project(&self, id: i64, changes: &ProjectChanges) -> StoreResult<bool> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE projects SET ");
        {
            let mut separated = query.separated(", ");
            if let Some(v) = &changes.client_name {
                separated.push("client_name = ");
                separated.push_bind_unseparated(v);
            }
            if let Some(v) = &changes.project_name {
                separated.push("project_name = ");
                separated.push_bind_unseparated(v);
            }
            if let Some(v) = &changes.client_email {
                separated.push("client_email = ");
                separated.push_bind_unseparated(v);
            }
            if let Some(v) = &changes.link {
                separated.push("link = ");
                separated.push_bind_unseparated(v.as_deref());
            }
            if let Some(v) = &changes.client_password_hash {
                separated.push("client_password = ");
                separated.push_bind_unseparated(v);
            }
            separated.push("updated_at = NOW()");
        }
        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_project(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM project_documents WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_document(&self, document: &NewDocument) -> StoreResult<ProjectDocument> {
        let sql = format!(
            "INSERT INTO project_documents (project_id, file_name, file_path, file_type, mime_type, file_size) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {DOCUMENT_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, ProjectDocument>(&sql)
            .bind(document.project_id)
            .bind(&document.file_name)
            .bind(&document.file_path)
            .bind(document.file_type.as_str())
            .bind(&document.mime_type)
            .bind(document.file_size)
            .fetch_one(&self.pool)
            .await?;
        Ok(inserted)
    }

    async fn find_document(&self, project_id: i64, document_id: i64) -> StoreResult<Option<ProjectDocument>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM project_documents WHERE id = $1 AND project_id = $2");
        let document = sqlx::query_as::<_, ProjectDocument>(&sql)
            .bind(document_id)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(document)
    }

    async fn delete_document(&self, document_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM project_documents WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
