//! In-process store with the same semantics as the Postgres schema
//! (unique emails and employee codes, cascading project documents).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{EmployeeStore, ProjectStore, SessionStore, StoreError, StoreResult, UserStore};
use crate::models::employee::{Employee, EmployeeChanges, EmployeeDetail, EmployeeDraft};
use crate::models::project::{
    NewDocument, NewProject, Project, ProjectChanges, ProjectDetail, ProjectDocument,
};
use crate::models::session::Session;
use crate::models::user::{NewUser, PublicUser, User, UserChanges};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    sessions: BTreeMap<String, Session>,
    employees: BTreeMap<i64, Employee>,
    projects: BTreeMap<i64, Project>,
    documents: BTreeMap<i64, ProjectDocument>,
    next_user_id: i64,
    next_employee_id: i64,
    next_project_id: i64,
    next_document_id: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn creator(&self, id: Option<i64>) -> Option<PublicUser> {
        id.and_then(|id| self.users.get(&id)).map(PublicUser::from)
    }

    fn employee_detail(&self, employee: &Employee) -> EmployeeDetail {
        EmployeeDetail {
            employee: employee.clone(),
            creator: self.creator(employee.created_by),
        }
    }

    fn project_detail(&self, project: &Project) -> ProjectDetail {
        ProjectDetail {
            project: project.clone(),
            creator: self.creator(project.created_by),
            documents: self
                .documents
                .values()
                .filter(|d| d.project_id == project.id)
                .cloned()
                .collect(),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn user_email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool> {
        Ok(self
            .lock()
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != except))
    }

    async fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        let mut tables = self.lock();
        if tables.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::Conflict("email"));
        }
        let now = Utc::now();
        let created = User {
            id: next(&mut tables.next_user_id),
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password_hash.clone(),
            role: user.role,
            avatar: user.avatar.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: i64, changes: &UserChanges) -> StoreResult<Option<User>> {
        let mut tables = self.lock();
        if let Some(email) = &changes.email {
            if tables.users.values().any(|u| u.id != id && u.email.eq_ignore_ascii_case(email)) {
                return Err(StoreError::Conflict("email"));
            }
        }
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(password) = &changes.password_hash {
            user.password = password.clone();
        }
        if let Some(avatar) = &changes.avatar {
            user.avatar = Some(avatar.clone());
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        self.lock().sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        Ok(self.lock().sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> StoreResult<bool> {
        Ok(self.lock().sessions.remove(token).is_some())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.lock();
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| !session.is_expired(now));
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn last_employee_code(&self) -> StoreResult<Option<String>> {
        Ok(self
            .lock()
            .employees
            .values()
            .next_back()
            .map(|e| e.employee_id.clone()))
    }

    async fn list_employees(&self) -> StoreResult<Vec<EmployeeDetail>> {
        let tables = self.lock();
        let mut employees: Vec<&Employee> = tables.employees.values().collect();
        employees.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(employees.into_iter().map(|e| tables.employee_detail(e)).collect())
    }

    async fn find_employee(&self, id: i64) -> StoreResult<Option<EmployeeDetail>> {
        let tables = self.lock();
        Ok(tables.employees.get(&id).map(|e| tables.employee_detail(e)))
    }

    async fn employee_email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool> {
        Ok(self
            .lock()
            .employees
            .values()
            .any(|e| e.email.eq_ignore_ascii_case(email) && Some(e.id) != except))
    }

    async fn insert_employee(&self, code: &str, draft: &EmployeeDraft) -> StoreResult<i64> {
        let mut tables = self.lock();
        if tables.employees.values().any(|e| e.employee_id == code) {
            return Err(StoreError::Conflict("employee_id"));
        }
        if tables.employees.values().any(|e| e.email.eq_ignore_ascii_case(&draft.email)) {
            return Err(StoreError::Conflict("email"));
        }
        let now = Utc::now();
        let id = next(&mut tables.next_employee_id);
        let employee = Employee {
            id,
            employee_id: code.to_string(),
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            date_of_birth: draft.date_of_birth,
            gender: draft.gender.clone(),
            email: draft.email.clone(),
            password: draft.password_hash.clone(),
            address: draft.address.clone(),
            branch_id: draft.branch_id.clone(),
            department: draft.department.clone(),
            designation: draft.designation.clone(),
            date_of_joining: draft.date_of_joining,
            account_holder_name: draft.account_holder_name.clone(),
            account_number: draft.account_number.clone(),
            bank_name: draft.bank_name.clone(),
            bank_identifier_code: draft.bank_identifier_code.clone(),
            branch_location: draft.branch_location.clone(),
            tax_payer_id: draft.tax_payer_id.clone(),
            document: draft.document.clone(),
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
        };
        tables.employees.insert(id, employee);
        Ok(id)
    }

    async fn update_employee(&self, id: i64, changes: &EmployeeChanges) -> StoreResult<bool> {
        let mut tables = self.lock();
        if let Some(email) = &changes.email {
            if tables.employees.values().any(|e| e.id != id && e.email.eq_ignore_ascii_case(email)) {
                return Err(StoreError::Conflict("email"));
            }
        }
        let Some(employee) = tables.employees.get_mut(&id) else {
            return Ok(false);
        };
        changes.apply(employee);
        employee.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_employee(&self, id: i64) -> StoreResult<bool> {
        Ok(self.lock().employees.remove(&id).is_some())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn list_projects(&self) -> StoreResult<Vec<ProjectDetail>> {
        let tables = self.lock();
        let mut projects: Vec<&Project> = tables.projects.values().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(projects.into_iter().map(|p| tables.project_detail(p)).collect())
    }

    async fn find_project(&self, id: i64) -> StoreResult<Option<ProjectDetail>> {
        let tables = self.lock();
        Ok(tables.projects.get(&id).map(|p| tables.project_detail(p)))
    }

    async fn insert_project(&self, project: &NewProject) -> StoreResult<i64> {
        let mut tables = self.lock();
        let now = Utc::now();
        let id = next(&mut tables.next_project_id);
        tables.projects.insert(
            id,
            Project {
                id,
                client_name: project.client_name.clone(),
                project_name: project.project_name.clone(),
                client_email: project.client_email.clone(),
                link: project.link.clone(),
                client_password: project.client_password_hash.clone(),
                created_by: project.created_by,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_project(&self, id: i64, changes: &ProjectChanges) -> StoreResult<bool> {
        let mut tables = self.lock();
        let Some(project) = tables.projects.get_mut(&id) else {
            return Ok(false);
        };
        changes.apply(project);
        project.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_project(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.lock();
        tables.documents.retain(|_, d| d.project_id != id);
        Ok(tables.projects.remove(&id).is_some())
    }

    async fn insert_document(&self, document: &NewDocument) -> StoreResult<ProjectDocument> {
        let mut tables = self.lock();
        if !tables.projects.contains_key(&document.project_id) {
            return Err(StoreError::Corrupt(format!(
                "project {} does not exist",
                document.project_id
            )));
        }
        let now = Utc::now();
        let inserted = ProjectDocument {
            id: next(&mut tables.next_document_id),
            project_id: document.project_id,
            file_name: document.file_name.clone(),
            file_path: document.file_path.clone(),
            file_type: Some(document.file_type.as_str().to_string()),
            mime_type: Some(document.mime_type.clone()),
            file_size: Some(document.file_size),
            created_at: now,
            updated_at: now,
        };
        tables.documents.insert(inserted.id, inserted.clone());
        Ok(inserted)
    }

    async fn find_document(&self, project_id: i64, document_id: i64) -> StoreResult<Option<ProjectDocument>> {
        Ok(self
            .lock()
            .documents
            .get(&document_id)
            .filter(|d| d.project_id == project_id)
            .cloned())
    }

    async fn delete_document(&self, document_id: i64) -> StoreResult<bool> {
        Ok(self.lock().documents.remove(&document_id).is_some())
    }
}
