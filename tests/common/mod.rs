#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::web;
use serde_json::{json, Value};
use tempfile::TempDir;

use staffdesk_backend::auth::session::{self, SESSION_COOKIE};
use staffdesk_backend::config::{AppConfig, StorageConfig};
use staffdesk_backend::db::{MemoryStore, UserStore};
use staffdesk_backend::models::user::{NewUser, Role, User};
use staffdesk_backend::state::AppState;
use staffdesk_backend::storage::{self, LocalDisk};
use staffdesk_backend::utils::password::hash_password;

pub const PASSWORD: &str = "s3cret-pass";

pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, 0x49, 0x48, 0x44, 0x52];
pub const PDF: &[u8] = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n1 0 obj\n<<>>\nendobj\n";

/// Application state over an in-memory store and a throwaway upload root.
pub struct TestEnv {
    pub state: web::Data<AppState>,
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("storage");
        let config = AppConfig {
            bind_addr: "127.0.0.1:0".into(),
            database_url: String::new(),
            debug: true,
            storage: StorageConfig::Local { root: root.clone() },
            session_lifetime_minutes: 120,
            secure_cookies: false,
        };
        let state = AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(LocalDisk::new(root)));
        TestEnv {
            state: web::Data::new(state),
            dir,
        }
    }

    pub fn storage_root(&self) -> PathBuf {
        self.dir.path().join("storage")
    }

    /// Local file behind a public upload URL.
    pub fn file_for(&self, url: &str) -> PathBuf {
        let path = storage::path_from_url(url).expect("storage url");
        self.storage_root().join(path)
    }

    pub async fn seed_user(&self, email: &str, role: Role) -> User {
        self.state
            .store
            .insert_user(&NewUser {
                name: format!("{role} user"),
                email: email.to_string(),
                password_hash: hash_password(PASSWORD).expect("hash"),
                role,
                avatar: None,
            })
            .await
            .expect("insert user")
    }

    /// Session cookie for `user`, issued without going through the login gate.
    pub async fn sign_in(&self, user: &User) -> Cookie<'static> {
        session::start(&self.state, user.id, None, false)
            .await
            .expect("start session")
    }
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.into_owned())
}

pub fn employee_payload(email: &str) -> Value {
    json!({
        "name": "Ada Lovelace",
        "phone": "+44 20 7946 0000",
        "date_of_birth": "1990-12-10",
        "gender": "Female",
        "email": email,
        "password": "employee-pass",
        "address": "12 St James's Square, London",
        "department": "Engineering",
        "designation": "Analyst",
        "date_of_joining": "2024-03-01",
        "bank_name": "Barings",
    })
}

/// Hand-built multipart/form-data body.
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        MultipartBody {
            boundary: "----staffdesk-test-boundary".into(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// `(content-type header, body)`
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (format!("multipart/form-data; boundary={}", self.boundary), self.body)
    }
}
