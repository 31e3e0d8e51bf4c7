use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::user::PublicUser;

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub client_name: String,
    pub project_name: String,
    pub client_email: String,
    pub link: Option<String>,
    #[serde(skip_serializing)]
    pub client_password: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProjectDocument {
    pub id: i64,
    pub project_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_type: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub creator: Option<PublicUser>,
    pub documents: Vec<ProjectDocument>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub client_name: String,
    pub project_name: String,
    pub client_email: String,
    pub link: Option<String>,
    pub client_password_hash: String,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub client_name: Option<String>,
    pub project_name: Option<String>,
    pub client_email: Option<String>,
    pub link: Option<Option<String>>,
    pub client_password_hash: Option<String>,
}

impl ProjectChanges {
    pub fn apply(&self, project: &mut Project) {
        if let Some(v) = &self.client_name {
            project.client_name = v.clone();
        }
        if let Some(v) = &self.project_name {
            project.project_name = v.clone();
        }
        if let Some(v) = &self.client_email {
            project.client_email = v.clone();
        }
        if let Some(v) = &self.link {
            project.link = v.clone();
        }
        if let Some(v) = &self.client_password_hash {
            project.client_password = v.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub project_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_type: FileType,
    pub mime_type: String,
    pub file_size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Image,
    Video,
    Pdf,
    Zip,
    Doc,
    Other,
}

impl FileType {
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            m if m.starts_with("image/") => FileType::Image,
            m if m.starts_with("video/") => FileType::Video,
            "application/pdf" => FileType::Pdf,
            "application/zip" | "application/x-rar-compressed" | "application/x-zip-compressed"
            | "application/vnd.rar" => FileType::Zip,
            "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => FileType::Doc,
            _ => FileType::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Pdf => "pdf",
            FileType::Zip => "zip",
            FileType::Doc => "doc",
            FileType::Other => "other",
        }
    }
}
