//! Request bodies for endpoints that accept either JSON or multipart forms.

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::path::Path;

use crate::errors::AppError;
use crate::utils::validation::Report;

/// Largest single part we buffer; anything bigger fails every upload rule.
pub const MAX_PART_BYTES: usize = 50 * 1024 * 1024;

/// Ceiling for JSON and urlencoded bodies.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Extension sniffed from content, falling back to the client file name.
    pub fn extension(&self) -> Option<String> {
        infer::get(&self.bytes)
            .map(|kind| kind.extension().to_string())
            .or_else(|| {
                Path::new(&self.file_name)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_ascii_lowercase)
            })
    }

    /// Extension of the type recognised from the content alone.
    pub fn detected_extension(&self) -> Option<&'static str> {
        infer::get(&self.bytes).map(|kind| kind.extension())
    }

    pub fn mime_type(&self) -> String {
        infer::get(&self.bytes)
            .map(|kind| kind.mime_type().to_string())
            .or_else(|| self.content_type.clone())
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Client file name reduced to a safe storage path segment.
    pub fn safe_file_name(&self) -> String {
        let base = Path::new(&self.file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("file");
        let cleaned: String = base
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let cleaned = cleaned.trim_start_matches('.');
        if cleaned.is_empty() {
            "file".to_string()
        } else {
            cleaned.to_string()
        }
    }
}

/// Accepted extensions and size ceiling for one upload field.
#[derive(Debug, Clone, Copy)]
pub struct UploadRule {
    pub extensions: &'static [&'static str],
    pub max_kib: usize,
}

pub const AVATAR_RULE: UploadRule = UploadRule {
    extensions: &["jpeg", "png", "jpg", "gif"],
    max_kib: 10 * 1024,
};

pub const EMPLOYEE_DOCUMENT_RULE: UploadRule = UploadRule {
    extensions: &["pdf", "doc", "docx", "jpg", "jpeg", "png"],
    max_kib: 10 * 1024,
};

pub const PROJECT_DOCUMENT_RULE: UploadRule = UploadRule {
    extensions: &[
        "pdf", "jpg", "jpeg", "png", "gif", "mp4", "avi", "mov", "zip", "rar", "doc", "docx", "xls", "xlsx",
    ],
    max_kib: 50 * 1024,
};

impl UploadRule {
    pub fn check(&self, field: &str, file: &UploadedFile, report: &mut Report) {
        let label = field.replace('_', " ");
        // The client's file name never vouches for the content.
        let allowed = file
            .detected_extension()
            .map_or(false, |ext| self.extensions.contains(&ext));
        if !allowed {
            report.push(
                field,
                format!("The {label} field must be a file of type: {}.", self.extensions.join(", ")),
            );
        }
        if file.size() > self.max_kib * 1024 {
            report.push(
                field,
                format!("The {label} field must not be greater than {} kilobytes.", self.max_kib),
            );
        }
    }
}

#[derive(Debug, Default)]
pub struct FormData {
    pub fields: Map<String, Value>,
    pub files: Vec<UploadedFile>,
}

impl FormData {
    /// Deserializes the text fields into `T`; type mismatches become 422s.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|err| {
            log::debug!("rejected form body: {}", err);
            AppError::field("body", "The given data was invalid.")
        })
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == name)
    }

    pub fn files<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UploadedFile> + 'a {
        self.files.iter().filter(move |f| f.field == name)
    }
}

/// Distinguishes an absent field (`None`) from an explicit null (`Some(None)`).
pub fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Checkbox-style flag: accepts JSON booleans as well as "1", "true", "on".
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().map_or(false, |n| n != 0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes"),
        _ => false,
    })
}

/// `documents[]` and `documents[0]` both collect under `documents`.
fn field_name(raw: &str) -> String {
    raw.split('[').next().unwrap_or_default().to_string()
}

fn malformed<E: std::fmt::Display>(err: E) -> AppError {
    log::debug!("malformed request body: {}", err);
    AppError::field("body", "The request body could not be read.")
}

async fn read_multipart(mut multipart: Multipart) -> Result<FormData, AppError> {
    let mut form = FormData::default();
    while let Some(item) = multipart.next().await {
        let mut field = item.map_err(malformed)?;
        let (name, file_name) = {
            let disposition = field.content_disposition();
            (
                disposition.get_name().unwrap_or_default().to_string(),
                disposition.get_filename().map(str::to_string),
            )
        };
        let name = field_name(&name);
        let content_type = field
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(malformed)?;
            if bytes.len() + chunk.len() > MAX_PART_BYTES {
                return Err(AppError::field(
                    &name,
                    format!("The {} field must not be greater than {} kilobytes.", name, MAX_PART_BYTES / 1024),
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        match file_name {
            // Browsers send an empty part for an untouched file input.
            Some(file_name) if file_name.is_empty() && bytes.is_empty() => {}
            Some(file_name) => form.files.push(UploadedFile {
                field: name,
                file_name,
                content_type,
                bytes,
            }),
            None => {
                let text = String::from_utf8(bytes).map_err(malformed)?;
                form.fields.insert(name, Value::String(text));
            }
        }
    }
    Ok(form)
}

impl FormData {
    /// Reads the request body as multipart, JSON or urlencoded fields.
    /// Called only once the caller is authorized.
    pub async fn read(req: &HttpRequest, payload: web::Payload) -> Result<FormData, AppError> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            read_multipart(Multipart::new(req.headers(), payload)).await
        } else if content_type.starts_with("application/json") {
            let body = read_body(payload).await?;
            let fields: Map<String, Value> = serde_json::from_slice(&body).map_err(malformed)?;
            Ok(FormData {
                fields,
                files: Vec::new(),
            })
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let body = read_body(payload).await?;
            Ok(FormData {
                fields: url::form_urlencoded::parse(&body)
                    .map(|(k, v)| (field_name(&k), Value::String(v.into_owned())))
                    .collect(),
                files: Vec::new(),
            })
        } else {
            // No body at all: a PUT that changes nothing.
            Ok(FormData::default())
        }
    }
}

async fn read_body(mut payload: web::Payload) -> Result<web::BytesMut, AppError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(malformed)?;
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(AppError::field("body", "The request body is too large."));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
