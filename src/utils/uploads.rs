use actix_web::HttpRequest;
use chrono::Utc;
use uuid::Uuid;

use crate::storage::{self, BlobError, BlobStore};
use crate::utils::form::UploadedFile;

pub const AVATAR_DIR: &str = "avatars";
pub const EMPLOYEE_DOCUMENT_DIR: &str = "employee_documents";
pub const PROJECT_DOCUMENT_DIR: &str = "project_documents";

/// Scheme and host the request arrived on, e.g. `http://localhost:8080`.
pub fn base_url(req: &HttpRequest) -> String {
    let info = req.connection_info();
    format!("{}://{}", info.scheme(), info.host())
}

/// `{unix_ts}_{uuid}.{ext}`
pub fn generated_name(file: &UploadedFile) -> String {
    let ext = file.extension().unwrap_or_else(|| "bin".to_string());
    format!("{}_{}.{}", Utc::now().timestamp(), Uuid::new_v4().simple(), ext)
}

/// `{unix_ts}_{uuid}_{client name}`
pub fn name_keeping_original(file: &UploadedFile) -> String {
    format!(
        "{}_{}_{}",
        Utc::now().timestamp(),
        Uuid::new_v4().simple(),
        file.safe_file_name()
    )
}

/// Stores the upload under `dir/name` and returns its public URL.
pub async fn save(
    blobs: &dyn BlobStore,
    base_url: &str,
    dir: &str,
    name: String,
    file: &UploadedFile,
) -> Result<String, BlobError> {
    let path = blobs.store(&file.bytes, &format!("{dir}/{name}")).await?;
    Ok(storage::public_url(base_url, &path))
}

/// Removes the object behind a public URL. Unknown or foreign URLs are ignored.
pub async fn discard(blobs: &dyn BlobStore, file_url: &str) -> Result<bool, BlobError> {
    let Some(path) = storage::path_from_url(file_url) else {
        log::warn!("not removing {}: not a storage url", file_url);
        return Ok(false);
    };
    if blobs.exists(&path).await? {
        blobs.delete(&path).await
    } else {
        Ok(false)
    }
}
