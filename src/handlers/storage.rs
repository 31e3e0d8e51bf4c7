use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::{self, BlobError};

/// GET /storage/{path}: raw bytes of a stored upload.
pub async fn serve_file(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let missing = || AppError::not_found("File not found");
    let path = storage::normalize(&path.into_inner()).map_err(|_| missing())?;

    let bytes = match state.blobs.fetch(&path).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) | Err(BlobError::InvalidPath(_)) => return Err(missing()),
        Err(err) => return Err(state.internal("An error occurred while reading the file")(err)),
    };

    let content_type = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");
    Ok(HttpResponse::Ok().content_type(content_type).body(bytes))
}
