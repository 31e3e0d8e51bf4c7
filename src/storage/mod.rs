use async_trait::async_trait;
use thiserror::Error;

pub mod local;
pub mod s3;

pub use local::LocalDisk;
pub use s3::S3Bucket;

/// Prefix under which stored objects are served back over HTTP.
pub const PUBLIC_PREFIX: &str = "/storage/";

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("invalid storage path: {0}")]
    InvalidPath(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` at `path`, returning the normalized path.
    async fn store(&self, bytes: &[u8], path: &str) -> Result<String, BlobError>;
    async fn delete(&self, path: &str) -> Result<bool, BlobError>;
    async fn exists(&self, path: &str) -> Result<bool, BlobError>;
    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, BlobError>;
}

/// Rejects absolute paths, empty segments and any `..`/`.` component.
pub fn normalize(path: &str) -> Result<String, BlobError> {
    let invalid = || BlobError::InvalidPath(path.to_string());
    if path.is_empty() || path.starts_with('/') || path.contains('\\') {
        return Err(invalid());
    }
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid());
        }
    }
    Ok(path.to_string())
}

/// `http://host` + `avatars/x.png` -> `http://host/storage/avatars/x.png`
pub fn public_url(base_url: &str, path: &str) -> String {
    format!("{}{}{}", base_url.trim_end_matches('/'), PUBLIC_PREFIX, path)
}

/// Recovers the storage path from a URL produced by [`public_url`],
/// whatever host it was issued under.
pub fn path_from_url(file_url: &str) -> Option<String> {
    let url_path = match url::Url::parse(file_url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => file_url.to_string(),
    };
    url_path
        .strip_prefix(PUBLIC_PREFIX)
        .map(str::to_string)
        .filter(|p| normalize(p).is_ok())
}
