use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::ConfigLoader;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use aws_types::region::Region;

use super::{normalize, BlobError, BlobStore};

pub async fn create_s3_client() -> S3Client {
    let aws_config = ConfigLoader::default()
        .region(std::env::var("AWS_REGION").ok().map(Region::new))
        .behavior_version(BehaviorVersion::latest())
        .load()
        .await;

    S3Client::new(&aws_config)
}

/// Blob store backed by a single S3 bucket; storage paths are object keys.
#[derive(Clone)]
pub struct S3Bucket {
    client: S3Client,
    bucket: String,
}

impl S3Bucket {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        S3Bucket {
            client,
            bucket: bucket.into(),
        }
    }
}

fn backend<E: std::fmt::Display>(err: E) -> BlobError {
    BlobError::Backend(err.to_string())
}

#[async_trait]
impl BlobStore for S3Bucket {
    async fn store(&self, bytes: &[u8], path: &str) -> Result<String, BlobError> {
        let key = normalize(path)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(backend)?;
        Ok(key)
    }

    async fn delete(&self, path: &str) -> Result<bool, BlobError> {
        if !self.exists(path).await? {
            return Ok(false);
        }
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(normalize(path)?)
            .send()
            .await
            .map_err(backend)?;
        Ok(true)
    }

    async fn exists(&self, path: &str) -> Result<bool, BlobError> {
        let key = normalize(path)?;
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = err.into_service_error();
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(backend(err))
                }
            }
        }
    }

    async fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let key = normalize(path)?;
        let output = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_no_such_key() {
                    return Ok(None);
                }
                return Err(backend(err));
            }
        };
        let data = output.body.collect().await.map_err(backend)?;
        Ok(Some(data.into_bytes().to_vec()))
    }
}
