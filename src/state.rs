use std::fmt::Display;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Store;
use crate::errors::AppError;
use crate::storage::BlobStore;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>) -> Self {
        AppState { config, store, blobs }
    }

    /// Error mapper for `map_err`: logs the cause and builds a 500 whose
    /// detail is only exposed in debug mode.
    pub fn internal<E: Display>(&self, message: &'static str) -> impl Fn(E) -> AppError {
        let debug = self.config.debug;
        move |err| {
            log::error!("{}: {}", message, err);
            AppError::internal(message, debug.then(|| err.to_string()))
        }
    }
}
