use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::info;

use staffdesk_backend::config::{AppConfig, StorageConfig};
use staffdesk_backend::db::{self, PgStore};
use staffdesk_backend::state::AppState;
use staffdesk_backend::storage::{self, BlobStore, LocalDisk, S3Bucket};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to the database")?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let blobs: Arc<dyn BlobStore> = match &config.storage {
        StorageConfig::Local { root } => {
            info!("Storing uploads under {}", root.display());
            Arc::new(LocalDisk::new(root.clone()))
        }
        StorageConfig::S3 { bucket } => {
            info!("Storing uploads in S3 bucket {}", bucket);
            Arc::new(S3Bucket::new(storage::s3::create_s3_client().await, bucket.clone()))
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = web::Data::new(AppState::new(config, Arc::new(PgStore::new(pool)), blobs));

    info!("Starting server at {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(staffdesk_backend::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {bind_addr}"))?
    .run()
    .await?;

    Ok(())
}
