//! Product image uploads.
//!
//! Files are written to an [`ImageStorage`] backend first and the product row
//! is updated second. If the row update fails after the files are stored, an
//! `image_url_update` job is queued so the URLs are not lost; the retry worker
//! replays it until it succeeds or its retries are spent.

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::product::ProductImage;
use crate::errors::ServiceError;
use crate::message_queue::{Message, MessageQueue};
use crate::services::products::{ImageInput, ProductService};

pub const IMAGE_URL_UPDATE_TOPIC: &str = "image_url_update";

/// 10 MiB
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[async_trait]
pub trait ImageStorage: Send + Sync + 'static {
    /// Stores `bytes` under `key` and returns the public URL.
    async fn put(&self, key: &str, bytes: Bytes) -> Result<String, ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
    /// Maps a public URL back to its storage key, if this backend owns it.
    fn key_for_url(&self, url: &str) -> Option<String>;
}

/// Stores images on the local filesystem under `root`, served at
/// `public_base_url`.
#[derive(Debug, Clone)]
pub struct LocalImageStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalImageStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(&config.upload_dir, &config.public_upload_base_url)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rejects keys that could escape `root`.
    fn path_for(&self, key: &str) -> Result<PathBuf, ServiceError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(ServiceError::StorageError(format!(
                "Invalid storage key '{}'",
                key
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<String, ServiceError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = path.with_extension("part");
        tokio::fs::write(&staging, &bytes).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(str::to_string)
    }
}

/// File extension for an accepted image content type
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/avif" => Some("avif"),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub content_type: String,
    pub bytes: Bytes,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// URLs were written to the product
    Attached,
    /// Files are stored; the product update was queued for retry
    Queued,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadOutcome {
    pub status: UploadStatus,
    pub urls: Vec<String>,
    /// Product images after the upload; empty while queued
    pub images: Vec<ProductImage>,
}

/// Queued follow-up for a stored upload whose product update failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrlUpdateJob {
    pub product_id: Uuid,
    pub images: Vec<ImageUrlUpdateItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrlUpdateItem {
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(10),
        }
    }
}

impl From<&AppConfig> for RetrySettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.image_retry_max_attempts,
            interval: Duration::from_secs(config.image_retry_interval_secs),
        }
    }
}

/// Outcome of one pass over the retry queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPass {
    pub applied: usize,
    pub requeued: usize,
    pub dropped: usize,
}

#[derive(Clone)]
pub struct ImageUploadService {
    storage: Arc<dyn ImageStorage>,
    products: Arc<ProductService>,
    queue: Arc<dyn MessageQueue>,
    retry: RetrySettings,
}

impl ImageUploadService {
    pub fn new(
        storage: Arc<dyn ImageStorage>,
        products: Arc<ProductService>,
        queue: Arc<dyn MessageQueue>,
        retry: RetrySettings,
    ) -> Self {
        Self {
            storage,
            products,
            queue,
            retry,
        }
    }

    fn validate(&self, files: &[UploadedImage]) -> Result<(), ServiceError> {
        if files.is_empty() {
            return Err(ServiceError::ValidationError(
                "No image files were provided".to_string(),
            ));
        }
        for file in files {
            if extension_for(&file.content_type).is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "Unsupported image type '{}'",
                    file.content_type
                )));
            }
            if file.bytes.is_empty() {
                return Err(ServiceError::ValidationError("Image file is empty".to_string()));
            }
            if file.bytes.len() > MAX_IMAGE_BYTES {
                return Err(ServiceError::ValidationError(format!(
                    "Image exceeds {} bytes",
                    MAX_IMAGE_BYTES
                )));
            }
        }
        Ok(())
    }

    async fn discard(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.storage.delete(key).await {
                warn!(%key, error = %e, "Failed to remove stored image");
            }
        }
    }

    /// Stores files, then appends their URLs to the product.
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn upload_images(
        &self,
        product_id: Uuid,
        files: Vec<UploadedImage>,
    ) -> Result<UploadOutcome, ServiceError> {
        self.validate(&files)?;
        let existing = self.products.get_product(product_id).await?;
        let limit = self.products.settings().max_images_per_product;
        if existing.try_image_list()?.len() + files.len() > limit {
            return Err(ServiceError::ValidationError(format!(
                "A product can have at most {} images",
                limit
            )));
        }

        let mut stored_keys = Vec::with_capacity(files.len());
        let mut inputs = Vec::with_capacity(files.len());
        for file in files {
            let extension = extension_for(&file.content_type).unwrap_or("bin");
            let key = format!("products/{}/{}.{}", product_id, Uuid::new_v4(), extension);
            match self.storage.put(&key, file.bytes).await {
                Ok(url) => {
                    stored_keys.push(key);
                    inputs.push(ImageInput { url, alt: file.alt });
                }
                Err(e) => {
                    error!(%product_id, error = %e, "Image storage failed");
                    self.discard(&stored_keys).await;
                    return Err(e);
                }
            }
        }
        let urls: Vec<String> = inputs.iter().map(|input| input.url.clone()).collect();

        match self
            .products
            .attach_uploaded_images(product_id, inputs.clone())
            .await
        {
            Ok(images) => {
                counter!("lustre_image_uploads_total", urls.len() as u64, "status" => "attached");
                info!(%product_id, count = urls.len(), "Images uploaded");
                Ok(UploadOutcome {
                    status: UploadStatus::Attached,
                    urls,
                    images,
                })
            }
            Err(ServiceError::DatabaseError(db_err)) => {
                warn!(%product_id, error = %db_err, "Queueing image URL update for retry");
                if let Err(e) = self.enqueue(product_id, inputs).await {
                    error!(%product_id, error = %e, "Could not queue image URL update");
                    self.discard(&stored_keys).await;
                    return Err(e);
                }
                counter!("lustre_image_uploads_total", urls.len() as u64, "status" => "queued");
                Ok(UploadOutcome {
                    status: UploadStatus::Queued,
                    urls,
                    images: Vec::new(),
                })
            }
            Err(other) => {
                self.discard(&stored_keys).await;
                Err(other)
            }
        }
    }

    async fn enqueue(&self, product_id: Uuid, inputs: Vec<ImageInput>) -> Result<(), ServiceError> {
        let job = ImageUrlUpdateJob {
            product_id,
            images: inputs
                .into_iter()
                .map(|input| ImageUrlUpdateItem {
                    url: input.url,
                    alt: input.alt,
                })
                .collect(),
        };
        // The first delivery is an attempt too.
        let message = Message::from_payload(IMAGE_URL_UPDATE_TOPIC, &job)?
            .with_max_retries(self.retry.max_attempts.saturating_sub(1));
        self.queue.publish(message).await?;
        Ok(())
    }

    /// Removes an image from the product and, when this backend owns the
    /// file, from storage.
    pub async fn delete_image(
        &self,
        product_id: Uuid,
        url: &str,
    ) -> Result<Vec<ProductImage>, ServiceError> {
        let images = self.products.remove_image(product_id, url).await?;
        if let Some(key) = self.storage.key_for_url(url) {
            self.discard(&[key]).await;
        }
        Ok(images)
    }

    /// Replays queued URL updates once each. Jobs that fail on the database
    /// again are nacked; jobs for products that no longer accept the images
    /// are dropped.
    pub async fn process_retry_queue(&self) -> Result<RetryPass, ServiceError> {
        let mut pass = RetryPass::default();
        let batch = self.queue.pending(IMAGE_URL_UPDATE_TOPIC).await;

        for _ in 0..batch {
            let Some(message) = self.queue.subscribe(IMAGE_URL_UPDATE_TOPIC).await? else {
                break;
            };
            let job: ImageUrlUpdateJob = match serde_json::from_value(message.payload.clone()) {
                Ok(job) => job,
                Err(e) => {
                    error!(message_id = %message.id, error = %e, "Unreadable image URL job");
                    self.queue.ack(&message.id).await?;
                    pass.dropped += 1;
                    continue;
                }
            };

            let inputs = job
                .images
                .into_iter()
                .map(|item| ImageInput {
                    url: item.url,
                    alt: item.alt,
                })
                .collect();
            match self.products.attach_uploaded_images(job.product_id, inputs).await {
                Ok(_) => {
                    self.queue.ack(&message.id).await?;
                    pass.applied += 1;
                }
                Err(ServiceError::DatabaseError(e)) => {
                    let attempt = message.retry_count + 1;
                    self.queue.nack(&message.id).await?;
                    if message.retry_count >= message.max_retries {
                        error!(
                            product_id = %job.product_id,
                            attempt,
                            error = %e,
                            "Giving up on image URL update"
                        );
                        pass.dropped += 1;
                    } else {
                        warn!(
                            product_id = %job.product_id,
                            attempt,
                            error = %e,
                            "Image URL update failed again"
                        );
                        pass.requeued += 1;
                    }
                }
                Err(e) => {
                    warn!(product_id = %job.product_id, error = %e, "Dropping image URL update");
                    self.queue.ack(&message.id).await?;
                    pass.dropped += 1;
                }
            }
        }
        Ok(pass)
    }

    /// Runs [`Self::process_retry_queue`] on the configured interval.
    pub fn spawn_retry_worker(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.retry.interval);
            loop {
                ticker.tick().await;
                match self.process_retry_queue().await {
                    Ok(pass) if pass != RetryPass::default() => {
                        info!(?pass, "Image URL retry pass finished");
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Image URL retry pass failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_storage_writes_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalImageStorage::new(dir.path(), "/uploads/");

        let url = storage
            .put("products/p1/a.png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert_eq!(url, "/uploads/products/p1/a.png");
        assert_eq!(
            std::fs::read(dir.path().join("products/p1/a.png")).unwrap(),
            b"png"
        );
        assert_eq!(
            storage.key_for_url(&url).as_deref(),
            Some("products/p1/a.png")
        );

        storage.delete("products/p1/a.png").await.unwrap();
        assert!(!dir.path().join("products/p1/a.png").exists());
        storage.delete("products/p1/a.png").await.unwrap();
    }

    #[tokio::test]
    async fn local_storage_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalImageStorage::new(dir.path(), "/uploads");
        let result = storage.put("../outside.png", Bytes::from_static(b"x")).await;
        assert!(matches!(result, Err(ServiceError::StorageError(_))));
        assert!(storage.put("/abs.png", Bytes::from_static(b"x")).await.is_err());
    }

    #[test]
    fn only_image_types_are_accepted() {
        assert_eq!(extension_for("image/JPEG"), Some("jpg"));
        assert_eq!(extension_for("image/webp"), Some("webp"));
        assert_eq!(extension_for("application/pdf"), None);
    }
}
