/// S3-backed blob storage for message attachments.
///
/// Provides existence checks, deletion, upload, and URL resolution for the
/// stored names kept in attachment metadata. URLs come from the configured
/// public base when one is set, otherwise from a presigned GET.
use crate::config::S3Config;
use crate::error::{AppError, AppResult};
use crate::storage::BlobStorage;
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::time::Duration;

/// Presigned URL expiry (15 minutes).
const PRESIGNED_URL_EXPIRY_SECS: u64 = 900;

pub struct S3BlobStorage {
    client: Client,
    bucket: String,
    public_base_url: Option<String>,
}

impl S3BlobStorage {
    pub fn new(client: Client, bucket: String, public_base_url: Option<String>) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }

    /// Build an S3 client from config. Explicit credentials are used when
    /// provided, otherwise the default AWS credential chain; a custom
    /// endpoint supports S3-compatible storage like MinIO.
    pub async fn from_config(config: &S3Config) -> AppResult<Self> {
        let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "messenger-core",
            );
            builder = builder.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let shared_config = builder.load().await;
        Ok(Self::new(
            Client::new(&shared_config),
            config.bucket.clone(),
            config.public_base_url.clone(),
        ))
    }
}

#[async_trait]
impl BlobStorage for S3BlobStorage {
    async fn exists(&self, path: &str) -> AppResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(AppError::Storage(format!("head {}: {}", path, service_err)))
                }
            }
        }
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("delete {}: {}", path, e)))?;
        Ok(())
    }

    async fn url(&self, path: &str) -> AppResult<String> {
        if let Some(base) = &self.public_base_url {
            return Ok(format!("{}/{}", base.trim_end_matches('/'), path));
        }

        let presign_cfg = PresigningConfig::builder()
            .expires_in(Duration::from_secs(PRESIGNED_URL_EXPIRY_SECS))
            .build()
            .map_err(|e| AppError::Storage(format!("presign config: {}", e)))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(presign_cfg)
            .await
            .map_err(|e| AppError::Storage(format!("presign {}: {}", path, e)))?;

        Ok(presigned.uri().to_string())
    }

    async fn store(&self, path: &str, bytes: Vec<u8>) -> AppResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("put {}: {}", path, e)))?;
        Ok(())
    }
}
