use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    /// Application key embedded in channel grants.
    pub app_key: String,
    /// Secret used to sign channel grants.
    pub app_secret: String,
    pub per_page: i64,
    pub max_upload_mb: u64,
    pub allowed_images: Vec<String>,
    pub allowed_files: Vec<String>,
    pub attachments_folder: String,
    pub s3: Option<S3Config>,
}

impl Config {
    fn parse_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn default_images() -> Vec<String> {
        ["png", "jpg", "jpeg", "gif"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn default_files() -> Vec<String> {
        ["zip", "rar", "txt"].iter().map(|s| s.to_string()).collect()
    }

    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());

        let app_key = env::var("PUSH_APP_KEY").unwrap_or_else(|_| "messenger".into());
        let app_secret = env::var("PUSH_APP_SECRET")
            .map_err(|_| crate::error::AppError::Config("PUSH_APP_SECRET missing".into()))?;

        let per_page = env::var("MESSENGER_PER_PAGE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let max_upload_mb = env::var("MESSENGER_MAX_UPLOAD_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(150);

        let allowed_images = env::var("MESSENGER_ALLOWED_IMAGES")
            .ok()
            .map(|v| Self::parse_list(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(Self::default_images);
        let allowed_files = env::var("MESSENGER_ALLOWED_FILES")
            .ok()
            .map(|v| Self::parse_list(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(Self::default_files);

        let attachments_folder =
            env::var("MESSENGER_ATTACHMENTS_FOLDER").unwrap_or_else(|_| "attachments".into());

        let s3 = match env::var("S3_BUCKET") {
            Ok(bucket) if !bucket.trim().is_empty() => Some(S3Config {
                bucket,
                region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
                endpoint: env::var("S3_ENDPOINT").ok().filter(|v| !v.trim().is_empty()),
                access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
                secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
                public_base_url: env::var("S3_PUBLIC_BASE_URL")
                    .ok()
                    .filter(|v| !v.trim().is_empty()),
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            redis_url,
            app_key,
            app_secret,
            per_page,
            max_upload_mb,
            allowed_images,
            allowed_files,
            attachments_folder,
            s3,
        })
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1:6379/0".into(),
            app_key: "messenger".into(),
            app_secret: "test-secret".into(),
            per_page: 30,
            max_upload_mb: 150,
            allowed_images: Self::default_images(),
            allowed_files: Self::default_files(),
            attachments_folder: "attachments".into(),
            s3: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_lowercases_and_trims() {
        let parsed = Config::parse_list("PNG, jpg , ,gif");
        assert_eq!(parsed, vec!["png", "jpg", "gif"]);
    }

    #[test]
    fn test_defaults_carry_the_stock_extension_sets() {
        let cfg = Config::test_defaults();
        assert_eq!(cfg.allowed_images, vec!["png", "jpg", "jpeg", "gif"]);
        assert_eq!(cfg.allowed_files, vec!["zip", "rar", "txt"]);
    }
}
