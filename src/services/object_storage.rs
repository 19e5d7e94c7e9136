use aws_config::BehaviorVersion;
use aws_sdk_s3::{primitives::ByteStream, Client};
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

/// S3-backed store for processed article images.
///
/// Credentials come from the environment (AWS_ACCESS_KEY_ID,
/// AWS_SECRET_ACCESS_KEY, AWS_REGION).
pub struct ObjectStorage {
    client: Client,
    bucket: String,
    public_base: Option<String>,
}

impl ObjectStorage {
    pub async fn new(bucket: String, public_base: Option<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .load()
            .await;
        let client = Client::new(&config);

        tracing::debug!("Object storage initialized with bucket: {}", bucket);

        Self {
            client,
            bucket,
            public_base,
        }
    }

    /// Upload publicly readable bytes and return their public URL.
    pub async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 put error: {}", e)))?;

        Ok(self.public_url(key))
    }

    /// Collision-resistant key for an image fetched from `source_url`:
    /// upload time plus a hash of the original reference.
    pub fn image_key(source_url: &str) -> String {
        let digest = hex::encode(Sha256::digest(source_url.as_bytes()));
        format!("news/{}-{}.jpg", Utc::now().timestamp_millis(), &digest[..16])
    }

    fn public_url(&self, key: &str) -> String {
        match &self.public_base {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("https://{}.s3.amazonaws.com/{}", self.bucket, key),
        }
    }
}
