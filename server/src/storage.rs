//! Blob storage client for raffle images.
//!
//! Talks to a Supabase-style storage API: authenticated uploads under
//! `storage/v1/object/{bucket}/{path}`, public reads under
//! `storage/v1/object/public/{bucket}/{path}`.

use async_trait::async_trait;
use reqwest::Client;
use rifa_core::error::{CoreError, Result};
use rifa_core::notify::BlobStore;
use rifa_core::types::UserId;
use uuid::Uuid;

/// HTTP blob store for raffle images.
#[derive(Clone)]
pub struct HttpBlobStore {
    client: Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl HttpBlobStore {
    /// Create a store against the given storage service.
    #[must_use]
    pub fn new(base_url: String, bucket: String, service_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket,
            service_key,
        }
    }

    fn extension_for(content_type: &str) -> &'static str {
        match content_type {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, owner: UserId, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let extension = Self::extension_for(content_type);
        let path = format!("raffle/{owner}/{}.{extension}", Uuid::new_v4());

        let response = self
            .client
            .post(format!(
                "{}/storage/v1/object/{}/{path}",
                self.base_url, self.bucket
            ))
            .bearer_auth(&self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| CoreError::Upstream(format!("image upload failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Upstream(format!(
                "image upload rejected (status {status}): {body}"
            )));
        }

        Ok(format!(
            "{}/storage/v1/object/public/{}/{path}",
            self.base_url, self.bucket
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping() {
        assert_eq!(HttpBlobStore::extension_for("image/png"), "png");
        assert_eq!(HttpBlobStore::extension_for("image/jpeg"), "jpg");
        assert_eq!(HttpBlobStore::extension_for("application/pdf"), "bin");
    }
}
