//! Supabase storage bucket over its REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::storage::{ObjectStorage, StoredObject};
use carousel_core::{Error, Result};

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(client: Client, base_url: &str, service_key: &str, bucket: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
        }
    }

    fn list_url(&self) -> String {
        format!("{}/storage/v1/object/list/{}", self.base_url, self.bucket)
    }

    fn sign_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url,
            self.bucket,
            encoded.join("/")
        )
    }

    /// The sign endpoint answers with a path relative to `/storage/v1`.
    fn absolute_signed_url(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            signed.to_string()
        } else {
            format!(
                "{}/storage/v1/{}",
                self.base_url,
                signed.trim_start_matches('/')
            )
        }
    }

    async fn post_json(&self, url: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Storage request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!("API error {}: {}", status, body)));
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn list(&self, folder: &str, limit: usize) -> Result<Vec<StoredObject>> {
        let body = json!({
            "prefix": folder,
            "limit": limit,
            "offset": 0,
            "sortBy": { "column": "name", "order": "asc" },
        });
        let objects: Vec<ListedObject> = self
            .post_json(&self.list_url(), body)
            .await
            .map_err(|e| Error::Storage(format!("Failed to list files in {}: {}", folder, e)))?
            .json()
            .await
            .map_err(|e| Error::Storage(format!("Malformed listing for {}: {}", folder, e)))?;

        debug!("Listed {} objects in {}", objects.len(), folder);
        Ok(objects
            .into_iter()
            .map(|o| StoredObject { name: o.name })
            .collect())
    }

    async fn create_signed_url(&self, path: &str, ttl: Duration) -> Result<String> {
        let body = json!({ "expiresIn": ttl.as_secs() });
        let signed: SignedUrlResponse = self
            .post_json(&self.sign_url(path), body)
            .await
            .map_err(|e| Error::Storage(format!("Failed to create signed URL for {}: {}", path, e)))?
            .json()
            .await
            .map_err(|e| Error::Storage(format!("Failed to create signed URL for {}: {}", path, e)))?;

        Ok(self.absolute_signed_url(&signed.signed_url))
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SupabaseStorage {
        SupabaseStorage::new(Client::new(), "https://proj.supabase.co/", "key", "files")
    }

    #[test]
    fn test_endpoint_urls() {
        let s = storage();
        assert_eq!(s.list_url(), "https://proj.supabase.co/storage/v1/object/list/files");
        assert_eq!(
            s.sign_url("upskin_products/IMG 1.jpg"),
            "https://proj.supabase.co/storage/v1/object/sign/files/upskin_products/IMG%201.jpg"
        );
    }

    #[test]
    fn test_absolute_signed_url() {
        let s = storage();
        assert_eq!(
            s.absolute_signed_url("/object/sign/files/a.jpg?token=t"),
            "https://proj.supabase.co/storage/v1/object/sign/files/a.jpg?token=t"
        );
        assert_eq!(
            s.absolute_signed_url("https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn test_signed_url_response_field() {
        let parsed: SignedUrlResponse =
            serde_json::from_str(r#"{"signedURL":"/object/sign/files/a.jpg?token=t"}"#).unwrap();
        assert!(parsed.signed_url.ends_with("token=t"));
    }
}
