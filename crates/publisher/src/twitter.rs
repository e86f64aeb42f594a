//! Twitter v1.1 media upload and status posting.

use async_trait::async_trait;
use serde::Deserialize;
use suncast_common::config::PublishConfig;
use suncast_common::error::{SuncastError, SuncastResult};

use crate::credentials::Credentials;
use crate::oauth::OAuthSigner;
use crate::publish::{PostedStatus, Publisher};

/// Publishes to one account through the v1.1 REST API.
#[derive(Debug, Clone)]
pub struct TwitterPublisher {
    client: reqwest::Client,
    signer: OAuthSigner,
    api_base: String,
    upload_base: String,
}

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    id_str: String,
}

impl TwitterPublisher {
    pub fn new(credentials: &Credentials, config: &PublishConfig) -> SuncastResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("suncast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SuncastError::config(format!("failed to build HTTP client: {e}")))?;
        let signer = OAuthSigner::new(&credentials.consumer_key, &credentials.consumer_secret)
            .with_token(&credentials.access_key, &credentials.access_secret);
        Ok(Self {
            client,
            signer,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    async fn upload_media(&self, media: &[u8]) -> SuncastResult<String> {
        let url = format!("{}/1.1/media/upload.json", self.upload_base);
        // multipart bodies are not part of the signature base
        let auth = self.signer.authorization("POST", &url, &[], &[])?;
        let form = reqwest::multipart::Form::new()
            .part("media", reqwest::multipart::Part::bytes(media.to_vec()));

        tracing::debug!(bytes = media.len(), "Uploading media");
        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SuncastError::publish(format!("media upload failed: {e}")))?;

        let body: MediaUploadResponse = read_json(resp, "media upload").await?;
        Ok(body.media_id_string)
    }

    async fn post_status(&self, status: &str, media_ids: &[String]) -> SuncastResult<PostedStatus> {
        let url = format!("{}/1.1/statuses/update.json", self.api_base);
        let joined = media_ids.join(",");
        let mut params: Vec<(&str, &str)> = vec![("media_ids", joined.as_str())];
        if !status.is_empty() {
            params.push(("status", status));
        }
        let auth = self.signer.authorization("POST", &url, &params, &[])?;

        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .form(&params)
            .send()
            .await
            .map_err(|e| SuncastError::publish(format!("status update failed: {e}")))?;

        let body: StatusResponse = read_json(resp, "status update").await?;
        Ok(PostedStatus { id: body.id_str })
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    what: &str,
) -> SuncastResult<T> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| SuncastError::publish(format!("{what} response unreadable: {e}")))?;
    if !status.is_success() {
        return Err(SuncastError::publish(format!(
            "{what} returned {status}: {}",
            body.chars().take(500).collect::<String>()
        )));
    }
    serde_json::from_str(&body)
        .map_err(|e| SuncastError::publish(format!("{what} returned unexpected JSON: {e}")))
}
