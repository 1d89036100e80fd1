// src/inference.rs

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const TOKEN_VAR: &str = "HF_API_TOKEN";

/// Thin client for `POST {base_url}/models/{model}` inference endpoints.
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl InferenceClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        info!(url = %base_url, authenticated = token.is_some(), "Inference endpoint");
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.base_url, model)
    }

    /// Send one request and decode the JSON reply.
    pub async fn post<B, R>(&self, model: &str, body: &B) -> Result<R, String>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.model_url(model);
        debug!(url = %url, "Inference request");

        let mut req = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let response = req.send().await.map_err(|e| format!("{model}: {e}"))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("{model} returned {status}: {body}"));
        }

        let text = response.text().await.map_err(|e| format!("{model}: {e}"))?;
        serde_json::from_str(&text)
            .map_err(|e| format!("Failed to decode {model} response: {e}\nRaw: {text}"))
    }
}

/// Read an image from disk as base64 for a JSON payload.
pub async fn encode_image(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_url_trims_slash() {
        let c = InferenceClient::new("http://localhost:8080/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(
            c.model_url("impira/layoutlm-document-qa"),
            "http://localhost:8080/models/impira/layoutlm-document-qa"
        );
    }

    #[tokio::test]
    async fn test_encode_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.png");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(encode_image(&path).await.unwrap(), "YWJj");
    }
}
