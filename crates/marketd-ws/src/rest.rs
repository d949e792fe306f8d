//! JSON REST client for venue probes and token fetches.

use crate::error::{WsError, WsResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Bounded timeout for probes and token fetches.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal JSON REST client rooted at a venue base URL.
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: String,
    client: Client,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> WsResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| WsError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `base_url + path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> WsResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "rest get");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WsError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WsError::HttpStatus(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| WsError::Http(e.to_string()))
    }

    /// POST a JSON body to `base_url + path` and decode the JSON response.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> WsResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "rest post");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| WsError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WsError::HttpStatus(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| WsError::Http(e.to_string()))
    }
}
