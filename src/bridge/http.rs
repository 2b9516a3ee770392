/*!
 * Network calls made by the controller on behalf of a surface.
 */

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::errors::BridgeError;

/// Performs a proxied POST
#[async_trait]
pub trait HttpPoster: Send + Sync {
    /// POST `body` as JSON to `url` and return the decoded JSON answer
    async fn post(&self, url: &Url, body: &Value) -> Result<Value, BridgeError>;
}

/// The one URL a surface may reach through the controller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchPolicy {
    allowed: Option<String>,
}

impl FetchPolicy {
    /// `allowed` is kept as declared; requests must repeat it character for character
    pub fn new(allowed: Option<String>) -> Self {
        Self { allowed }
    }

    /// Policy that rejects everything
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// The allowed URL if `raw` is exactly the declared string
    pub fn check(&self, raw: &str) -> Option<Url> {
        let allowed = self.allowed.as_deref()?;
        if raw != allowed {
            return None;
        }
        Url::parse(raw).ok()
    }
}

/// [`HttpPoster`] backed by `reqwest`
pub struct ReqwestPoster {
    client: Client,
}

impl ReqwestPoster {
    pub fn new(timeout: Duration) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpPoster for ReqwestPoster {
    async fn post(&self, url: &Url, body: &Value) -> Result<Value, BridgeError> {
        debug!("Proxying POST to {}", url);
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| BridgeError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BridgeError::Http(format!("{}: {}", status, error_text)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| BridgeError::Http(e.to_string()))
    }
}
