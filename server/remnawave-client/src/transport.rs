//! HTTP plumbing for the panel API.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::Value;
use tracing::debug;

use crate::error::RemnaWaveApiError;

/// One JSON request against the panel. Non-2xx answers are errors carrying
/// the status code and the decoded body.
pub trait Transport {
  fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
  ) -> impl Future<Output = Result<Value, RemnaWaveApiError>> + Send;
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
  base_url: String,
  api_key: String,
  http: Client,
}

impl HttpTransport {
  pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, RemnaWaveApiError> {
    let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
    Ok(Self::with_client(base_url, api_key, http))
  }

  pub fn with_client(base_url: impl Into<String>, api_key: impl Into<String>, http: Client) -> Self {
    Self {
      base_url: base_url.into().trim_end_matches('/').to_string(),
      api_key: api_key.into(),
      http,
    }
  }
}

impl Transport for HttpTransport {
  async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
  ) -> Result<Value, RemnaWaveApiError> {
    let url = format!("{}{}", self.base_url, path);
    debug!(%method, path, "panel request");

    let mut builder = self
      .http
      .request(method, &url)
      .bearer_auth(&self.api_key)
      .header("X-Api-Key", &self.api_key);
    if let Some(body) = body {
      builder = builder.json(&body);
    }

    let response = builder.send().await?;
    let status = response.status();
    let text = response.text().await?;
    let data = serde_json::from_str::<Value>(&text).ok();

    if status.is_success() {
      return data.ok_or_else(|| {
        RemnaWaveApiError::new("invalid JSON in panel response").with_status(status.as_u16())
      });
    }

    let message = data
      .as_ref()
      .and_then(|d| d.get("message"))
      .and_then(Value::as_str)
      .map(str::to_string)
      .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    debug!(status = status.as_u16(), %message, "panel error");
    Err(
      RemnaWaveApiError::new(message)
        .with_status(status.as_u16())
        .with_response_data(data),
    )
  }
}
