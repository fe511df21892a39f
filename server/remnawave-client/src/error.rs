//! Error type for panel API calls.

use serde_json::Value;
use thiserror::Error;

/// A failed panel call. `status_code` is `None` for transport failures.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemnaWaveApiError {
  pub message: String,
  pub status_code: Option<u16>,
  pub response_data: Option<Value>,
}

impl RemnaWaveApiError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      status_code: None,
      response_data: None,
    }
  }

  pub fn with_status(mut self, status: u16) -> Self {
    self.status_code = Some(status);
    self
  }

  pub fn with_response_data(mut self, data: Option<Value>) -> Self {
    self.response_data = data;
    self
  }

  /// The panel answers lookups for unknown users with an error: a 404, or a
  /// 400 whose message says "not found".
  pub fn is_not_found(&self) -> bool {
    match self.status_code {
      Some(404) => true,
      Some(400) => {
        let body_message = self
          .response_data
          .as_ref()
          .and_then(|d| d.get("message"))
          .and_then(Value::as_str)
          .unwrap_or("");
        [self.message.as_str(), body_message]
          .iter()
          .any(|m| m.to_lowercase().contains("not found"))
      }
      _ => false,
    }
  }
}

impl From<reqwest::Error> for RemnaWaveApiError {
  fn from(e: reqwest::Error) -> Self {
    let status = e.status().map(|s| s.as_u16());
    let err = Self::new(format!("request failed: {}", e.without_url()));
    match status {
      Some(s) => err.with_status(s),
      None => err,
    }
  }
}
