//! Request/result types for the bridge (JSON contract with Node).

use std::fmt;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::BridgeError;
use crate::proxy::ProxySetting;

/// Normalized, validated request. Built from the stdin object by
/// [`crate::validate::parse_request`].
#[derive(Clone)]
pub struct Request {
  pub inn: String,
  pub password: String,
  pub name: String,
  /// Rubles, strictly positive.
  pub amount: f64,
  /// Naive UTC.
  pub operation_time: NaiveDateTime,
  /// Already clamped into the configured bounds.
  pub timeout: Duration,
  pub proxy: ProxySetting,
}

impl fmt::Debug for Request {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Request")
      .field("inn", &self.inn)
      .field("password", &"<redacted>")
      .field("name", &self.name)
      .field("amount", &self.amount)
      .field("operation_time", &self.operation_time)
      .field("timeout", &self.timeout)
      .field("proxy", &self.proxy.label())
      .finish()
  }
}

/// A registered receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
  pub uuid: String,
  pub url: Option<String>,
}

/// Final result of one invocation.
pub type Outcome = Result<Receipt, BridgeError>;

/// Output: the one JSON object written to stdout.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Output {
  #[serde(rename_all = "camelCase")]
  Success {
    ok: bool,
    receipt_uuid: String,
    receipt_url: Option<String>,
  },
  Failure {
    ok: bool,
    error: String,
    status: u16,
    retryable: bool,
  },
}

impl Output {
  pub fn exit_code(&self) -> i32 {
    match self {
      Self::Success { .. } => 0,
      Self::Failure { .. } => 1,
    }
  }
}

impl From<&Outcome> for Output {
  fn from(outcome: &Outcome) -> Self {
    match outcome {
      Ok(receipt) => Self::Success {
        ok: true,
        receipt_uuid: receipt.uuid.clone(),
        receipt_url: receipt.url.clone(),
      },
      Err(e) => Self::Failure {
        ok: false,
        error: e.to_string(),
        status: e.status(),
        retryable: e.retryable(),
      },
    }
  }
}
