//! Structured error types for the bridge.

use thiserror::Error;

/// Every way one invocation can fail. Each variant carries enough to render
/// the `{status, retryable}` pair the caller sees.
#[derive(Debug, Error)]
pub enum BridgeError {
  /// Malformed input. The upstream service is never contacted.
  #[error("{0}")]
  Validation(String),

  /// The upstream call failed; status and retryability come from the classifier.
  #[error("{message}")]
  Upstream {
    message: String,
    status: u16,
    retryable: bool,
  },

  /// The upstream call succeeded but did not yield a usable receipt reference.
  #[error("{0}")]
  Receipt(String),
}

impl BridgeError {
  pub fn validation(reason: impl Into<String>) -> Self {
    Self::Validation(reason.into())
  }

  pub fn status(&self) -> u16 {
    match self {
      Self::Validation(_) => 400,
      Self::Upstream { status, .. } => *status,
      Self::Receipt(_) => 502,
    }
  }

  pub fn retryable(&self) -> bool {
    match self {
      Self::Validation(_) => false,
      Self::Upstream { retryable, .. } => *retryable,
      Self::Receipt(_) => true,
    }
  }
}

/// Rejected proxy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProxyError {
  #[error("invalid proxy url")]
  InvalidUrl,
  #[error("unsupported proxy scheme")]
  UnsupportedScheme,
  #[error("proxy host is missing")]
  MissingHost,
}

/// Failure reported by the receipt API. The message text is the only signal
/// the bridge gets; it is classified, never matched structurally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
  pub message: String,
}

impl ApiError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(e: reqwest::Error) -> Self {
    let kind = if e.is_timeout() {
      "timeout"
    } else if e.is_connect() {
      "connect error"
    } else if e.is_decode() {
      "decode error"
    } else {
      "request error"
    };

    // reqwest's Display stops at the top-level error; the useful part
    // ("tcp connect error", "operation timed out") lives in the source chain.
    let e = e.without_url();
    let mut message = format!("{}: {}", kind, e);
    let mut source = std::error::Error::source(&e);
    while let Some(s) = source {
      message.push_str(": ");
      message.push_str(&s.to_string());
      source = s.source();
    }
    Self { message }
  }
}
