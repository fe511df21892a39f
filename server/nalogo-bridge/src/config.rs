//! Bridge configuration with sane defaults.

use std::env;
use std::time::Duration;

use crate::classify::Classifier;

/// Fallback request timeout, seconds.
pub const ENV_TIMEOUT_SECONDS: &str = "NALOGO_TIMEOUT_SECONDS";
/// Fallback proxy URL when the request carries none.
pub const ENV_PROXY_URL: &str = "NALOGO_PROXY_URL";
/// Override for the receipt API base URL (staging, local mocks).
pub const ENV_API_BASE_URL: &str = "NALOGO_API_BASE_URL";

pub const DEFAULT_API_BASE_URL: &str = "https://lknpd.nalog.ru/api/v1";

/// Tunables for one bridge invocation.
#[derive(Debug, Clone)]
pub struct Config {
  /// Upper bound on configure+submit attempts.
  pub max_attempts: u32,
  /// Backoff after attempt `n` is `backoff_step * n`, capped at `backoff_cap`.
  pub backoff_step: Duration,
  pub backoff_cap: Duration,
  pub timeout_default_secs: f64,
  pub timeout_min_secs: f64,
  pub timeout_max_secs: f64,
  pub api_base_url: String,
  /// Message → (status, retryable) table for upstream failures.
  pub classifier: Classifier,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      backoff_step: Duration::from_secs(2),
      backoff_cap: Duration::from_secs(4),
      timeout_default_secs: 30.0,
      timeout_min_secs: 3.0,
      timeout_max_secs: 120.0,
      api_base_url: DEFAULT_API_BASE_URL.to_string(),
      classifier: Classifier::default(),
    }
  }
}

impl Config {
  /// Defaults, with the API base URL taken from the environment when set.
  pub fn from_env() -> Self {
    let mut config = Self::default();
    if let Some(url) = non_blank_var(ENV_API_BASE_URL) {
      config.api_base_url = url;
    }
    config
  }
}

/// Environment values consulted when the request itself is silent.
#[derive(Debug, Clone, Default)]
pub struct Fallbacks {
  pub timeout_seconds: Option<String>,
  pub proxy_url: Option<String>,
}

impl Fallbacks {
  pub fn from_env() -> Self {
    Self {
      timeout_seconds: non_blank_var(ENV_TIMEOUT_SECONDS),
      proxy_url: non_blank_var(ENV_PROXY_URL),
    }
  }
}

fn non_blank_var(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}
