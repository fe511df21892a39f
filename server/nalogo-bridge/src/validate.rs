//! Parse and validate the stdin instruction into a [`Request`].

use std::time::Duration;

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::config::{Config, Fallbacks};
use crate::error::BridgeError;
use crate::proxy;
use crate::timestamp;
use crate::types::Request;

/// Validate raw stdin text. Checks run in a fixed order and stop at the first
/// failure; every failure is a 400, non-retryable.
pub fn parse_request(
  raw: &str,
  fallbacks: &Fallbacks,
  now: NaiveDateTime,
  config: &Config,
) -> Result<Request, BridgeError> {
  if raw.trim().is_empty() {
    return Err(BridgeError::validation("empty input"));
  }
  let payload: Map<String, Value> = match serde_json::from_str(raw) {
    Ok(Value::Object(map)) => map,
    _ => return Err(BridgeError::validation("invalid json input")),
  };

  let inn = text_field(&payload, "inn");
  let password = text_field(&payload, "password");
  let name = text_field(&payload, "name");
  let operation_time =
    timestamp::normalize_operation_time(payload.get("operationTimeIso").and_then(Value::as_str), now);
  let timeout = resolve_timeout(
    payload.get("timeoutSeconds"),
    fallbacks.timeout_seconds.as_deref(),
    config,
  );

  let proxy = proxy::resolve_proxy(
    payload.get("proxyUrl").and_then(Value::as_str),
    fallbacks.proxy_url.as_deref(),
  )
  .map_err(|e| BridgeError::validation(format!("invalid proxy config: {}", e)))?;

  if inn.is_empty() || password.is_empty() {
    return Err(BridgeError::validation("missing inn/password"));
  }
  if name.is_empty() {
    return Err(BridgeError::validation("missing income name"));
  }
  let amount = number_value(payload.get("amountRub"))
    .filter(|a| a.is_finite())
    .ok_or_else(|| BridgeError::validation("invalid amount"))?;
  if amount <= 0.0 {
    return Err(BridgeError::validation("amount must be > 0"));
  }

  Ok(Request {
    inn,
    password,
    name,
    amount,
    operation_time,
    timeout,
    proxy,
  })
}

/// Request timeout: the first positive candidate (request field, then
/// environment fallback) clamped into bounds; otherwise the default.
pub fn resolve_timeout(raw: Option<&Value>, fallback: Option<&str>, config: &Config) -> Duration {
  let secs = [
    number_value(raw),
    fallback.and_then(|s| s.trim().parse::<f64>().ok()),
  ]
  .into_iter()
  .flatten()
  .find(|v| v.is_finite() && *v > 0.0)
  .map(|v| v.clamp(config.timeout_min_secs, config.timeout_max_secs))
  .unwrap_or(config.timeout_default_secs);
  Duration::from_secs_f64(secs)
}

// Callers are loose about types: numbers show up where strings belong and
// vice versa. Null counts as absent.
fn text_field(payload: &Map<String, Value>, key: &str) -> String {
  match payload.get(key) {
    Some(Value::String(s)) => s.trim().to_string(),
    Some(Value::Number(n)) => n.to_string(),
    Some(Value::Bool(b)) => b.to_string(),
    _ => String::new(),
  }
}

fn number_value(v: Option<&Value>) -> Option<f64> {
  match v {
    Some(Value::Number(n)) => n.as_f64(),
    Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
    _ => None,
  }
}
