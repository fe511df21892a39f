//! Receipt API adapter.
//!
//! The bridge only ever sees the two-step contract in [`IncomeApi`]:
//! configure credentials, then register an income and get back an opaque
//! JSON value. [`NalogClient`] implements it over the lknpd.nalog.ru web API.

use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::proxy::ProxySetting;

const SOURCE_TYPE: &str = "WEB";
const APP_VERSION: &str = "1.0.0";
const USER_AGENT: &str =
  "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
/// Receipts are stamped in Moscow time (UTC+3, no DST).
const MOSCOW_OFFSET_HOURS: i64 = 3;

/// The upstream contract as the bridge uses it.
pub trait IncomeApi {
  fn configure(&mut self, inn: &str, password: &str) -> Result<(), ApiError>;

  /// Register one income; the response is returned untouched.
  fn add_income(
    &mut self,
    operation_time: NaiveDateTime,
    amount: f64,
    name: &str,
  ) -> Result<Value, ApiError>;
}

struct Credentials {
  inn: String,
  password: String,
}

/// Blocking client for the "Мой налог" API. Authenticates lazily on the
/// first income and reuses the token for later attempts.
pub struct NalogClient {
  base_url: String,
  http: Client,
  device_id: String,
  credentials: Option<Credentials>,
  token: Option<String>,
}

impl NalogClient {
  /// Build a client with the given per-request timeout. An enabled proxy is
  /// set on the client directly; otherwise the usual proxy variables apply.
  pub fn new(
    base_url: impl Into<String>,
    timeout: Duration,
    proxy: &ProxySetting,
  ) -> Result<Self, ApiError> {
    let mut builder = Client::builder()
      .connect_timeout(timeout)
      .timeout(timeout)
      .user_agent(USER_AGENT);
    if let Some(url) = proxy.url() {
      builder = builder.proxy(reqwest::Proxy::all(client_proxy_url(url))?);
    }
    Ok(Self::with_http_client(base_url, builder.build()?))
  }

  pub fn with_http_client(base_url: impl Into<String>, http: Client) -> Self {
    Self {
      base_url: base_url.into().trim_end_matches('/').to_string(),
      http,
      device_id: new_device_id(),
      credentials: None,
      token: None,
    }
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path)
  }

  fn authenticate(&mut self) -> Result<String, ApiError> {
    if let Some(token) = &self.token {
      return Ok(token.clone());
    }
    let creds = self
      .credentials
      .as_ref()
      .ok_or_else(|| ApiError::new("client is not configured: call configure first"))?;

    let body = AuthRequest {
      username: &creds.inn,
      password: &creds.password,
      device_info: DeviceInfo {
        source_device_id: &self.device_id,
        source_type: SOURCE_TYPE,
        app_version: APP_VERSION,
        meta_details: MetaDetails {
          user_agent: USER_AGENT,
        },
      },
    };
    let value = send(self.http.post(self.endpoint("auth/lkfl")).json(&body))?;
    let auth: AuthResponse = serde_json::from_value(value)
      .map_err(|e| ApiError::new(format!("auth failed: unexpected response: {}", e)))?;
    if auth.token.trim().is_empty() {
      return Err(ApiError::new("auth failed: empty token"));
    }
    debug!(inn = %creds.inn, "authenticated");
    self.token = Some(auth.token.clone());
    Ok(auth.token)
  }
}

impl IncomeApi for NalogClient {
  fn configure(&mut self, inn: &str, password: &str) -> Result<(), ApiError> {
    let same = self
      .credentials
      .as_ref()
      .map_or(false, |c| c.inn == inn && c.password == password);
    if !same {
      self.token = None;
      self.credentials = Some(Credentials {
        inn: inn.to_string(),
        password: password.to_string(),
      });
    }
    Ok(())
  }

  fn add_income(
    &mut self,
    operation_time: NaiveDateTime,
    amount: f64,
    name: &str,
  ) -> Result<Value, ApiError> {
    let token = self.authenticate()?;
    let now = Utc::now().naive_utc();
    let amount = round_kopecks(amount);
    let body = IncomeRequest {
      operation_time: moscow_rfc3339(operation_time),
      request_time: moscow_rfc3339(now),
      services: vec![Service {
        name,
        amount,
        quantity: 1,
      }],
      total_amount: format!("{:.2}", amount),
      client: IncomeClient {
        contact_phone: None,
        display_name: None,
        inn: None,
        income_type: "FROM_INDIVIDUAL",
      },
      payment_type: "CASH",
      ignore_max_total_income_restriction: false,
    };
    send(
      self
        .http
        .post(self.endpoint("income"))
        .bearer_auth(token)
        .json(&body),
    )
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
  username: &'a str,
  password: &'a str,
  device_info: DeviceInfo<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceInfo<'a> {
  source_device_id: &'a str,
  source_type: &'static str,
  app_version: &'static str,
  meta_details: MetaDetails,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetaDetails {
  user_agent: &'static str,
}

#[derive(Deserialize)]
struct AuthResponse {
  token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IncomeRequest<'a> {
  operation_time: String,
  request_time: String,
  services: Vec<Service<'a>>,
  total_amount: String,
  client: IncomeClient,
  payment_type: &'static str,
  ignore_max_total_income_restriction: bool,
}

#[derive(Serialize)]
struct Service<'a> {
  name: &'a str,
  amount: f64,
  quantity: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IncomeClient {
  contact_phone: Option<String>,
  display_name: Option<String>,
  inn: Option<String>,
  income_type: &'static str,
}

/// Send and decode. Non-2xx becomes an [`ApiError`] whose message starts with
/// the status code; a non-JSON success body comes back as a string value.
fn send(request: RequestBuilder) -> Result<Value, ApiError> {
  let response = request.send()?;
  let status = response.status();
  let text = response.text()?;
  if !status.is_success() {
    return Err(ApiError::new(http_error_message(status, &text)));
  }
  Ok(serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.trim().to_string())))
}

fn http_error_message(status: StatusCode, body: &str) -> String {
  let detail = serde_json::from_str::<Value>(body)
    .ok()
    .and_then(|v| {
      ["message", "exceptionMessage", "error"]
        .iter()
        .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
    })
    .unwrap_or_else(|| body.trim().chars().take(300).collect());
  format!(
    "{} {}: {}",
    status.as_u16(),
    status.canonical_reason().unwrap_or("Error"),
    detail
  )
}

/// reqwest has no bare `socks` scheme; treat it as SOCKS5.
fn client_proxy_url(url: &str) -> String {
  match url.split_once("://") {
    Some((scheme, rest)) if scheme.eq_ignore_ascii_case("socks") => format!("socks5://{}", rest),
    _ => url.to_string(),
  }
}

fn moscow_rfc3339(naive_utc: NaiveDateTime) -> String {
  (naive_utc + TimeDelta::hours(MOSCOW_OFFSET_HOURS))
    .format("%Y-%m-%dT%H:%M:%S+03:00")
    .to_string()
}

fn round_kopecks(amount: f64) -> f64 {
  (amount * 100.0).round() / 100.0
}

/// Same shape the web cabinet uses: 21 characters of a v4 UUID, no dashes.
fn new_device_id() -> String {
  uuid::Uuid::new_v4().simple().to_string()[..21].to_string()
}
