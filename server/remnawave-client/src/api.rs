//! User lookups with response normalization.

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::error::RemnaWaveApiError;
use crate::transport::{HttpTransport, Transport};
use crate::types::RemnaWaveUser;

pub struct RemnaWaveApi<T = HttpTransport> {
  transport: T,
}

impl RemnaWaveApi<HttpTransport> {
  pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, RemnaWaveApiError> {
    Ok(Self::with_transport(HttpTransport::new(base_url, api_key)?))
  }
}

impl<T: Transport> RemnaWaveApi<T> {
  pub fn with_transport(transport: T) -> Self {
    Self { transport }
  }

  /// All users bound to a Telegram account. Unknown id → empty list.
  pub async fn get_user_by_telegram_id(
    &self,
    telegram_id: i64,
  ) -> Result<Vec<RemnaWaveUser>, RemnaWaveApiError> {
    let path = format!("/api/users/by-telegram-id/{}", telegram_id);
    Ok(self.lookup(&path).await?.unwrap_or_default())
  }

  /// Unknown uuid → `None`.
  pub async fn get_user_by_uuid(&self, uuid: &str) -> Result<Option<RemnaWaveUser>, RemnaWaveApiError> {
    let path = format!("/api/users/{}", uuid);
    Ok(self.lookup(&path).await?.and_then(first))
  }

  pub async fn get_user_by_username(
    &self,
    username: &str,
  ) -> Result<Option<RemnaWaveUser>, RemnaWaveApiError> {
    let path = format!("/api/users/by-username/{}", username);
    Ok(self.lookup(&path).await?.and_then(first))
  }

  /// GET + normalize; `None` when the panel says the user does not exist.
  async fn lookup(&self, path: &str) -> Result<Option<Vec<RemnaWaveUser>>, RemnaWaveApiError> {
    match self.transport.request(Method::GET, path, None).await {
      Ok(body) => parse_users(&body).map(Some),
      Err(e) if e.is_not_found() => {
        debug!(path, "user not found: {}", e);
        Ok(None)
      }
      Err(e) => Err(e),
    }
  }
}

fn first(users: Vec<RemnaWaveUser>) -> Option<RemnaWaveUser> {
  users.into_iter().next()
}

/// The payload sits under `response` and is a list, a single user, or an
/// object wrapping a `users` list.
fn parse_users(body: &Value) -> Result<Vec<RemnaWaveUser>, RemnaWaveApiError> {
  let payload = body.get("response").unwrap_or(body);
  let items: Vec<&Value> = match payload {
    Value::Array(items) => items.iter().collect(),
    Value::Object(map) => match map.get("users") {
      Some(Value::Array(items)) => items.iter().collect(),
      _ => vec![payload],
    },
    Value::Null => Vec::new(),
    other => {
      return Err(RemnaWaveApiError::new(format!(
        "unexpected user payload: {}",
        other
      )))
    }
  };

  items
    .into_iter()
    .map(|v| {
      serde_json::from_value(v.clone()).map_err(|e| {
        RemnaWaveApiError::new(format!("invalid user payload: {}", e))
          .with_response_data(Some(v.clone()))
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::Mutex;

  /// Returns a canned result and remembers the requested paths.
  struct FakeTransport {
    result: Result<Value, RemnaWaveApiError>,
    paths: Mutex<Vec<String>>,
  }

  impl FakeTransport {
    fn new(result: Result<Value, RemnaWaveApiError>) -> Self {
      Self {
        result,
        paths: Mutex::new(Vec::new()),
      }
    }
  }

  impl Transport for FakeTransport {
    async fn request(
      &self,
      _method: Method,
      path: &str,
      _body: Option<Value>,
    ) -> Result<Value, RemnaWaveApiError> {
      self.paths.lock().unwrap().push(path.to_string());
      self.result.clone()
    }
  }

  fn sample_user() -> Value {
    let ts = "2026-01-01T00:00:00Z";
    json!({
      "uuid": "user-uuid",
      "shortUuid": "short-uuid",
      "username": "test-user",
      "status": "ACTIVE",
      "trafficLimitBytes": 0,
      "trafficLimitStrategy": "NO_RESET",
      "expireAt": ts,
      "subscriptionUrl": "",
      "activeInternalSquads": [],
      "createdAt": ts,
      "updatedAt": ts,
    })
  }

  fn not_found() -> RemnaWaveApiError {
    RemnaWaveApiError::new("User with specified params not found")
      .with_status(400)
      .with_response_data(Some(json!({"message": "User with specified params not found"})))
  }

  #[tokio::test]
  async fn telegram_lookup_returns_empty_on_semantic_not_found() {
    let api = RemnaWaveApi::with_transport(FakeTransport::new(Err(not_found())));
    let users = api.get_user_by_telegram_id(123456).await.unwrap();
    assert!(users.is_empty());
  }

  #[tokio::test]
  async fn uuid_lookup_returns_none_on_semantic_not_found() {
    let api = RemnaWaveApi::with_transport(FakeTransport::new(Err(not_found())));
    let user = api.get_user_by_uuid("missing-uuid").await.unwrap();
    assert!(user.is_none());
    assert_eq!(api.transport.paths.lock().unwrap()[0], "/api/users/missing-uuid");
  }

  #[tokio::test]
  async fn telegram_lookup_accepts_single_object_response() {
    let api = RemnaWaveApi::with_transport(FakeTransport::new(Ok(json!({"response": sample_user()}))));
    let users = api.get_user_by_telegram_id(123456).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].uuid, "user-uuid");
    assert_eq!(
      api.transport.paths.lock().unwrap()[0],
      "/api/users/by-telegram-id/123456"
    );
  }

  #[tokio::test]
  async fn list_and_wrapped_list_shapes() {
    let api = RemnaWaveApi::with_transport(FakeTransport::new(Ok(json!({
      "response": [sample_user(), sample_user()]
    }))));
    assert_eq!(api.get_user_by_telegram_id(1).await.unwrap().len(), 2);

    let api = RemnaWaveApi::with_transport(FakeTransport::new(Ok(json!({
      "response": {"users": [sample_user()], "total": 1}
    }))));
    assert_eq!(api.get_user_by_telegram_id(1).await.unwrap().len(), 1);

    let api = RemnaWaveApi::with_transport(FakeTransport::new(Ok(json!({"response": []}))));
    assert!(api.get_user_by_username("nobody").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn unrelated_errors_propagate() {
    let err = RemnaWaveApiError::new("Internal server error").with_status(500);
    let api = RemnaWaveApi::with_transport(FakeTransport::new(Err(err)));
    let got = api.get_user_by_telegram_id(1).await.unwrap_err();
    assert_eq!(got.status_code, Some(500));
  }

  #[tokio::test]
  async fn malformed_user_is_an_error() {
    let api = RemnaWaveApi::with_transport(FakeTransport::new(Ok(json!({"response": {"uuid": 5}}))));
    let err = api.get_user_by_uuid("x").await.unwrap_err();
    assert!(err.message.starts_with("invalid user payload"));
  }
}
