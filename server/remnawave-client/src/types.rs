//! Panel user model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
  Active,
  Disabled,
  Limited,
  Expired,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficLimitStrategy {
  NoReset,
  Day,
  Week,
  Month,
  CalendarMonth,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalSquad {
  pub uuid: String,
  #[serde(default)]
  pub name: String,
}

/// One panel user. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemnaWaveUser {
  pub uuid: String,
  pub short_uuid: String,
  pub username: String,
  pub status: UserStatus,
  #[serde(default)]
  pub traffic_limit_bytes: i64,
  pub traffic_limit_strategy: TrafficLimitStrategy,
  pub expire_at: DateTime<Utc>,
  #[serde(default)]
  pub subscription_url: String,
  #[serde(default)]
  pub active_internal_squads: Vec<InternalSquad>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[serde(default)]
  pub telegram_id: Option<i64>,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub hwid_device_limit: Option<u32>,
  #[serde(default)]
  pub used_traffic_bytes: Option<i64>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn parses_panel_payload() {
    let user: RemnaWaveUser = serde_json::from_value(json!({
      "uuid": "user-uuid",
      "shortUuid": "short-uuid",
      "username": "test-user",
      "status": "ACTIVE",
      "trafficLimitBytes": 0,
      "trafficLimitStrategy": "NO_RESET",
      "expireAt": "2026-01-01T00:00:00Z",
      "subscriptionUrl": "",
      "activeInternalSquads": [{"uuid": "sq-1", "name": "default"}],
      "createdAt": "2026-01-01T00:00:00Z",
      "updatedAt": "2026-01-01T00:00:00.000Z",
      "telegramId": 123456,
      "lastTrafficResetAt": null
    }))
    .unwrap();
    assert_eq!(user.status, UserStatus::Active);
    assert_eq!(user.traffic_limit_strategy, TrafficLimitStrategy::NoReset);
    assert_eq!(user.telegram_id, Some(123456));
    assert_eq!(user.active_internal_squads[0].name, "default");
    assert_eq!(user.expire_at.to_rfc3339(), "2026-01-01T00:00:00+00:00");
  }

  #[test]
  fn unknown_enum_values_do_not_break_parsing() {
    let status: UserStatus = serde_json::from_value(json!("ON_HOLD")).unwrap();
    assert_eq!(status, UserStatus::Unknown);
  }
}
