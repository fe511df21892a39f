//! Receipt reference extraction from the upstream response.
//!
//! Upstream answers with whatever shape it likes: a bare string (usually the
//! print URL), a flat object, or something nested. Everything here is a pure
//! function over [`serde_json::Value`].

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::BridgeError;
use crate::types::Receipt;

/// Host that serves printable receipts.
pub const RECEIPT_HOST: &str = "lknpd.nalog.ru";

/// Keys whose values are receipt identifiers as issued by the API.
const TRUSTED_ID_KEYS: [&str; 3] = ["approvedReceiptUuid", "receiptUuid", "uuid"];
/// Keys that may hold a receipt URL, in preference order.
const URL_KEYS: [&str; 4] = ["receiptUrl", "printUrl", "url", "link"];

struct Patterns {
  receipt_segment: Regex,
  receipt_tail: Regex,
  uuid: Regex,
  short_token: Regex,
  long_token: Regex,
}

fn patterns() -> &'static Patterns {
  static PATTERNS: OnceLock<Patterns> = OnceLock::new();
  PATTERNS.get_or_init(|| Patterns {
    receipt_segment: Regex::new(r"/receipt/([^/]+)/").expect("static pattern"),
    receipt_tail: Regex::new(r"/receipt/([^/]+)$").expect("static pattern"),
    uuid: Regex::new(
      r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("static pattern"),
    short_token: Regex::new(r"^[A-Za-z0-9_-]{8,}$").expect("static pattern"),
    long_token: Regex::new(r"^[A-Za-z0-9_-]{16,}$").expect("static pattern"),
  })
}

/// Pull a receipt identifier out of a string.
///
/// Tries the `/receipt/<id>/` path segment, then `/receipt/<id>` at the end,
/// then a canonical UUID, then an opaque token. Tokens from `trusted` fields
/// may be as short as 8 characters; elsewhere 16 are required so that a
/// 10–12 digit INN is never mistaken for a receipt.
pub fn extract_uuid(value: &str, trusted: bool) -> Option<String> {
  let s = value.trim();
  if s.is_empty() {
    return None;
  }
  let p = patterns();

  for re in [&p.receipt_segment, &p.receipt_tail] {
    if let Some(m) = re.captures(s).and_then(|c| c.get(1)) {
      return Some(m.as_str().to_string());
    }
  }
  if p.uuid.is_match(s) || (trusted && p.short_token.is_match(s)) || p.long_token.is_match(s) {
    return Some(s.to_string());
  }
  None
}

/// Depth-first search for an identifier: trusted id keys, then URL keys,
/// then nested containers in order.
pub fn find_uuid_deep(value: &Value) -> Option<String> {
  match value {
    Value::Object(map) => {
      let direct = TRUSTED_ID_KEYS
        .iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_str))
        .find_map(|s| extract_uuid(s, true));
      if direct.is_some() {
        return direct;
      }
      let from_url = URL_KEYS
        .iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_str))
        .find_map(|s| extract_uuid(s, false));
      if from_url.is_some() {
        return from_url;
      }
      map.values().filter(|v| is_container(v)).find_map(find_uuid_deep)
    }
    Value::Array(items) => items.iter().filter(|v| is_container(v)).find_map(find_uuid_deep),
    _ => None,
  }
}

/// First string anywhere in `value` that looks like a receipt URL on [`RECEIPT_HOST`].
pub fn find_receipt_url_deep(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => {
      let s = s.trim();
      (s.contains("/receipt/") && s.contains(RECEIPT_HOST)).then(|| s.to_string())
    }
    Value::Object(map) => map.values().find_map(find_receipt_url_deep),
    Value::Array(items) => items.iter().find_map(find_receipt_url_deep),
    _ => None,
  }
}

/// Resolve `(uuid, url)` from the raw response.
///
/// Fails with a retryable 502 when no identifier can be found, or when the
/// only candidate is the taxpayer's INN (upstream sometimes hands back a
/// `/receipt/<inn>/...` URL instead of a receipt reference).
pub fn interpret(response: &Value, inn: &str) -> Result<Receipt, BridgeError> {
  let mut uuid = find_uuid_deep(response);
  let mut url = None;

  match response {
    Value::String(s) => {
      url = non_blank(s);
      if uuid.is_none() {
        uuid = extract_uuid(s, true);
      }
    }
    Value::Object(map) => {
      url = pick_first(map, &URL_KEYS).and_then(Value::as_str).and_then(non_blank);
      if uuid.is_none() {
        uuid = url.as_deref().and_then(|u| extract_uuid(u, false));
      }
    }
    _ => {}
  }

  if url.is_none() {
    url = find_receipt_url_deep(response);
  }
  if uuid.as_deref().map_or(true, |u| u == inn) {
    if let Some(found) = url.as_deref().and_then(|u| extract_uuid(u, true)) {
      uuid = Some(found);
    }
  }

  match uuid {
    None => Err(BridgeError::Receipt(format!(
      "nalogapi did not return receipt UUID: {}",
      snippet(response, 300)
    ))),
    Some(u) if u == inn => Err(BridgeError::Receipt(format!(
      "nalogapi returned INN instead of receipt UUID: {}",
      snippet(response, 200)
    ))),
    Some(u) => Ok(Receipt { uuid: u, url }),
  }
}

fn is_container(v: &Value) -> bool {
  matches!(v, Value::Object(_) | Value::Array(_))
}

fn non_blank(s: &str) -> Option<String> {
  let s = s.trim();
  (!s.is_empty()).then(|| s.to_string())
}

/// First key present with a non-null value, whatever its type.
fn pick_first<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
  keys.iter().find_map(|k| map.get(*k).filter(|v| !v.is_null()))
}

fn snippet(value: &Value, max_chars: usize) -> String {
  let text = match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  };
  if text.chars().count() > max_chars {
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
  } else {
    text
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  const INN: &str = "771234567890";
  const UUID: &str = "abc12345-def6-7890-aaaa-bbbbccccdddd";

  #[test]
  fn extract_from_receipt_paths() {
    let url = format!("https://lknpd.nalog.ru/receipt/{}/print", UUID);
    assert_eq!(extract_uuid(&url, false).as_deref(), Some(UUID));
    let url = format!("https://lknpd.nalog.ru/receipt/{}", UUID);
    assert_eq!(extract_uuid(&url, false).as_deref(), Some(UUID));
  }

  #[test]
  fn extract_plain_values() {
    assert_eq!(extract_uuid(UUID, false).as_deref(), Some(UUID));
    assert_eq!(extract_uuid("  200abcdefgh  ", true).as_deref(), Some("200abcdefgh"));
    assert_eq!(extract_uuid("200abcdefgh", false), None);
    assert_eq!(extract_uuid("200abcdefghijklmnop", false).as_deref(), Some("200abcdefghijklmnop"));
    assert_eq!(extract_uuid("short", true), None);
    assert_eq!(extract_uuid("has spaces in it ok", true), None);
    assert_eq!(extract_uuid("", true), None);
  }

  #[test]
  fn untrusted_inn_is_not_an_identifier() {
    assert_eq!(extract_uuid(INN, false), None);
    assert_eq!(extract_uuid(INN, true).as_deref(), Some(INN));
  }

  #[test]
  fn string_response_is_the_url() {
    let url = format!("https://lknpd.nalog.ru/receipt/{}/print", UUID);
    let r = interpret(&json!(url), INN).unwrap();
    assert_eq!(r.uuid, UUID);
    assert_eq!(r.url.as_deref(), Some(url.as_str()));
  }

  #[test]
  fn trusted_short_token() {
    let r = interpret(&json!({"approvedReceiptUuid": "short-token-1"}), INN).unwrap();
    assert_eq!(r.uuid, "short-token-1");
    assert_eq!(r.url, None);
  }

  #[test]
  fn flat_object_with_url_key() {
    let url = format!("https://lknpd.nalog.ru/api/v1/receipt/{}/print", UUID);
    let r = interpret(&json!({"printUrl": url, "status": "ok"}), INN).unwrap();
    assert_eq!(r.uuid, UUID);
    assert_eq!(r.url.as_deref(), Some(url.as_str()));
  }

  #[test]
  fn first_non_null_url_key_wins() {
    let r = interpret(
      &json!({"receiptUrl": null, "printUrl": "  https://lknpd.nalog.ru/receipt/tok-123456789/print ", "url": "https://x"}),
      INN,
    )
    .unwrap();
    assert_eq!(r.uuid, "tok-123456789");
    assert_eq!(r.url.as_deref(), Some("https://lknpd.nalog.ru/receipt/tok-123456789/print"));
  }

  #[test]
  fn nested_response() {
    let resp = json!({
      "data": {
        "items": [
          {"note": "n/a"},
          {"links": {"print": format!("https://lknpd.nalog.ru/receipt/{}/print", UUID)}}
        ]
      }
    });
    let r = interpret(&resp, INN).unwrap();
    assert_eq!(r.uuid, UUID);
    assert!(r.url.unwrap().contains(RECEIPT_HOST));
  }

  #[test]
  fn nested_trusted_id_is_found() {
    let resp = json!({"result": [{"receiptUuid": "rcpt_0001"}]});
    let r = interpret(&resp, INN).unwrap();
    assert_eq!(r.uuid, "rcpt_0001");
  }

  #[test]
  fn inn_string_is_rejected() {
    let e = interpret(&json!(INN), INN).unwrap_err();
    assert_eq!(e.status(), 502);
    assert!(e.retryable());
    assert!(e.to_string().starts_with("nalogapi returned INN instead of receipt UUID"));
  }

  #[test]
  fn inn_in_receipt_path_is_rejected() {
    let url = format!("https://lknpd.nalog.ru/api/v1/receipt/{}/{}/print", INN, UUID);
    let e = interpret(&json!(url), INN).unwrap_err();
    assert_eq!(e.status(), 502);
    assert!(e.to_string().contains("INN instead"));
  }

  #[test]
  fn nothing_usable() {
    for resp in [json!(null), json!({}), json!([1, 2, 3]), json!({"message": "ok"}), json!("   ")] {
      let e = interpret(&resp, INN).unwrap_err();
      assert_eq!(e.status(), 502);
      assert!(e.retryable());
      assert!(e.to_string().starts_with("nalogapi did not return receipt UUID"));
    }
  }

  #[test]
  fn long_snippets_are_truncated() {
    let resp = json!({"message": "x".repeat(1000)});
    let msg = interpret(&resp, INN).unwrap_err().to_string();
    assert!(msg.ends_with("..."));
    assert!(msg.chars().count() < 400);
  }
}
