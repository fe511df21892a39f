//! Upstream failure classification.
//!
//! The receipt API only tells us what went wrong through free-text error
//! messages, so failures are bucketed by case-insensitive substring match.
//! The phrase lists are a best guess at what upstream says; they live in one
//! table so new phrases are a data change, not a logic change.

/// HTTP-like status plus whether the same request may succeed on retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
  pub status: u16,
  pub retryable: bool,
}

impl Classification {
  pub const fn new(status: u16, retryable: bool) -> Self {
    Self { status, retryable }
  }
}

/// One row of the table: any needle matching selects the classification.
#[derive(Debug, Clone)]
pub struct Rule {
  pub needles: Vec<String>,
  pub classification: Classification,
}

impl Rule {
  pub fn new(status: u16, retryable: bool, needles: &[&str]) -> Self {
    Self {
      needles: needles.iter().map(|n| n.to_lowercase()).collect(),
      classification: Classification::new(status, retryable),
    }
  }

  fn matches(&self, message: &str) -> bool {
    self.needles.iter().any(|n| message.contains(n.as_str()))
  }
}

/// Ordered rules; first match wins, otherwise `fallback`.
#[derive(Debug, Clone)]
pub struct Classifier {
  rules: Vec<Rule>,
  fallback: Classification,
}

impl Default for Classifier {
  fn default() -> Self {
    Self::new(
      vec![
        Rule::new(
          401,
          false,
          &[
            "невер",
            "wrong password",
            "invalid password",
            "invalid credentials",
            "unauthorized",
            "auth failed",
            "401",
          ],
        ),
        Rule::new(429, true, &["429", "too many", "rate limit"]),
        Rule::new(
          504,
          true,
          &["timeout", "timed out", "connect", "connection", "network", "socket"],
        ),
      ],
      Classification::new(502, true),
    )
  }
}

impl Classifier {
  pub fn new(rules: Vec<Rule>, fallback: Classification) -> Self {
    Self { rules, fallback }
  }

  /// Append a rule; it is consulted after the existing ones.
  pub fn with_rule(mut self, rule: Rule) -> Self {
    self.rules.push(rule);
    self
  }

  pub fn classify(&self, message: &str) -> Classification {
    let msg = message.to_lowercase();
    self
      .rules
      .iter()
      .find(|r| r.matches(&msg))
      .map(|r| r.classification)
      .unwrap_or(self.fallback)
  }
}
