//! Bounded retry around the configure + submit pair.

use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::client::IncomeApi;
use crate::config::Config;
use crate::error::{ApiError, BridgeError};
use crate::types::Request;

/// Where the loop waits between attempts. Tests record instead of sleeping.
pub trait Sleeper {
  fn sleep(&mut self, delay: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
  fn sleep(&mut self, delay: Duration) {
    std::thread::sleep(delay);
  }
}

impl<F: FnMut(Duration)> Sleeper for F {
  fn sleep(&mut self, delay: Duration) {
    self(delay)
  }
}

/// Delay after failed attempt `attempt` (1-based): linear, capped.
pub fn backoff_delay(config: &Config, attempt: u32) -> Duration {
  config
    .backoff_step
    .saturating_mul(attempt)
    .min(config.backoff_cap)
}

/// Run configure + add_income until it succeeds, the failure is classified
/// as final, or `config.max_attempts` is used up.
pub fn submit_with_retry<A, S>(
  api: &mut A,
  request: &Request,
  config: &Config,
  sleeper: &mut S,
) -> Result<Value, BridgeError>
where
  A: IncomeApi + ?Sized,
  S: Sleeper + ?Sized,
{
  let attempts = config.max_attempts.max(1);
  let mut attempt = 1;
  loop {
    let err = match call_once(api, request) {
      Ok(value) => {
        info!(attempt, "income registered");
        return Ok(value);
      }
      Err(e) => e,
    };

    let class = config.classifier.classify(&err.message);
    if attempt >= attempts || !class.retryable {
      warn!(attempt, status = class.status, retryable = class.retryable, "giving up: {}", err);
      return Err(BridgeError::Upstream {
        message: format!(
          "nalogapi request failed: {}; timeout={:.0}s; proxy={}; attempt={}/{}",
          err,
          request.timeout.as_secs_f64(),
          request.proxy.label(),
          attempt,
          attempts
        ),
        status: class.status,
        retryable: class.retryable,
      });
    }

    let delay = backoff_delay(config, attempt);
    warn!(
      attempt,
      status = class.status,
      delay_ms = delay.as_millis() as u64,
      "attempt failed, retrying: {}",
      err
    );
    sleeper.sleep(delay);
    attempt += 1;
  }
}

fn call_once<A: IncomeApi + ?Sized>(api: &mut A, request: &Request) -> Result<Value, ApiError> {
  api.configure(&request.inn, &request.password)?;
  api.add_income(request.operation_time, request.amount, &request.name)
}
