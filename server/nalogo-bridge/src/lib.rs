//! Nalogo Bridge: register a self-employed income with "Мой налог" and report
//! the receipt reference.
//!
//! One JSON instruction in, one JSON result out. The binary wires stdin and
//! stdout; everything else lives here so it can be driven as a library.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod proxy;
pub mod receipt;
pub mod retry;
pub mod timestamp;
pub mod types;
pub mod validate;

use std::io::{self, Write};

use chrono::Utc;
use tracing::info;

pub use client::{IncomeApi, NalogClient};
pub use config::{Config, Fallbacks};
pub use error::BridgeError;
pub use types::{Outcome, Output, Receipt, Request};

/// Full invocation against the real API: validate, export the proxy, submit
/// with retries, interpret the response.
pub fn run(raw: &str, config: &Config, fallbacks: &Fallbacks) -> Outcome {
  let request = validate::parse_request(raw, fallbacks, Utc::now().naive_utc(), config)?;
  proxy::apply_proxy(&request.proxy);

  let mut api = NalogClient::new(&config.api_base_url, request.timeout, &request.proxy).map_err(|e| {
    let class = config.classifier.classify(&e.message);
    BridgeError::Upstream {
      message: format!("nalogapi client init failed: {}", e),
      status: class.status,
      retryable: class.retryable,
    }
  })?;
  run_with(&mut api, &request, config, &mut retry::ThreadSleeper)
}

/// Submit an already validated request through any [`IncomeApi`].
pub fn run_with<A, S>(api: &mut A, request: &Request, config: &Config, sleeper: &mut S) -> Outcome
where
  A: IncomeApi + ?Sized,
  S: retry::Sleeper + ?Sized,
{
  info!(
    inn = %request.inn,
    amount = request.amount,
    timeout_s = request.timeout.as_secs_f64(),
    proxy = request.proxy.label(),
    "submitting income"
  );
  let response = retry::submit_with_retry(api, request, config, sleeper)?;
  let receipt = receipt::interpret(&response, &request.inn)?;
  info!(uuid = %receipt.uuid, "receipt resolved");
  Ok(receipt)
}

/// Write the single result object, flush, and return the process exit code.
pub fn emit<W: Write>(outcome: &Outcome, mut out: W) -> io::Result<i32> {
  let output = Output::from(outcome);
  serde_json::to_writer(&mut out, &output)?;
  out.flush()?;
  Ok(output.exit_code())
}
