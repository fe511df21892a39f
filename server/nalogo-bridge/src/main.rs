//! Binary entrypoint: read one JSON object from stdin, write one to stdout.
//!
//! Exit code 0 on success, 1 on any failure. Logs go to stderr.

use std::io::{self, Read, Write};

use nalogo_bridge::{emit, run, BridgeError, Config, Fallbacks};
use tracing_subscriber::EnvFilter;

fn main() {
  init_tracing();

  let outcome = match read_stdin() {
    Ok(raw) => run(&raw, &Config::from_env(), &Fallbacks::from_env()),
    Err(e) => Err(e),
  };

  let code = match emit(&outcome, io::stdout().lock()) {
    Ok(code) => code,
    Err(e) => {
      let _ = writeln!(io::stderr(), "nalogo-bridge: write error: {}", e);
      1
    }
  };
  std::process::exit(code);
}

fn read_stdin() -> Result<String, BridgeError> {
  let mut raw = Vec::new();
  io::stdin()
    .lock()
    .read_to_end(&mut raw)
    .map_err(|e| BridgeError::validation(format!("read error: {}", e)))?;
  String::from_utf8(raw).map_err(|_| BridgeError::validation("invalid json input"))
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .with_target(false)
    .try_init();
}
