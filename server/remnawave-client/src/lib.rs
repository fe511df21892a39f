//! RemnaWave panel API client.
//!
//! Async wrapper over the panel's user lookups. The panel answers the same
//! question in several shapes and reports "no such user" as an error, so the
//! lookups here normalize both before the bot sees them.

pub mod api;
pub mod error;
pub mod transport;
pub mod types;

pub use api::RemnaWaveApi;
pub use error::RemnaWaveApiError;
pub use transport::{HttpTransport, Transport};
pub use types::{RemnaWaveUser, TrafficLimitStrategy, UserStatus};
