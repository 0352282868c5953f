//! Tracing subscriber setup for the server binary

use tracing::warn;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "concierge=info,sqlx=warn,warn";
const VERBOSE_FILTER: &str = "concierge=debug,tower_http=debug,sqlx=warn,info";

/// Filter directives to use; `RUST_LOG` wins when set
pub fn filter_directives(verbose: bool) -> String {
  match std::env::var("RUST_LOG") {
    Ok(directives) if !directives.trim().is_empty() => directives,
    _ if verbose => VERBOSE_FILTER.to_string(),
    _ => DEFAULT_FILTER.to_string(),
  }
}

/// Install the global fmt subscriber.
///
/// Returns false when a subscriber was already installed; the existing one
/// keeps receiving events and the failure is reported through it.
pub fn init(verbose: bool) -> bool {
  let filter = EnvFilter::new(filter_directives(verbose));
  match tracing_subscriber::registry().with(fmt::layer()).with(filter).try_init() {
    Ok(()) => true,
    Err(e) => {
      warn!(error = %e, "tracing subscriber already installed, keeping it");
      false
    }
  }
}
