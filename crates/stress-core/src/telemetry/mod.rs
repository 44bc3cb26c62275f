//! Logging and metrics
//!
//! - `init_tracing` installs the JSON `tracing` subscriber used by every
//!   function binary
//! - `metrics` holds the Prometheus counters for invocations and predictions

pub mod metrics;

pub use metrics::{FunctionMetrics, Outcome};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the JSON log subscriber, honouring `RUST_LOG` (default `info`)
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(function: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).json())
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(function = %function, version = crate::VERSION, "Function initialized");
    }
}
