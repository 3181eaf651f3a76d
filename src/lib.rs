pub mod config;
pub mod history; // Previous-shift context for the next handoff
pub mod models;
pub mod pipeline;

pub use pipeline::{HandoffPipeline, PipelineError};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `RUST_LOG` wins over
/// [`config::default_log_filter`]. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
