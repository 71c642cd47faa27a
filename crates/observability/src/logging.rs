//! Logging system for cairn

use clap::Args;
use eyre::Context;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter directive when neither `RUST_LOG` nor `--log.filter` is set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Logging arguments.
#[derive(Debug, Args, Clone, Serialize, Deserialize)]
#[command(next_help_heading = "Logging")]
#[serde(default)]
pub struct LogArgs {
    /// Filter directives, e.g. `info,cairn_storage_redb=trace`. `RUST_LOG` takes precedence.
    #[arg(long = "log.filter", default_value = DEFAULT_LOG_FILTER)]
    pub filter: String,

    /// Emit logs as JSON lines.
    #[arg(long = "log.json")]
    pub json: bool,
}

impl Default for LogArgs {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

impl LogArgs {
    /// Build the filter: `RUST_LOG` if set, the configured directives otherwise.
    pub fn env_filter(&self) -> eyre::Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.filter)
                .wrap_err_with(|| format!("Invalid log filter {:?}", self.filter)),
        }
    }
}

/// Initialize the logging system
pub fn init_logging(args: &LogArgs) -> eyre::Result<()> {
    let env_filter = args.env_filter()?;

    let stderr_layer = fmt::Layer::new()
        .with_writer(std::io::stderr)
        .with_ansi(!args.json);

    let stderr_layer = if args.json {
        stderr_layer.json().boxed()
    } else {
        stderr_layer.boxed()
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(env_filter)
        .try_init()
        .wrap_err("Failed to install tracing subscriber")?;

    Ok(())
}
