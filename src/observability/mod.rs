//! Observability for devicedb
//!
//! Structured logging through `tracing`. Library code only emits events;
//! a binary calls `init` once at startup to install a subscriber.
//!
//! # Design Principles
//!
//! 1. Logging is read-only: no event changes what an operation does
//! 2. Process-wide state is set up once, by an explicit call
//! 3. Logs go to stderr so command output on stdout stays parseable
//!
//! Targets: `devicedb::store`, `devicedb::client`, `devicedb::check`,
//! `devicedb::scope`.

mod scope;

pub use scope::ObservationScope;

use std::fmt;
use std::io;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::store::{lock_support, LockSupport};

/// Output format of the log sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Log levels accepted in configuration
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Installs the global subscriber and reports lock support.
///
/// `RUST_LOG` takes precedence over `level`. Returns `false` when logging
/// was already set up, by this function or by someone else.
pub fn init(format: LogFormat, level: &str) -> bool {
    let mut installed = false;
    INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let registry = tracing_subscriber::registry().with(filter);
        let result = match format {
            LogFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
                .try_init(),
            LogFormat::Pretty => registry
                .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                .try_init(),
        };
        installed = result.is_ok();
    });

    match lock_support() {
        LockSupport::Available => {
            debug!(target: "devicedb::store", "Advisory file locking available")
        }
        LockSupport::Unavailable { reason } => debug!(
            target: "devicedb::store",
            reason = %reason,
            "Advisory file locking unavailable in the temp directory; database writes still attempt it"
        ),
    }

    installed
}
