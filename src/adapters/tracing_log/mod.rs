// Tracing log adapter - Structured logging using tracing crate

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::ports::*;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Repeated calls are harmless.
pub fn init_tracing(level: LogLevel, json_output: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("reeltrim={}", level.as_filter())));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if json_output {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Notifier that routes user-facing notices into the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogAdapter;

impl TracingLogAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for TracingLogAdapter {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!(notice = %notice.message, "notice"),
            NoticeLevel::Warning => warn!(notice = %notice.message, "notice"),
            NoticeLevel::Error => error!(notice = %notice.message, "notice"),
        }
    }
}
