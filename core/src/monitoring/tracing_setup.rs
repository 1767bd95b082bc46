//! Tracing and logging setup.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Initialize tracing with the default configuration.
pub fn init_tracing() {
    init_tracing_with_config(TracingConfig::default());
}

/// Initialize tracing with a custom configuration.
pub fn init_tracing_with_config(config: TracingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_level));

    let fmt_layer = fmt::layer()
        .with_span_events(config.span_events.clone())
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    let subscriber = tracing_subscriber::registry().with(env_filter).with(fmt_layer);

    if config.json_output {
        let json_layer = fmt::layer().json().with_span_events(config.span_events).with_target(true);
        subscriber.with(json_layer).init();
    } else {
        subscriber.init();
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default log level if `RUST_LOG` is not set.
    pub default_level: String,
    /// Show span events (enter, exit, close).
    pub span_events: FmtSpan,
    /// Show target module in logs.
    pub show_target: bool,
    /// Show thread IDs.
    pub show_thread_ids: bool,
    /// Show source file.
    pub show_file: bool,
    /// Show line numbers.
    pub show_line_number: bool,
    /// Output logs as JSON.
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        TracingConfig {
            default_level: "sonobat=debug,info".to_string(),
            span_events: FmtSpan::CLOSE,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// A production configuration: info-level, JSON output, no span noise.
    pub fn production() -> Self {
        TracingConfig {
            default_level: "sonobat=info,warn".to_string(),
            span_events: FmtSpan::NONE,
            json_output: true,
            ..TracingConfig::default()
        }
    }
}
