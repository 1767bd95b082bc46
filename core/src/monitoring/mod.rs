//! Operational observability: tracing setup and Prometheus metrics.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::{install_recorder, record_evaluation, record_graph_summary, record_ingestion};
pub use tracing_setup::{init_tracing, init_tracing_with_config, TracingConfig};
