//! Operational metrics: ingestion and evaluation counters exported over
//! Prometheus text format.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and return a handle whose
/// `render()` produces the text-exposition-format scrape body.
pub fn install_recorder() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record one `ingest` call's outcome.
pub fn record_ingestion(tool: &str, nodes_created: usize, edges_created: usize, elapsed_ms: u64) {
    counter!("sonobat_ingest_total", 1, "tool" => tool.to_string());
    counter!("sonobat_ingest_nodes_created_total", nodes_created as u64, "tool" => tool.to_string());
    counter!("sonobat_ingest_edges_created_total", edges_created as u64, "tool" => tool.to_string());
    histogram!("sonobat_ingest_duration_ms", elapsed_ms as f64, "tool" => tool.to_string());
}

/// Record one Datalog evaluation's statistics.
pub fn record_evaluation(iterations: usize, total_tuples: usize, elapsed_ms: u64, failed: bool) {
    counter!("sonobat_datalog_evaluations_total", 1);
    if failed {
        counter!("sonobat_datalog_evaluation_errors_total", 1);
    }
    histogram!("sonobat_datalog_iterations", iterations as f64);
    histogram!("sonobat_datalog_tuples", total_tuples as f64);
    histogram!("sonobat_datalog_duration_ms", elapsed_ms as f64);
}

/// Update the graph's per-kind node count gauges, called after a mutation.
pub fn record_graph_summary(counts: &std::collections::HashMap<&'static str, usize>) {
    for (kind, count) in counts {
        gauge!("sonobat_graph_nodes", *count as f64, "kind" => *kind);
    }
}
