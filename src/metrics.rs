//! Pipeline metrics
//!
//! Counters and histograms for each phase of the poll loop. Recording is a
//! no-op until a recorder is installed, so tests need no setup.

use std::net::SocketAddr;
use std::time::Duration;

/// Installs the Prometheus exporter when `LOGIN_METRICS_PORT` is set.
pub fn init_metrics() {
    let port: u16 = match std::env::var("LOGIN_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        Some(p) => p,
        None => return,
    };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            tracing::info!("Prometheus exporter listening on http://{}/metrics", addr);
        }
        Err(e) => {
            tracing::warn!("Prometheus exporter install failed: {}", e);
        }
    }
}

pub struct PipelineMetrics;

impl PipelineMetrics {
    pub fn record_fetch(batch_size: usize) {
        ::metrics::counter!("login_ingest_polls_total").increment(1);
        ::metrics::histogram!("login_ingest_batch_size").record(batch_size as f64);
    }

    pub fn record_fetch_error() {
        ::metrics::counter!("login_ingest_fetch_errors_total").increment(1);
    }

    /// `outcome` is "accepted" or a rejection label.
    pub fn record_message(outcome: &'static str) {
        ::metrics::counter!("login_ingest_messages_total", "outcome" => outcome).increment(1);
    }

    pub fn record_commit(rows: usize, duration: Duration) {
        ::metrics::counter!("login_ingest_batches_total", "result" => "committed").increment(1);
        ::metrics::counter!("login_ingest_rows_persisted_total").increment(rows as u64);
        ::metrics::histogram!("login_ingest_commit_duration_seconds")
            .record(duration.as_secs_f64());
    }

    pub fn record_rollback() {
        ::metrics::counter!("login_ingest_batches_total", "result" => "rolled_back").increment(1);
    }

    pub fn set_idle(idle: Duration) {
        ::metrics::gauge!("login_ingest_idle_seconds").set(idle.as_secs_f64());
    }
}
