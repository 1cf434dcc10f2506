use std::net::SocketAddr;

use tracing::{error, info};

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total requests handled. Labels: op, status.
pub const REQUESTS_TOTAL: &str = "editbay_requests_total";

/// Histogram: request latency in seconds. Labels: op.
pub const REQUEST_DURATION_SECONDS: &str = "editbay_request_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "editbay_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "editbay_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "editbay_connections_rejected_total";

// ── Engine ──────────────────────────────────────────────────────

/// Counter: conflict detector runs. Labels: outcome (unchecked, clear, conflict, on_leave).
pub const CONFLICT_CHECKS_TOTAL: &str = "editbay_conflict_checks_total";

/// Counter: bookings committed by create.
pub const BOOKINGS_CREATED_TOTAL: &str = "editbay_bookings_created_total";

/// Counter: series dates left out under the skip policy.
pub const SERIES_DATES_SKIPPED_TOTAL: &str = "editbay_series_dates_skipped_total";

/// Counter: journal rewrites.
pub const JOURNAL_COMPACTIONS_TOTAL: &str = "editbay_journal_compactions_total";

/// Counter: journal rewrites that failed. The commit that triggered them still stands.
pub const JOURNAL_COMPACTION_FAILURES_TOTAL: &str = "editbay_journal_compaction_failures_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => info!("metrics endpoint: http://0.0.0.0:{port}/metrics"),
        Err(e) => error!("failed to install Prometheus metrics exporter: {e}"),
    }
}
