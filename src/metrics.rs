use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_all);
}

fn describe_all() {
    describe_counter!("flight_cycles_total", "Monitoring cycles started.");
    describe_counter!(
        "flight_fetch_errors_total",
        "Cycles aborted because a provider query failed."
    );
    describe_counter!(
        "flight_notifications_total",
        "Batched alerts by outcome (sent, failed, skipped)."
    );
    describe_counter!(
        "flight_baseline_updates_total",
        "Baseline updates (first record or significant change) per itinerary kind."
    );
    describe_gauge!("flight_last_cycle_ts", "Unix ts of the last evaluated cycle.");
}

/// Install the Prometheus recorder once per process and return its handle.
///
/// A second install (e.g. several routers in one test binary) reuses the first handle.
pub fn prometheus() -> Option<PrometheusHandle> {
    static HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(h) => {
                describe_all();
                Some(h)
            }
            Err(e) => {
                tracing::warn!(error = %e, "prometheus recorder not installed");
                None
            }
        })
        .clone()
}
