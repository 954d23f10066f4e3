//! Prometheus metrics for credential-service.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Call once at startup.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("Metrics recorder already initialized"))?;

    Ok(())
}

/// Metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_issued() {
    counter!("credentials_issued_total").increment(1);
}

/// `outcome` is one of `success`, `invalid`, `not_found`, `error`.
pub fn record_exchange(outcome: &'static str) {
    counter!("credentials_exchanged_total", "outcome" => outcome).increment(1);
}

pub fn record_revoked(count: u64) {
    counter!("credentials_revoked_total").increment(count);
}

pub fn record_qr_render_failure() {
    counter!("credential_qr_render_failures_total").increment(1);
}
