use std::sync::OnceLock;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )?
        .install_recorder()?;
    let _ = PROM_HANDLE.set(handle);

    metrics::describe_counter!(
        "exam_sessions_started_total",
        "Exam sessions successfully started"
    );
    metrics::describe_counter!(
        "exam_submissions_total",
        "Graded submissions by trigger (manual, timer, integrity)"
    );
    metrics::describe_counter!(
        "exam_sessions_swept_total",
        "Expired sessions submitted by the background sweep"
    );
    metrics::describe_counter!("exam_violations_total", "Integrity violation reports by kind");

    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
