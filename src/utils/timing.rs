use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

pub const TIMING_TARGET: &str = "booth.timing";

#[derive(Debug)]
pub struct OperationTimer {
    operation: String,
    session_id: Option<String>,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    status: String,
    detail: Option<String>,
    completed: bool,
}

impl OperationTimer {
    pub fn new(operation: &str, session_id: Option<&str>) -> Self {
        OperationTimer {
            operation: operation.to_string(),
            session_id: session_id.map(str::to_string),
            started_at: Utc::now(),
            started_perf: Instant::now(),
            status: "success".to_string(),
            detail: None,
            completed: false,
        }
    }

    pub fn log_received(&self) {
        info!(
            target: TIMING_TARGET,
            "event=operation_received operation={} session_id={:?} received_at={}",
            self.operation,
            self.session_id,
            self.started_at.to_rfc3339()
        );
    }

    pub fn mark_status(&mut self, status: &str, detail: Option<String>) {
        self.status = status.to_string();
        self.detail = detail;
    }

    pub fn log_completed(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        let completed_at = Utc::now();
        let duration = self.started_perf.elapsed().as_secs_f64();
        info!(
            target: TIMING_TARGET,
            "event=operation_completed operation={} session_id={:?} started_at={} completed_at={} duration_s={:.3} status={} detail={}",
            self.operation,
            self.session_id,
            self.started_at.to_rfc3339(),
            completed_at.to_rfc3339(),
            duration,
            self.status,
            self.detail.clone().unwrap_or_default()
        );
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        self.log_completed();
    }
}

pub fn start_operation_timer(operation: &str, session_id: Option<&str>) -> OperationTimer {
    let timer = OperationTimer::new(operation, session_id);
    timer.log_received();
    timer
}

pub async fn log_service_timing<T, E, F, Fut>(
    provider: &str,
    target: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    let metadata_text = metadata
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: TIMING_TARGET,
        "event=service_request provider={} target={} operation={} started_at={} metadata={}",
        provider,
        target,
        operation,
        started_at.to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let status = if result.is_ok() { "success" } else { "error" };

    let completed_at = Utc::now();
    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: TIMING_TARGET,
        "event=service_response provider={} target={} operation={} completed_at={} duration_s={:.3} status={} metadata={}",
        provider,
        target,
        operation,
        completed_at.to_rfc3339(),
        duration,
        status,
        metadata_text
    );

    result
}
