use anyhow::Result;
use axum::{routing::get, Router};
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tracing::info;
use vd_core::Response;

/// Prometheus metrics for the diagnostics agent.
pub struct MetricsCollector {
    registry: Arc<Registry>,

    requests_total: IntCounterVec,
    request_failures: IntCounterVec,
    archives_built: IntCounterVec,
    command_timeouts: IntCounterVec,
    archive_dir_bytes: IntGauge,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let requests_total = IntCounterVec::new(
            Opts::new("vmdiag_requests_total", "Total diagnostics requests handled"),
            &["kind"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_failures = IntCounterVec::new(
            Opts::new(
                "vmdiag_request_failures_total",
                "Requests that produced a failure response",
            ),
            &["kind", "status"],
        )?;
        registry.register(Box::new(request_failures.clone()))?;

        let archives_built = IntCounterVec::new(
            Opts::new("vmdiag_archives_built_total", "Diagnostics archives produced"),
            &["target"],
        )?;
        registry.register(Box::new(archives_built.clone()))?;

        let command_timeouts = IntCounterVec::new(
            Opts::new(
                "vmdiag_command_timeouts_total",
                "Live commands killed at the execution timeout",
            ),
            &["command"],
        )?;
        registry.register(Box::new(command_timeouts.clone()))?;

        let archive_dir_bytes = IntGauge::new(
            "vmdiag_archive_dir_bytes",
            "Bytes currently held by archives in the work directory",
        )?;
        registry.register(Box::new(archive_dir_bytes.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_failures,
            archives_built,
            command_timeouts,
            archive_dir_bytes,
        })
    }

    /// Count one finished request. Failures are additionally labelled with
    /// the short status string from the response.
    pub fn record_response(&self, kind: &str, response: &Response) {
        self.requests_total.with_label_values(&[kind]).inc();
        if !response.success {
            self.request_failures
                .with_label_values(&[kind, &response.name])
                .inc();
        }
    }

    pub fn record_archive_built(&self, target: &str) {
        self.archives_built.with_label_values(&[target]).inc();
    }

    pub fn record_command_timeout(&self, command: &str) {
        self.command_timeouts.with_label_values(&[command]).inc();
    }

    pub fn set_archive_dir_bytes(&self, bytes: u64) {
        self.archive_dir_bytes.set(bytes as i64);
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Render metrics in Prometheus text format
    pub fn render_metrics(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics collector")
    }
}

/// HTTP server for the Prometheus scrape endpoint.
pub struct MetricsServer {
    collector: Arc<MetricsCollector>,
    addr: std::net::SocketAddr,
}

impl MetricsServer {
    pub fn new(collector: Arc<MetricsCollector>, port: u16) -> Self {
        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
        Self { collector, addr }
    }

    /// Serve `/metrics` until the task is cancelled.
    pub async fn serve(self) -> Result<()> {
        let collector = self.collector.clone();

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let collector = collector.clone();
                async move {
                    match collector.render_metrics() {
                        Ok(metrics) => metrics,
                        Err(e) => format!("# Error rendering metrics: {}", e),
                    }
                }
            }),
        );

        info!(addr = %self.addr, "metrics server listening");

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_creation_succeeds() {
        assert!(MetricsCollector::new().is_ok());
    }

    #[test]
    fn responses_are_counted_with_failure_status() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_response(
            "live_command",
            &Response::ok("ping 192.0.2.1 -c 4", None),
        );
        collector.record_response(
            "file_retrieval",
            &Response {
                success: false,
                name: "Failed to find the system vm specified.".to_string(),
                detail: None,
            },
        );
        collector.record_archive_built("r-42");
        collector.record_command_timeout("ping");

        let output = collector.render_metrics().unwrap();
        assert!(output.contains("vmdiag_requests_total"));
        assert!(output.contains("vmdiag_request_failures_total"));
        assert!(output.contains("Failed to find the system vm specified."));
        assert!(output.contains("vmdiag_archives_built_total"));
        assert!(output.contains("vmdiag_command_timeouts_total"));
    }
}
