//! Prometheus-backed metrics registry for the conversion service.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters/gauges the Orchestrator, Pipeline and HTTP layer need.

use std::time::Duration;

use anyhow::{Context, Result};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Prometheus-backed metrics registry shared across the service.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    conversions_started_total: IntCounterVec,
    conversions_completed_total: IntCounterVec,
    conversions_failed_total: IntCounterVec,
    conversion_duration_seconds: Histogram,
    active_pipelines: IntGauge,
    progress_primary_failures_total: IntCounterVec,
    cleanup_reaped_total: IntCounterVec,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )?;
        let conversions_started_total = IntCounterVec::new(
            Opts::new("conversions_started_total", "Conversions created by format"),
            &["format"],
        )?;
        let conversions_completed_total = IntCounterVec::new(
            Opts::new(
                "conversions_completed_total",
                "Conversions that reached the completed state",
            ),
            &["format"],
        )?;
        let conversions_failed_total = IntCounterVec::new(
            Opts::new("conversions_failed_total", "Conversions that reached the failed state"),
            &["reason"],
        )?;
        let conversion_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "conversion_duration_seconds",
            "Wall-clock duration of a conversion pipeline run",
        ))?;
        let active_pipelines = IntGauge::with_opts(Opts::new(
            "active_pipelines",
            "Number of conversion pipelines currently running",
        ))?;
        let progress_primary_failures_total = IntCounterVec::new(
            Opts::new(
                "progress_primary_failures_total",
                "Primary progress cache write failures that fell back to the durable store",
            ),
            &["operation"],
        )?;
        let cleanup_reaped_total = IntCounterVec::new(
            Opts::new("cleanup_reaped_total", "Jobs reaped by the cleanup sweep"),
            &["trigger"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(conversions_started_total.clone()))?;
        registry.register(Box::new(conversions_completed_total.clone()))?;
        registry.register(Box::new(conversions_failed_total.clone()))?;
        registry.register(Box::new(conversion_duration_seconds.clone()))?;
        registry.register(Box::new(active_pipelines.clone()))?;
        registry.register(Box::new(progress_primary_failures_total.clone()))?;
        registry.register(Box::new(cleanup_reaped_total.clone()))?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                http_requests_total,
                conversions_started_total,
                conversions_completed_total,
                conversions_failed_total,
                conversion_duration_seconds,
                active_pipelines,
                progress_primary_failures_total,
                cleanup_reaped_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Increment the conversions-started counter for the requested output format.
    pub fn inc_conversion_started(&self, format: &str) {
        self.inner
            .conversions_started_total
            .with_label_values(&[format])
            .inc();
    }

    /// Increment the conversions-completed counter for the output format.
    pub fn inc_conversion_completed(&self, format: &str) {
        self.inner
            .conversions_completed_total
            .with_label_values(&[format])
            .inc();
    }

    /// Increment the conversions-failed counter, labelled by a coarse failure reason.
    pub fn inc_conversion_failed(&self, reason: &str) {
        self.inner
            .conversions_failed_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record the duration of a completed pipeline run.
    pub fn observe_conversion_duration(&self, duration: Duration) {
        self.inner
            .conversion_duration_seconds
            .observe(duration.as_secs_f64());
    }

    /// Adjust the active-pipelines gauge by the given delta.
    pub fn add_active_pipelines(&self, delta: i64) {
        self.inner.active_pipelines.add(delta);
    }

    /// Increment the primary-progress-cache-failure counter for an operation.
    pub fn inc_progress_primary_failure(&self, operation: &str) {
        self.inner
            .progress_primary_failures_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Increment the cleanup-reaped counter for a trigger (`startup` or `periodic`).
    pub fn inc_cleanup_reaped(&self, trigger: &str) {
        self.inner
            .cleanup_reaped_total
            .with_label_values(&[trigger])
            .inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn metrics_render_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/convert", 202);
        metrics.inc_conversion_started("wav");
        metrics.inc_conversion_completed("wav");
        metrics.inc_conversion_failed("timeout");
        metrics.observe_conversion_duration(Duration::from_secs(12));
        metrics.add_active_pipelines(1);
        metrics.inc_progress_primary_failure("set");
        metrics.inc_cleanup_reaped("startup");

        let rendered = metrics.render()?;
        assert!(rendered.contains("conversions_started_total"));
        assert!(rendered.contains("conversion_duration_seconds"));
        assert!(rendered.contains("cleanup_reaped_total"));
        Ok(())
    }
}
