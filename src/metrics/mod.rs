use prometheus::{
    Encoder, Gauge, GaugeVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    register_gauge_vec_with_registry, register_gauge_with_registry,
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry,
};
use lazy_static::lazy_static;
use std::sync::Arc;
use std::time::Instant;

use crate::models::{Severity, TrackingTable};

pub struct MetricsRegistry {
    registry: Registry,

    // Gauge metrics
    pub severity_progress: Gauge,
    pub indicator_level: IntGauge,
    pub tracked_processes: IntGauge,
    pub tracked_seconds: GaugeVec,

    // Counter metrics
    pub alerts_total: IntCounter,
    pub cycles_total: IntCounter,
    pub sample_failures_total: IntCounter,
    pub sink_failures_total: IntCounterVec,
}

impl MetricsRegistry {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let severity_progress = register_gauge_with_registry!(
            Opts::new("cpu_watchdog_severity_progress", "Progress of the worst tracked process towards an alert (0..1)"),
            registry
        )?;

        let indicator_level = register_int_gauge_with_registry!(
            Opts::new("cpu_watchdog_indicator_level", "Discrete severity indicator step"),
            registry
        )?;

        let tracked_processes = register_int_gauge_with_registry!(
            Opts::new("cpu_watchdog_tracked_processes", "Processes currently at or above the CPU threshold"),
            registry
        )?;

        let tracked_seconds = register_gauge_vec_with_registry!(
            Opts::new("cpu_watchdog_tracked_seconds", "Seconds a process has stayed at or above the CPU threshold"),
            &["name", "pid"],
            registry
        )?;

        let alerts_total = register_int_counter_with_registry!(
            Opts::new("cpu_watchdog_alerts_total", "Alerts raised"),
            registry
        )?;

        let cycles_total = register_int_counter_with_registry!(
            Opts::new("cpu_watchdog_cycles_total", "Sampling cycles run"),
            registry
        )?;

        let sample_failures_total = register_int_counter_with_registry!(
            Opts::new("cpu_watchdog_sample_failures_total", "Cycles skipped because the process table was unavailable"),
            registry
        )?;

        let sink_failures_total = register_int_counter_vec_with_registry!(
            Opts::new("cpu_watchdog_sink_failures_total", "Failed notification or progress deliveries"),
            &["sink"],
            registry
        )?;

        Ok(Self {
            registry,
            severity_progress,
            indicator_level,
            tracked_processes,
            tracked_seconds,
            alerts_total,
            cycles_total,
            sample_failures_total,
            sink_failures_total,
        })
    }

    /// 用当前跟踪表刷新 gauge
    pub fn observe(&self, severity: &Severity, table: &TrackingTable, now: Instant) {
        self.severity_progress.set(severity.progress);
        self.indicator_level.set(severity.level as i64);
        self.tracked_processes.set(table.len() as i64);

        // 已退出的进程不保留旧标签
        self.tracked_seconds.reset();
        for entry in table.entries() {
            self.tracked_seconds
                .with_label_values(&[entry.name.as_str(), &entry.pid.to_string()])
                .set(entry.elapsed(now).as_secs_f64());
        }
    }

    pub fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

lazy_static! {
    pub static ref METRICS: Arc<MetricsRegistry> =
        Arc::new(MetricsRegistry::new().expect("metric definitions are valid"));
}
