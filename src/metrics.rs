//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub relays_started: IntCounter,
    pub relays_confirmed: IntCounter,
    pub relays_failed: IntCounterVec,
    pub resubmissions: IntCounter,
    pub restarts: IntCounter,
    pub token_accounts_created: IntCounter,
    pub quote_retries: IntCounter,

    // Gauges
    pub active_relays: IntGauge,

    // Histograms
    pub relay_latency: Histogram,
    pub rpc_latency: Histogram,
    pub build_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let relays_started =
            IntCounter::with_opts(Opts::new("relays_started_total", "Relay requests accepted"))?;

        let relays_confirmed = IntCounter::with_opts(Opts::new(
            "relays_confirmed_total",
            "Relays confirmed on the destination chain",
        ))?;

        let relays_failed = IntCounterVec::new(
            Opts::new("relays_failed_total", "Relays ended by a terminal error"),
            &["category"],
        )?;

        let resubmissions = IntCounter::with_opts(Opts::new(
            "resubmissions_total",
            "Identical payload resubmissions after unconfirmed results",
        ))?;

        let restarts = IntCounter::with_opts(Opts::new(
            "pipeline_restarts_total",
            "Full pipeline restarts after connection failures",
        ))?;

        let token_accounts_created = IntCounter::with_opts(Opts::new(
            "token_accounts_created_total",
            "Associated token accounts created for receivers",
        ))?;

        let quote_retries = IntCounter::with_opts(Opts::new(
            "aggregator_quote_retries_total",
            "Swap-quote requests repeated after an empty answer",
        ))?;

        let active_relays =
            IntGauge::with_opts(Opts::new("active_relays", "Relays currently in progress"))?;

        let relay_latency = Histogram::with_opts(
            HistogramOpts::new("relay_latency_seconds", "End-to-end relay latency")
                .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        )?;

        let rpc_latency = Histogram::with_opts(
            HistogramOpts::new("rpc_latency_seconds", "RPC call latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        )?;

        let build_latency = Histogram::with_opts(
            HistogramOpts::new("build_latency_seconds", "Resolve and build latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        )?;

        registry.register(Box::new(relays_started.clone()))?;
        registry.register(Box::new(relays_confirmed.clone()))?;
        registry.register(Box::new(relays_failed.clone()))?;
        registry.register(Box::new(resubmissions.clone()))?;
        registry.register(Box::new(restarts.clone()))?;
        registry.register(Box::new(token_accounts_created.clone()))?;
        registry.register(Box::new(quote_retries.clone()))?;
        registry.register(Box::new(active_relays.clone()))?;
        registry.register(Box::new(relay_latency.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;
        registry.register(Box::new(build_latency.clone()))?;

        Ok(Self {
            registry,
            relays_started,
            relays_confirmed,
            relays_failed,
            resubmissions,
            restarts,
            token_accounts_created,
            quote_retries,
            active_relays,
            relay_latency,
            rpc_latency,
            build_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered metric in Prometheus text format
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.start.elapsed().as_secs_f64());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
