use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Central metrics registry for the auth service
pub struct MetricsRegistry {
    registry: Registry,

    // HTTP Metrics
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,

    // Auth Metrics
    pub auth_events_total: CounterVec,

    // Gatekeeper Metrics
    pub rate_limit_rejections_total: CounterVec,
    pub csrf_rejections_total: IntCounter,
    pub unauthorized_total: IntCounter,
}

impl MetricsRegistry {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        // HTTP Metrics
        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests").namespace("realvid"),
            &["method", "endpoint", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request duration")
                .namespace("realvid")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        // Auth Metrics
        let auth_events_total = CounterVec::new(
            Opts::new("auth_events_total", "Auth flow outcomes").namespace("realvid"),
            &["event", "outcome"],
        )?;
        registry.register(Box::new(auth_events_total.clone()))?;

        // Gatekeeper Metrics
        let rate_limit_rejections_total = CounterVec::new(
            Opts::new("rate_limit_rejections_total", "Requests rejected by rate limiting")
                .namespace("realvid"),
            &["policy"],
        )?;
        registry.register(Box::new(rate_limit_rejections_total.clone()))?;

        let csrf_rejections_total = IntCounter::with_opts(
            Opts::new("csrf_rejections_total", "Requests rejected for a missing or invalid CSRF token")
                .namespace("realvid"),
        )?;
        registry.register(Box::new(csrf_rejections_total.clone()))?;

        let unauthorized_total = IntCounter::with_opts(
            Opts::new("unauthorized_total", "Protected requests without a valid bearer token")
                .namespace("realvid"),
        )?;
        registry.register(Box::new(unauthorized_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            auth_events_total,
            rate_limit_rejections_total,
            csrf_rejections_total,
            unauthorized_total,
        }))
    }

    pub fn record_auth_event(&self, event: &str, outcome: &str) {
        self.auth_events_total
            .with_label_values(&[event, outcome])
            .inc();
    }

    pub fn record_rate_limited(&self, policy: &str) {
        self.rate_limit_rejections_total
            .with_label_values(&[policy])
            .inc();
    }

    pub fn record_csrf_rejection(&self) {
        self.csrf_rejections_total.inc();
    }

    pub fn record_unauthorized(&self) {
        self.unauthorized_total.inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
