use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // Counters
    pub publish_total: IntCounterVec,
    pub dispatch_total: IntCounterVec,

    // Histograms
    pub dispatch_duration_seconds: HistogramVec,

    // Dependency gauges
    pub dep_up: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let publish_total = IntCounterVec::new(
            Opts::new("producer_publish_total", "Broker publish attempts"),
            &["operation", "result"], // success|topology_error|encode_error|broker_error|timeout
        )
        .expect("metric");

        let dispatch_total = IntCounterVec::new(
            Opts::new("producer_dispatch_total", "Dispatched requests by outcome"),
            &["operation", "outcome"], // success|invalid|failure|timeout|aborted
        )
        .expect("metric");

        let dispatch_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "producer_dispatch_duration_seconds",
                "Time from request receipt to response",
            ),
            &["operation"],
        )
        .expect("metric");

        let dep_up = IntGaugeVec::new(
            Opts::new("producer_dep_up", "Dependency up gauge"),
            &["dep"], // amqp
        )
        .expect("metric");

        registry
            .register(Box::new(publish_total.clone()))
            .expect("metric");
        registry
            .register(Box::new(dispatch_total.clone()))
            .expect("metric");
        registry
            .register(Box::new(dispatch_duration_seconds.clone()))
            .expect("metric");
        registry.register(Box::new(dep_up.clone())).expect("metric");

        Self {
            registry,
            publish_total,
            dispatch_total,
            dispatch_duration_seconds,
            dep_up,
        }
    }

    pub fn render(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&mf, &mut buf).map_err(|e| e.to_string())?;
        String::from_utf8(buf).map_err(|e| e.to_string())
    }

    pub fn timer() -> Instant {
        Instant::now()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
