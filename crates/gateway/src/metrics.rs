use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

/// Predict pipeline instruments, registered on the global meter.
///
/// Without an OTLP endpoint the global provider is a no-op and recording
/// costs nothing.
#[derive(Clone)]
pub struct PredictMetrics {
    duration: Histogram<f64>,
    requests: Counter<u64>,
    failures: Counter<u64>,
    detections: Counter<u64>,
}

impl PredictMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.05, 0.1, 0.2, 0.3, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 5.0, 10.0, 30.0, 60.0,
        ];

        Self {
            duration: meter
                .f64_histogram("predict_duration_seconds")
                .with_description("Time to serve a predict request (upload + detect + format)")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            requests: meter
                .u64_counter("predict_requests_total")
                .with_description("Total predict requests received")
                .build(),
            failures: meter
                .u64_counter("predict_failures_total")
                .with_description("Predict requests that did not return 200")
                .build(),
            detections: meter
                .u64_counter("detections_total")
                .with_description("Total detections returned")
                .build(),
        }
    }

    pub fn record_success(&self, elapsed: Duration, detections: usize) {
        self.requests.add(1, &[]);
        self.duration
            .record(elapsed.as_secs_f64(), &[KeyValue::new("outcome", "success")]);
        self.detections.add(detections as u64, &[]);
    }

    pub fn record_failure(&self, elapsed: Duration, kind: &'static str) {
        self.requests.add(1, &[]);
        self.duration
            .record(elapsed.as_secs_f64(), &[KeyValue::new("outcome", "failure")]);
        self.failures.add(1, &[KeyValue::new("kind", kind)]);
    }
}
