use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use privacy::ProcessReport;

/// Request-level instruments, exported when a meter provider is installed.
#[derive(Clone)]
pub struct GatewayMetrics {
    duration: Histogram<f64>,
    students: Counter<u64>,
    unblurred: Counter<u64>,
    failures: Counter<u64>,
}

impl GatewayMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0];

        Self {
            duration: meter
                .f64_histogram("gateway_request_duration_seconds")
                .with_description("Time to decode, detect and crop one uploaded image")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            students: meter
                .u64_counter("gateway_students_total")
                .with_description("Person detections across all uploads")
                .build(),
            unblurred: meter
                .u64_counter("gateway_unblurred_crops_total")
                .with_description("Crops saved without background blur")
                .build(),
            failures: meter
                .u64_counter("gateway_failed_requests_total")
                .with_description("Uploads that returned an error")
                .build(),
        }
    }

    pub fn record_success(&self, elapsed_secs: f64, report: &ProcessReport) {
        self.duration.record(elapsed_secs, &[]);
        self.students.add(report.count as u64, &[]);
        self.unblurred.add(report.unblurred as u64, &[]);
    }

    pub fn record_failure(&self, kind: &'static str) {
        self.failures.add(1, &[KeyValue::new("kind", kind)]);
    }
}
