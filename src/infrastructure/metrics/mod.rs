//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Message sends by outcome
//! - Sequence numbers consumed without a persisted message (gaps)
//! - Room cache reads served entirely from memory vs. with a store fallback
//! - Store retries and store operation latency

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Message sends by outcome ("ok", "allocation_unavailable", "persistence_error", "timeout")
pub static MESSAGES_SENT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_sent_total", "Total number of message sends").namespace("room_log"),
        &["outcome"],
    )
    .expect("Failed to create MESSAGES_SENT_TOTAL metric")
});

/// Sequence numbers allocated but not realized as a stored message
pub static SEQUENCE_GAPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sequence_gaps_total",
            "Sequence numbers consumed without a confirmed message",
        )
        .namespace("room_log"),
        &["reason"], // "not_persisted", "unconfirmed"
    )
    .expect("Failed to create SEQUENCE_GAPS_TOTAL metric")
});

/// Room cache reads
pub static CACHE_READS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cache_reads_total", "Room reads by cache result").namespace("room_log"),
        &["result"], // "hit", "fallback"
    )
    .expect("Failed to create CACHE_READS_TOTAL metric")
});

/// Store operation retries
pub static STORE_RETRIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("store_retries_total", "Retried store operations").namespace("room_log"),
        &["operation"],
    )
    .expect("Failed to create STORE_RETRIES_TOTAL metric")
});

/// Store operation duration histogram
pub static STORE_OPERATION_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];
    HistogramVec::new(
        HistogramOpts::new(
            "store_operation_duration_seconds",
            "Store operation latency in seconds",
        )
        .namespace("room_log")
        .buckets(buckets),
        &["operation"],
    )
    .expect("Failed to create STORE_OPERATION_DURATION_SECONDS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(MESSAGES_SENT_TOTAL.clone()))
        .expect("Failed to register MESSAGES_SENT_TOTAL");
    registry
        .register(Box::new(SEQUENCE_GAPS_TOTAL.clone()))
        .expect("Failed to register SEQUENCE_GAPS_TOTAL");
    registry
        .register(Box::new(CACHE_READS_TOTAL.clone()))
        .expect("Failed to register CACHE_READS_TOTAL");
    registry
        .register(Box::new(STORE_RETRIES_TOTAL.clone()))
        .expect("Failed to register STORE_RETRIES_TOTAL");
    registry
        .register(Box::new(STORE_OPERATION_DURATION_SECONDS.clone()))
        .expect("Failed to register STORE_OPERATION_DURATION_SECONDS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_send(outcome: &str) {
    MESSAGES_SENT_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_gap(reason: &str) {
    SEQUENCE_GAPS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_cache_read(result: &str) {
    CACHE_READS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_store_retry(operation: &str) {
    STORE_RETRIES_TOTAL.with_label_values(&[operation]).inc();
}

pub fn record_store_operation(operation: &str, duration_secs: f64) {
    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration_secs);
}
