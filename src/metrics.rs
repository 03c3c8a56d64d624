//! Prometheus metrics registry and instruments.
//!
//! The core only records; exposing `REGISTRY` over HTTP is up to the host.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Inbound
    pub static ref ACTIVITIES_RECEIVED: IntCounterVec = IntCounterVec::new(
        Opts::new("fediverse_activities_received_total", "Total number of inbound activity discriminators seen"),
        &["activity_type"]
    ).expect("metric can be created");
    pub static ref HANDLERS_INVOKED: IntCounterVec = IntCounterVec::new(
        Opts::new("fediverse_handlers_invoked_total", "Total number of inbox handler invocations"),
        &["activity_type", "status"]
    ).expect("metric can be created");

    // Outbound
    pub static ref REMOTE_FETCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("fediverse_remote_fetches_total", "Total number of remote object fetches"),
        &["status"]
    ).expect("metric can be created");
    pub static ref DELIVERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("fediverse_deliveries_total", "Total number of outbound activity deliveries"),
        &["status"]
    ).expect("metric can be created");

    // Errors
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("fediverse_errors_total", "Total number of errors returned to the transport"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Register all instruments with `REGISTRY`.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
            Box::new(ACTIVITIES_RECEIVED.clone()),
            Box::new(HANDLERS_INVOKED.clone()),
            Box::new(REMOTE_FETCHES_TOTAL.clone()),
            Box::new(DELIVERIES_TOTAL.clone()),
            Box::new(ERRORS_TOTAL.clone()),
        ];

        for collector in collectors {
            if let Err(error) = REGISTRY.register(collector) {
                tracing::error!(%error, "Failed to register metric");
            }
        }

        tracing::info!("Metrics registry initialized");
    });
}
