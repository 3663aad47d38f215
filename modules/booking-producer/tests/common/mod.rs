//! Shared helpers for booking-producer integration tests
//!
//! Every helper builds on a fresh `InMemoryBus`, so tests never share broker
//! state and need no running broker.

#![allow(dead_code)]

use axum::body::Body;
use axum::Router;
use booking_producer::{
    producer_router, AppState, DispatchTimeouts, Dispatcher, Metrics, Publisher,
};
use event_bus::{BrokerChannel, InMemoryBus};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub bus: Arc<InMemoryBus>,
    pub metrics: Metrics,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_bus(InMemoryBus::new(), DispatchTimeouts::default())
    }

    pub fn with_bus(bus: InMemoryBus, timeouts: DispatchTimeouts) -> Self {
        let bus = Arc::new(bus);
        let metrics = Metrics::new();
        let channel: Arc<dyn BrokerChannel> = bus.clone();
        let publisher = Publisher::new(channel, metrics.clone());
        let dispatcher = Dispatcher::new(publisher, metrics.clone(), timeouts);
        Self {
            bus,
            metrics,
            dispatcher,
        }
    }

    pub fn app(&self) -> Router {
        self.app_with_topology(true)
    }

    pub fn app_with_topology(&self, expose_topology: bool) -> Router {
        producer_router(AppState {
            dispatcher: self.dispatcher.clone(),
            channel: self.bus.clone(),
            metrics: self.metrics.clone(),
            expose_topology,
        })
    }

    /// Body of every message currently in `queue`, parsed as JSON
    pub fn queued_json(&self, queue: &str) -> Vec<serde_json::Value> {
        self.bus
            .queued_messages(queue)
            .into_iter()
            .map(|m| serde_json::from_slice(&m.message.body).unwrap())
            .collect()
    }
}

pub fn timeouts(dispatch_ms: u64, publish_ms: u64) -> DispatchTimeouts {
    DispatchTimeouts {
        dispatch: Duration::from_millis(dispatch_ms),
        publish: Duration::from_millis(publish_ms),
    }
}

pub async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A webhook body with every nullable field absent
pub fn payment_webhook(payment_id: &str, outcome: &str) -> serde_json::Value {
    serde_json::json!({
        "outcome": outcome,
        "payment_payload": {
            "payment_id": payment_id,
            "business_id": "biz_1",
            "brand_id": "brand_1",
            "created_at": "2025-01-01T10:00:00Z",
            "updated_at": "2025-01-01T10:05:00Z",
            "currency": "INR",
            "total_amount": 45000,
            "tax": 0,
            "settlement_amount": 45000,
            "settlement_currency": "INR",
            "settlement_tax": 0,
            "customer": {
                "customer_id": "cus_1",
                "email": "guest@example.com",
                "name": "Guest"
            },
            "billing": {
                "city": "Pune",
                "country": "IN",
                "state": "MH",
                "street": "1 MG Road",
                "zipcode": "411001"
            },
            "product_cart": [{"product_id": "seat-4", "quantity": 1}],
            "refunds": [{
                "amount": 1000,
                "created_at": "2025-01-02T00:00:00Z",
                "refund_id": "ref_1",
                "payment_id": payment_id,
                "status": "succeeded"
            }]
        }
    })
}
