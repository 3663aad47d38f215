mod common;

use booking_producer::models::{
    CastAndCrew, CastMutationRequest, MovieTimeSlot, PaymentWebhookRequest, SeatsRequest,
    SendMailRequest,
};
use booking_producer::{DispatchError, PublishError};
use common::{timeouts, Harness};
use event_bus::{BrokerChannel, InMemoryBus, MutationAction};
use futures::StreamExt;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test]
async fn test_lock_seats_publishes_bare_array() {
    let harness = Harness::new();

    let response = harness
        .dispatcher
        .lock_seats(SeatsRequest {
            seat_ids: vec![4, 9, 12],
        })
        .await
        .unwrap();

    assert!(response.is_success());
    let queued = harness.bus.queued_messages("lock_seats_queue");
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].exchange, "lock_seats");
    assert_eq!(queued[0].routing_key, "lock_seats_key");
    assert_eq!(queued[0].message.body, b"[4,9,12]");
}

#[tokio::test]
async fn test_unlock_seats_uses_its_own_queue() {
    let harness = Harness::new();

    harness
        .dispatcher
        .unlock_seats(SeatsRequest { seat_ids: vec![7] })
        .await
        .unwrap();

    assert!(harness.bus.queued_messages("lock_seats_queue").is_empty());
    assert_eq!(harness.queued_json("unlock_seats_queue"), vec![serde_json::json!([7])]);
}

#[tokio::test]
async fn test_payment_outcome_selects_queue() {
    let harness = Harness::new();

    let success: PaymentWebhookRequest =
        serde_json::from_value(common::payment_webhook("pay_ok", "success")).unwrap();
    let failure: PaymentWebhookRequest =
        serde_json::from_value(common::payment_webhook("pay_bad", "failure")).unwrap();

    harness.dispatcher.payment_webhook(success).await.unwrap();
    harness.dispatcher.payment_webhook(failure).await.unwrap();

    let ok = harness.queued_json("payment_service_success");
    let bad = harness.queued_json("payment_service_failure");
    assert_eq!(ok.len(), 1);
    assert_eq!(bad.len(), 1);
    assert_eq!(ok[0]["payment_id"], "pay_ok");
    assert_eq!(bad[0]["payment_id"], "pay_bad");

    let routed = harness.bus.queued_messages("payment_service_success");
    assert_eq!(routed[0].routing_key, "payment_success_key");
}

#[tokio::test]
async fn test_payment_nullable_fields_are_null() {
    let harness = Harness::new();
    let request: PaymentWebhookRequest =
        serde_json::from_value(common::payment_webhook("pay_1", "success")).unwrap();

    harness.dispatcher.payment_webhook(request).await.unwrap();

    let body = &harness.queued_json("payment_service_success")[0];
    let object = body.as_object().unwrap();
    for key in ["card_issuing_country", "status", "metadata"] {
        assert!(object.contains_key(key), "{key} must be present");
        assert!(object[key].is_null(), "{key} must be null");
    }
    assert!(body["refunds"][0]["currency"].is_null());
    assert_eq!(body["disputes"], serde_json::json!([]));
    assert_eq!(body["product_cart"][0]["quantity"], 1);
}

#[tokio::test]
async fn test_mail_body_keys() {
    let harness = Harness::new();

    harness
        .dispatcher
        .send_mail(SendMailRequest {
            email: "guest@example.com".to_string(),
            phone_number: "+911234567890".to_string(),
        })
        .await
        .unwrap();

    let body = &harness.queued_json("send_mail_queue")[0];
    assert_eq!(
        *body,
        serde_json::json!({"Email": "guest@example.com", "Phone_number": "+911234567890"})
    );
}

#[tokio::test]
async fn test_cast_delete_carries_uid_as_ids() {
    let harness = Harness::new();

    harness
        .dispatcher
        .cast_mutation(CastMutationRequest {
            action: MutationAction::Delete,
            cast: CastAndCrew {
                uid: "cast-123".to_string(),
                kind: "cast".to_string(),
                name: "Jane Doe".to_string(),
                character: "Lead".to_string(),
                photo_url: String::new(),
                movie_id: 42,
            },
        })
        .await
        .unwrap();

    let queued = harness.bus.queued_messages("strapi_create");
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].routing_key, "cast_deletion");

    let properties = &queued[0].message.properties;
    assert_eq!(properties.message_id.as_deref(), Some("cast-123"));
    assert_eq!(properties.correlation_id.as_deref(), Some("cast-123"));

    let body: serde_json::Value = serde_json::from_slice(&queued[0].message.body).unwrap();
    assert_eq!(body["action"], "delete");
    assert_eq!(body["model"], "cast-and-crew");
    assert_eq!(body["data"]["uid"], "cast-123");
}

#[tokio::test]
async fn test_catalog_operations_share_one_queue() {
    let harness = Harness::new();
    let mut tap = harness.bus.tap();

    harness
        .dispatcher
        .cast_mutation(CastMutationRequest {
            action: MutationAction::Create,
            cast: CastAndCrew {
                uid: "crew-1".to_string(),
                kind: "crew".to_string(),
                name: "Director".to_string(),
                character: String::new(),
                photo_url: String::new(),
                movie_id: 5,
            },
        })
        .await
        .unwrap();
    harness
        .dispatcher
        .movie_time_slot_created(MovieTimeSlot {
            start_time: "2025-03-01T18:00:00Z".parse().unwrap(),
            end_time: "2025-03-01T20:30:00Z".parse().unwrap(),
            duration: 150,
            movie_id: 5,
            date: "2025-03-01T00:00:00Z".parse().unwrap(),
            movie_format: "IMAX".to_string(),
            venue_id: 2,
        })
        .await
        .unwrap();

    let first = tap.next().await.unwrap();
    let second = tap.next().await.unwrap();
    assert_eq!(first.routing_key, "cast_creation");
    assert_eq!(second.routing_key, "movie_time_slot_creation");
    assert_eq!(second.message.properties.message_id, None);

    let bodies = harness.queued_json("strapi_create");
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[1]["model"], "movie-time-slot");
    assert_eq!(bodies[1]["action"], "create");
}

#[tokio::test]
async fn test_fast_broker_answers_success() {
    let harness = Harness::with_bus(
        InMemoryBus::new().with_publish_latency(Duration::from_millis(1)),
        timeouts(10_000, 5_000),
    );

    let response = harness
        .dispatcher
        .lock_seats(SeatsRequest { seat_ids: vec![1] })
        .await
        .unwrap();

    assert_eq!(response.error, "");
}

#[tokio::test(start_paused = true)]
async fn test_stalled_broker_answers_within_deadline() {
    let bus = InMemoryBus::new();
    bus.stall_publishes();
    let harness = Harness::with_bus(bus, timeouts(10, 60_000));

    let started = Instant::now();
    let err = harness
        .dispatcher
        .send_mail(SendMailRequest {
            email: "guest@example.com".to_string(),
            phone_number: String::new(),
        })
        .await
        .unwrap_err();

    assert!(err.is_deadline(), "unexpected error: {err}");
    assert!(started.elapsed() < Duration::from_millis(20));
    assert!(harness.bus.queued_messages("send_mail_queue").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_publish_deadline_fires_before_dispatch_deadline() {
    let bus = InMemoryBus::new();
    bus.stall_publishes();
    let harness = Harness::with_bus(bus, timeouts(1_000, 100));

    let err = harness
        .dispatcher
        .lock_seats(SeatsRequest { seat_ids: vec![2] })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Publish(PublishError::DeadlineExceeded { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_late_broker_result_is_discarded() {
    let harness = Harness::with_bus(
        InMemoryBus::new().with_publish_latency(Duration::from_millis(500)),
        timeouts(10, 10_000),
    );

    let err = harness
        .dispatcher
        .lock_seats(SeatsRequest { seat_ids: vec![8] })
        .await
        .unwrap_err();
    assert!(err.is_deadline());

    // Long after the broker would have accepted it
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(harness.bus.queued_messages("lock_seats_queue").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_publish_intact_bodies() {
    let harness = Harness::new();
    let mut tasks = tokio::task::JoinSet::new();

    for i in 0..50 {
        let dispatcher = harness.dispatcher.clone();
        tasks.spawn(async move {
            dispatcher
                .lock_seats(SeatsRequest {
                    seat_ids: vec![i, i + 1000],
                })
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        assert!(result.unwrap().unwrap().is_success());
    }

    let bodies = harness.queued_json("lock_seats_queue");
    assert_eq!(bodies.len(), 50);

    let seen: HashSet<i64> = bodies
        .iter()
        .map(|body| {
            let ids = body.as_array().unwrap();
            assert_eq!(ids.len(), 2);
            let first = ids[0].as_i64().unwrap();
            assert_eq!(ids[1].as_i64().unwrap(), first + 1000);
            first
        })
        .collect();
    assert_eq!(seen, (0..50).collect());
}

#[tokio::test]
async fn test_closed_channel_surfaces_broker_failure() {
    let harness = Harness::new();
    harness.bus.close();

    let err = harness
        .dispatcher
        .unlock_seats(SeatsRequest { seat_ids: vec![1] })
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Publish(PublishError::Topology(_))));
    assert!(!err.is_deadline());
}

#[tokio::test]
async fn test_topology_conflict_does_not_poison_other_operations() {
    let bus = InMemoryBus::new().with_channel_close_on_conflict();
    bus.declare_queue("send_mail_queue", false).await.unwrap();
    let harness = Harness::with_bus(bus, timeouts(10_000, 5_000));

    let err = harness
        .dispatcher
        .send_mail(SendMailRequest {
            email: "guest@example.com".to_string(),
            phone_number: String::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(&err, DispatchError::Publish(e) if e.is_conflict()));

    let response = harness
        .dispatcher
        .lock_seats(SeatsRequest { seat_ids: vec![3] })
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(harness.bus.channel_reopens(), 1);
    assert_eq!(harness.queued_json("lock_seats_queue"), vec![serde_json::json!([3])]);
}
