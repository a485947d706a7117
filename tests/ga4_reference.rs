#![cfg(not(target_arch = "wasm32"))]

use std::sync::Arc;

use ga4_bridge::ga4::{DataLayer, Ga4, InitOptions, QueueMode};
use serde_json::{json, Value};

fn session() -> (Ga4, Arc<DataLayer>) {
    let layer = Arc::new(DataLayer::new());
    let ga = Ga4::new(layer.clone());
    ga.initialize(
        "G-REFERENCE",
        InitOptions::default().with_legacy_dimension_metric(false),
    )
    .expect("initialize");
    layer.clear();
    (ga, layer)
}

#[test]
fn pageview_shapes_agree() {
    let (ga, layer) = session();
    ga.send(json!({"hitType": "pageview", "page": "/path", "title": "Title"}));
    ga.ga(
        "send",
        [json!("pageview"), json!("/path"), json!({"title": "Title"})],
    );
    ga.send(json!("pageview"));

    let expected = vec![
        json!("event"),
        json!("page_view"),
        json!({"page_path": "/path", "page_title": "Title"}),
    ];
    let entries = layer.entries();
    assert_eq!(entries[0], expected);
    assert_eq!(entries[1], expected);
    assert_eq!(entries[2], vec![json!("event"), json!("page_view")]);
}

#[test]
fn web_vitals_event_keeps_metric_parameters() {
    let (ga, layer) = session();
    ga.send(json!({
        "hitType": "event",
        "eventCategory": "Web Vitals",
        "eventAction": "LCP",
        "eventValue": 2500,
        "eventLabel": "v3-1700000000000-123",
        "nonInteraction": true,
        "metric_rating": "good",
    }));

    assert_eq!(
        layer.entries(),
        vec![vec![
            json!("event"),
            json!("LCP"),
            json!({
                "event_category": "Web Vitals",
                "event_label": "v3-1700000000000-123",
                "value": 2500,
                "non_interaction": true,
                "metric_rating": "good",
            }),
        ]]
    );
}

#[test]
fn unsupported_hits_are_dropped_without_disturbing_the_queue() {
    let (ga, layer) = session();
    for hit in ["screenview", "transaction", "item", "social", "exception", "bogus"] {
        ga.send(Value::from(hit));
    }
    ga.ga("linker:autoLink", [json!(["example.com"])]);
    ga.event("still_flowing", None);

    assert_eq!(layer.entries(), vec![vec![json!("event"), json!("still_flowing")]]);
    assert_eq!(ga.mode(), QueueMode::Idle);
}

#[tokio::test(flavor = "current_thread")]
async fn identity_wait_preserves_issue_order() {
    let layer = Arc::new(DataLayer::new().with_client_id("cid-1"));
    let ga = Ga4::new(layer.clone());
    ga.initialize(
        "G-REFERENCE",
        InitOptions::default().with_legacy_dimension_metric(false),
    )
    .expect("initialize");
    layer.clear();

    let first = ga.ga_ready(|_| {});
    let second = ga.ga_ready(|_| {});
    ga.event("after_both", None);

    assert_eq!(first.await.expect("first").client_id(), "cid-1");
    assert_eq!(second.await.expect("second").client_id(), "cid-1");

    let commands: Vec<Value> = layer.entries().into_iter().map(|call| call[0].clone()).collect();
    assert_eq!(commands, vec![json!("get"), json!("get"), json!("event")]);
    assert!(!ga.is_queuing());
}

#[test]
fn sessions_do_not_share_queues() {
    let first = Ga4::new(Arc::new(DataLayer::new()));
    let second = Ga4::new(Arc::new(DataLayer::new()));
    first
        .initialize("G-FIRST", InitOptions::default().with_test_mode(true))
        .expect("initialize");
    first.event("pending", None);

    assert_eq!(first.pending_len(), 3);
    assert_eq!(second.pending_len(), 0);
    assert!(!second.is_initialized());
}
