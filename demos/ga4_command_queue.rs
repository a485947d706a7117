//! Drives the session through the analytics.js command queue, with custom options per target
//! and test mode enabled so the calls can be inspected before anything is sent.

use std::sync::Arc;

use ga4_bridge::ga4::{DataLayer, Ga4, InitConfig, InitOptions};
use serde_json::{json, Map, Value};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ga = Ga4::new(Arc::new(DataLayer::new()));

    let primary = InitConfig::new("G-PRIMARY000")
        .with_ga_options(object(json!({"userId": "user-42", "anonymizeIp": true})));
    let secondary =
        InitConfig::new("G-SECONDARY0").with_gtag_options(object(json!({"debug_mode": true})));

    ga.initialize(
        vec![primary, secondary],
        InitOptions::default()
            .with_test_mode(true)
            .with_legacy_dimension_metric(false),
    )?;

    ga.ga("set", [json!("page"), json!("/pricing")])
        .ga("send", [json!("pageview")])
        .ga(
            "send",
            [json!("timing"), json!("JS Dependencies"), json!("load"), json!(3549)],
        )
        .ga("send", [json!("screenview")]);

    println!("mode: {:?}", ga.mode());
    for call in ga.pending_calls() {
        println!("pending gtag{call:?}");
    }

    Ok(())
}
