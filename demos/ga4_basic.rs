//! Minimal session on the in-memory `DataLayer`: initializes one measurement id, sends a page
//! view and an event, then prints what the transport received.

use std::sync::Arc;

use ga4_bridge::ga4::{DataLayer, Ga4, InitOptions, UaEventOptions};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let layer = Arc::new(DataLayer::new());
    let ga = Ga4::new(layer.clone());

    ga.initialize(
        "G-1234567890",
        InitOptions::default().with_legacy_dimension_metric(false),
    )?;

    ga.send(json!({"hitType": "pageview", "page": "/welcome", "title": "Welcome"}));
    ga.ua_event(
        UaEventOptions::new("tutorial", "begin")
            .with_label("first steps")
            .with_value(1),
    );

    if let Some(script) = layer.script() {
        println!("Injected script: {}", script.src);
    }
    for entry in layer.entries() {
        println!("gtag{entry:?}");
    }

    Ok(())
}
