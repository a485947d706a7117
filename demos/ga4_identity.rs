//! Resolves the client id through `ga_ready`. Calls made while the id is pending are held back
//! and flushed, in order, right after the ready callback.

use std::sync::Arc;

use ga4_bridge::ga4::{DataLayer, Ga4, InitOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let layer = Arc::new(DataLayer::new().with_client_id("1234567890.1700000000"));
    let ga = Ga4::new(layer.clone());
    ga.initialize(
        "G-1234567890",
        InitOptions::default().with_legacy_dimension_metric(false),
    )?;
    layer.clear();

    let ready = ga.ga_ready(|tracker| {
        println!(
            "tracker ready: clientId={:?} trackingId={:?}",
            tracker.get("clientId"),
            tracker.get("trackingId")
        );
    });
    ga.event("add_to_cart", None);
    println!("queued while waiting: {}", ga.pending_len());

    let tracker = ready.await?;
    println!("resolved client id {}", tracker.client_id());

    for entry in layer.entries() {
        println!("gtag{entry:?}");
    }

    Ok(())
}
