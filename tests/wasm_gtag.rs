#![cfg(all(target_arch = "wasm32", feature = "wasm-web"))]

use ga4_bridge::ga4::{BrowserGtag, Ga4, InitOptions};
use js_sys::{Array, Reflect};
use serde_json::json;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn data_layer() -> Array {
    let window = web_sys::window().expect("window");
    Reflect::get(&window, &JsValue::from_str("dataLayer"))
        .expect("dataLayer")
        .into()
}

#[wasm_bindgen_test]
fn initialize_injects_script_and_pushes_calls() {
    let ga = Ga4::new(BrowserGtag::new());
    ga.initialize(
        "G-WASMTEST",
        InitOptions::default()
            .with_legacy_dimension_metric(false)
            .with_nonce("wasm-nonce"),
    )
    .expect("initialize");
    ga.event("wasm_event", None);

    let document = web_sys::window().and_then(|w| w.document()).expect("document");
    let script = document
        .query_selector("script[src*='googletagmanager.com/gtag/js']")
        .expect("query")
        .expect("script tag");
    assert_eq!(script.get_attribute("nonce").as_deref(), Some("wasm-nonce"));

    let layer = data_layer();
    assert!(layer.length() >= 3);
    let last: Array = layer.get(layer.length() - 1).into();
    assert_eq!(last.get(0).as_string().as_deref(), Some("event"));
    assert_eq!(last.get(1).as_string().as_deref(), Some("wasm_event"));
}

#[wasm_bindgen_test]
fn set_forwards_mapped_fields() {
    let ga = Ga4::new(BrowserGtag::new());
    ga.set(json!({"userId": "u-1"}));

    let layer = data_layer();
    let last: Array = layer.get(layer.length() - 1).into();
    assert_eq!(last.get(0).as_string().as_deref(), Some("set"));
    let user_id = Reflect::get(&last.get(1), &JsValue::from_str("user_id")).expect("user_id");
    assert_eq!(user_id.as_string().as_deref(), Some("u-1"));
}
