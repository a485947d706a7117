//! Normalization of analytics.js commands into gtag calls.
//!
//! analytics.js accepts both positional arguments (`send`, `event`, category, action, ...) and a
//! single fields object (`send`, `{hitType: "event", eventCategory: ...}`). Both shapes end up as
//! the same gtag call.

use serde_json::Value;

use crate::ga4::call::{EventCallback, GtagCall, Params};
use crate::ga4::config::UaEventOptions;
use crate::ga4::constants::{TRANSPORT_HINTS, UNSUPPORTED_HIT_TYPES};
use crate::ga4::error::{malformed_input, Ga4Result};
use crate::ga4::format::format_label;
use crate::ga4::mapper::{is_truthy, FieldMap};

/// Translates one analytics.js command. `hit_callback` becomes the `event_callback` of the
/// resulting call.
pub(crate) fn translate(
    field_map: &FieldMap,
    command: &str,
    args: &[Value],
    hit_callback: Option<EventCallback>,
) -> Ga4Result<GtagCall> {
    let call = match command {
        "send" => translate_send(field_map, args)?,
        "set" => translate_set(field_map, args)?,
        other => return Err(malformed_input(format!("Command doesn't exist: {other}"))),
    };

    Ok(match hit_callback {
        Some(callback) => call.with_arg(callback),
        None => call,
    })
}

// https://developers.google.com/analytics/devguides/collection/analyticsjs/command-queue-reference#send
fn translate_send(field_map: &FieldMap, args: &[Value]) -> Ga4Result<GtagCall> {
    let hit_type = match args.first() {
        Some(Value::String(hit_type)) => Some(hit_type.as_str()),
        Some(Value::Object(fields)) => fields.get("hitType").and_then(Value::as_str),
        _ => None,
    };

    match hit_type {
        Some("event") => Ok(send_event_parameters(field_map, args)),
        Some("pageview") => Ok(send_pageview_parameters(field_map, args)),
        Some("timing") => Ok(send_timing_parameters(args)),
        Some(hit_type) if UNSUPPORTED_HIT_TYPES.contains(&hit_type) => Err(malformed_input(
            format!("Unsupported send command: {hit_type}"),
        )),
        Some(hit_type) => Err(malformed_input(format!(
            "Send command doesn't exist: {hit_type}"
        ))),
        None => Err(malformed_input("Send command requires a hit type")),
    }
}

fn send_event_parameters(field_map: &FieldMap, args: &[Value]) -> GtagCall {
    match args.first() {
        Some(Value::Object(fields)) => {
            let mut rest = fields.clone();
            let category = rest.remove("eventCategory");
            let action = rest.remove("eventAction");
            let label = rest.remove("eventLabel");
            let value = rest.remove("eventValue");
            rest.remove("hitType");
            send_event(
                field_map,
                category.as_ref(),
                action.as_ref(),
                label.as_ref(),
                value.as_ref(),
                Some(&rest),
            )
        }
        _ => send_event(
            field_map,
            args.get(1),
            args.get(2),
            args.get(3),
            args.get(4),
            args.get(5).and_then(Value::as_object),
        ),
    }
}

fn send_event(
    field_map: &FieldMap,
    category: Option<&Value>,
    action: Option<&Value>,
    label: Option<&Value>,
    value: Option<&Value>,
    fields: Option<&Params>,
) -> GtagCall {
    let mut params = Params::new();
    insert_present(&mut params, "event_category", category);
    insert_present(&mut params, "event_label", label);
    insert_present(&mut params, "value", value);

    if let Some(fields) = fields {
        if let Some(non_interaction) = fields.get("nonInteraction") {
            params.insert("non_interaction".into(), non_interaction.clone());
        }
        if let Some(mapped) = field_map.to_gtag_options(Some(fields)) {
            params.extend(mapped);
        }
    }

    GtagCall::new([
        Value::from("event"),
        action.cloned().unwrap_or(Value::Null),
        Value::Object(params),
    ])
}

fn send_pageview_parameters(field_map: &FieldMap, args: &[Value]) -> GtagCall {
    match args.first() {
        Some(Value::Object(fields)) => {
            let mut rest = fields.clone();
            let page = rest.remove("page");
            rest.remove("hitType");
            send_pageview(field_map, page.as_ref(), Some(&rest))
        }
        _ => send_pageview(field_map, args.get(1), args.get(2).and_then(Value::as_object)),
    }
}

// https://developers.google.com/gtagjs/reference/event#page_view
fn send_pageview(field_map: &FieldMap, page: Option<&Value>, fields: Option<&Params>) -> GtagCall {
    let page = page.filter(|page| is_truthy(page));

    match fields.filter(|fields| !fields.is_empty()) {
        Some(fields) => {
            let mut rest = field_map.to_gtag_options(Some(fields)).unwrap_or_default();
            let title = rest.remove("title");
            let location = rest.remove("location");

            let mut params = Params::new();
            if let Some(page) = page {
                params.insert("page_path".into(), page.clone());
            }
            if let Some(title) = title.filter(is_truthy) {
                params.insert("page_title".into(), title);
            }
            if let Some(location) = location.filter(is_truthy) {
                params.insert("page_location".into(), location);
            }
            params.extend(rest);

            GtagCall::new([
                Value::from("event"),
                Value::from("page_view"),
                Value::Object(params),
            ])
        }
        None => match page {
            Some(page) => {
                let mut params = Params::new();
                params.insert("page_path".into(), page.clone());
                GtagCall::new([
                    Value::from("event"),
                    Value::from("page_view"),
                    Value::Object(params),
                ])
            }
            None => GtagCall::new(["event", "page_view"]),
        },
    }
}

fn send_timing_parameters(args: &[Value]) -> GtagCall {
    match args.first() {
        Some(Value::Object(fields)) => send_timing(
            fields.get("timingCategory"),
            fields.get("timingVar"),
            fields.get("timingValue"),
            fields.get("timingLabel"),
        ),
        _ => send_timing(args.get(1), args.get(2), args.get(3), args.get(4)),
    }
}

fn send_timing(
    category: Option<&Value>,
    variable: Option<&Value>,
    value: Option<&Value>,
    label: Option<&Value>,
) -> GtagCall {
    let mut params = Params::new();
    insert_present(&mut params, "name", variable);
    insert_present(&mut params, "value", value);
    insert_present(&mut params, "event_category", category);
    insert_present(&mut params, "event_label", label);

    GtagCall::new([
        Value::from("event"),
        Value::from("timing_complete"),
        Value::Object(params),
    ])
}

fn translate_set(field_map: &FieldMap, args: &[Value]) -> Ga4Result<GtagCall> {
    let fields = match args.first() {
        Some(Value::String(key)) => {
            let mut fields = Params::new();
            fields.insert(key.clone(), args.get(1).cloned().unwrap_or(Value::Null));
            fields
        }
        Some(Value::Object(fields)) => fields.clone(),
        _ => {
            return Err(malformed_input(
                "Expected `fieldsObject` arg to be an Object",
            ))
        }
    };

    let mapped = field_map.to_gtag_options(Some(&fields)).unwrap_or_default();
    Ok(GtagCall::new([Value::from("set"), Value::Object(mapped)]))
}

/// Validates a Universal Analytics style event and builds the fields object of its `send`
/// command. Problems with optional fields are reported and the field skipped.
pub(crate) fn ua_event_fields(options: UaEventOptions) -> Ga4Result<Params> {
    let UaEventOptions {
        category,
        action,
        label,
        value,
        non_interaction,
        transport,
        extra,
    } = options;

    let category = category.filter(|category| !category.is_empty());
    let action = action.filter(|action| !action.is_empty());
    let (Some(category), Some(action)) = (category, action) else {
        return Err(malformed_input(
            "args.category AND args.action are required in event()",
        ));
    };

    let mut fields = Params::new();
    fields.insert("hitType".into(), Value::from("event"));
    fields.insert("eventCategory".into(), Value::from(format_label(&category)));
    fields.insert("eventAction".into(), Value::from(format_label(&action)));

    if let Some(label) = label.filter(|label| !label.is_empty()) {
        fields.insert("eventLabel".into(), Value::from(format_label(&label)));
    }

    match value {
        Some(value @ Value::Number(_)) => {
            fields.insert("eventValue".into(), value);
        }
        Some(_) => log::warn!("Expected `args.value` arg to be a Number."),
        None => {}
    }

    match non_interaction {
        Some(flag @ Value::Bool(_)) => {
            fields.insert("nonInteraction".into(), flag);
        }
        Some(_) => log::warn!("`args.nonInteraction` must be a boolean."),
        None => {}
    }

    match transport {
        Some(Value::String(transport)) => {
            if !TRANSPORT_HINTS.contains(&transport.as_str()) {
                log::warn!(
                    "`args.transport` must be either one of these values: `beacon`, `xhr` or `image`"
                );
            }
            fields.insert("transport".into(), Value::String(transport));
        }
        Some(_) => log::warn!("`args.transport` must be a string."),
        None => {}
    }

    for prefix in ["dimension", "metric"] {
        for (key, value) in extra.iter().filter(|(key, _)| key.starts_with(prefix)) {
            fields.insert(key.clone(), value.clone());
        }
    }

    Ok(fields)
}

fn insert_present(params: &mut Params, key: &str, value: Option<&Value>) {
    if let Some(value) = value.filter(|value| !value.is_null()) {
        params.insert(key.to_string(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(command: &str, args: Vec<Value>) -> Vec<Value> {
        translate(&FieldMap::default(), command, &args, None)
            .unwrap()
            .values()
    }

    fn run_err(command: &str, args: Vec<Value>) -> String {
        translate(&FieldMap::default(), command, &args, None)
            .unwrap_err()
            .message()
            .to_string()
    }

    #[test]
    fn send_pageview_without_parameters() {
        let expected = vec![json!("event"), json!("page_view")];
        assert_eq!(run("send", vec![json!({"hitType": "pageview"})]), expected);
        assert_eq!(run("send", vec![json!("pageview")]), expected);
    }

    #[test]
    fn send_pageview_shapes_agree() {
        let expected = vec![
            json!("event"),
            json!("page_view"),
            json!({"page_path": "/path", "page_title": "Title"}),
        ];
        assert_eq!(
            run("send", vec![json!({"hitType": "pageview", "page": "/path", "title": "Title"})]),
            expected
        );
        assert_eq!(
            run("send", vec![json!("pageview"), json!("/path"), json!({"title": "Title"})]),
            expected
        );
    }

    #[test]
    fn send_pageview_lifts_location_and_keeps_extra_fields() {
        assert_eq!(
            run(
                "send",
                vec![json!({
                    "hitType": "pageview",
                    "location": "https://example.com/a",
                    "userId": "u-1",
                })]
            ),
            vec![
                json!("event"),
                json!("page_view"),
                json!({"page_location": "https://example.com/a", "user_id": "u-1"}),
            ]
        );
    }

    #[test]
    fn send_timing_positional() {
        assert_eq!(
            run(
                "send",
                vec![json!("timing"), json!("DOM"), json!("first-contentful-paint"), json!(120)]
            ),
            vec![
                json!("event"),
                json!("timing_complete"),
                json!({"event_category": "DOM", "name": "first-contentful-paint", "value": 120}),
            ]
        );
    }

    #[test]
    fn send_timing_structured() {
        assert_eq!(
            run(
                "send",
                vec![json!({
                    "hitType": "timing",
                    "timingCategory": "JS",
                    "timingVar": "load",
                    "timingValue": 20,
                    "timingLabel": "CDN",
                })]
            ),
            vec![
                json!("event"),
                json!("timing_complete"),
                json!({"event_category": "JS", "name": "load", "value": 20, "event_label": "CDN"}),
            ]
        );
    }

    #[test]
    fn send_event_positional_without_action() {
        assert_eq!(
            run("send", vec![json!("event"), json!("category value")]),
            vec![json!("event"), Value::Null, json!({"event_category": "category value"})]
        );
    }

    #[test]
    fn send_event_positional_with_fields() {
        assert_eq!(
            run(
                "send",
                vec![
                    json!("event"),
                    json!("Videos"),
                    json!("play"),
                    json!("Fall Campaign"),
                    json!(42),
                    json!({"nonInteraction": true}),
                ]
            ),
            vec![
                json!("event"),
                json!("play"),
                json!({
                    "event_category": "Videos",
                    "event_label": "Fall Campaign",
                    "value": 42,
                    "non_interaction": true,
                }),
            ]
        );
    }

    #[test]
    fn send_event_structured_passes_custom_params() {
        assert_eq!(
            run(
                "send",
                vec![json!({
                    "hitType": "event",
                    "eventCategory": "Web Vitals",
                    "eventAction": "CLS",
                    "eventLabel": "v2-1",
                    "nonInteraction": true,
                    "value": 12340,
                    "metric_id": "v2-1",
                    "metric_value": 1,
                    "metric_delta": 12.34,
                })]
            ),
            vec![
                json!("event"),
                json!("CLS"),
                json!({
                    "event_category": "Web Vitals",
                    "event_label": "v2-1",
                    "metric_delta": 12.34,
                    "metric_id": "v2-1",
                    "metric_value": 1,
                    "non_interaction": true,
                    "value": 12340,
                }),
            ]
        );
    }

    #[test]
    fn unsupported_and_unknown_hits_are_rejected() {
        assert_eq!(
            run_err("send", vec![json!("screenview")]),
            "Unsupported send command: screenview"
        );
        assert_eq!(
            run_err("send", vec![json!({"hitType": "social"})]),
            "Unsupported send command: social"
        );
        assert_eq!(
            run_err("send", vec![json!("bogus")]),
            "Send command doesn't exist: bogus"
        );
        assert_eq!(run_err("send", vec![]), "Send command requires a hit type");
        assert_eq!(run_err("require", vec![json!("ec")]), "Command doesn't exist: require");
    }

    #[test]
    fn set_key_value_pair() {
        assert_eq!(
            run("set", vec![json!("page"), json!("/about")]),
            vec![json!("set"), json!({"page_path": "/about"})]
        );
        assert_eq!(
            run("set", vec![json!("dimension1")]),
            vec![json!("set"), json!({"dimension1": null})]
        );
    }

    #[test]
    fn set_rejects_non_objects() {
        assert_eq!(
            run_err("set", vec![json!(3)]),
            "Expected `fieldsObject` arg to be an Object"
        );
    }

    #[test]
    fn hit_callback_is_appended() {
        let call = translate(
            &FieldMap::default(),
            "send",
            &[json!("pageview")],
            Some(EventCallback::new(|| {})),
        )
        .unwrap();
        assert!(call.has_event_callback());
        assert_eq!(call.values(), vec![json!("event"), json!("page_view")]);
    }

    #[test]
    fn ua_event_requires_category_and_action() {
        let err = ua_event_fields(UaEventOptions {
            category: Some("c".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.code_str(), "ga4/malformed-input");
        assert!(ua_event_fields(UaEventOptions::new("", "a")).is_err());
    }

    #[test]
    fn ua_event_formats_labels_and_filters_extras() {
        let fields = ua_event_fields(
            UaEventOptions::new("category value", "action value")
                .with_label("label value")
                .with_value(0)
                .with_non_interaction(true)
                .with_extra("id", "id value")
                .with_extra("dimension2", "dimension2 value")
                .with_extra("metric2", "metric2 value"),
        )
        .unwrap();
        assert_eq!(
            Value::Object(fields),
            json!({
                "hitType": "event",
                "eventCategory": "Category Value",
                "eventAction": "Action Value",
                "eventLabel": "Label Value",
                "eventValue": 0,
                "nonInteraction": true,
                "dimension2": "dimension2 value",
                "metric2": "metric2 value",
            })
        );
    }

    #[test]
    fn ua_event_skips_malformed_optional_fields() {
        let fields = ua_event_fields(UaEventOptions {
            value: Some(json!("ten")),
            non_interaction: Some(json!("yes")),
            transport: Some(json!(1)),
            ..UaEventOptions::new("c", "a")
        })
        .unwrap();
        assert!(!fields.contains_key("eventValue"));
        assert!(!fields.contains_key("nonInteraction"));
        assert!(!fields.contains_key("transport"));
    }

    #[test]
    fn ua_event_passes_unknown_transport_through() {
        let options = UaEventOptions::new("c", "a").with_transport("carrier-pigeon");
        let fields = ua_event_fields(options).unwrap();
        assert_eq!(fields["transport"], json!("carrier-pigeon"));
    }
}
