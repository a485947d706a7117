use serde_json::{Map, Value};

/// Recursively merges `source` into `target`. Nested objects are merged key by key; every other
/// value in `source` (arrays included) replaces the one in `target`.
pub fn deep_merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        if key == "__proto__" {
            continue;
        }
        if let (Some(Value::Object(existing)), Value::Object(incoming)) =
            (target.get_mut(key), value)
        {
            deep_merge(existing, incoming);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Merges `layers` left to right into a fresh map; later layers take precedence.
pub fn merge_layers<'a, I>(layers: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut merged = Map::new();
    for layer in layers {
        deep_merge(&mut merged, layer);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn merges_nested_objects() {
        let mut target = object(json!({"a": {"b": 1}, "c": 2}));
        deep_merge(&mut target, &object(json!({"a": {"d": 3}})));
        assert_eq!(Value::Object(target), json!({"a": {"b": 1, "d": 3}, "c": 2}));
    }

    #[test]
    fn later_layers_win() {
        let low = object(json!({"send_page_view": false, "x": [1, 2]}));
        let high = object(json!({"send_page_view": true, "x": [3]}));
        let merged = merge_layers([&low, &high]);
        assert_eq!(Value::Object(merged), json!({"send_page_view": true, "x": [3]}));
    }

    #[test]
    fn skips_proto_keys() {
        let merged = merge_layers([&object(json!({"__proto__": {"polluted": true}}))]);
        assert!(merged.is_empty());
    }
}
