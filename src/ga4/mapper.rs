//! Translation of analytics.js field names into gtag parameter names.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};

use serde_json::{Map, Value};

use crate::ga4::call::Params;
use crate::ga4::constants::CUSTOM_SLOT_COUNT;
use crate::ga4::error::{invalid_argument, Ga4Result};

// Field reference:
// analytics.js https://developers.google.com/analytics/devguides/collection/analyticsjs/field-reference
// gtag.js https://developers.google.com/analytics/devguides/collection/gtagjs/cookies-user-id
const DEFAULT_FIELDS: [(&str, &str); 17] = [
    ("cookieUpdate", "cookie_update"),
    ("cookieExpires", "cookie_expires"),
    ("cookieDomain", "cookie_domain"),
    ("cookieFlags", "cookie_flags"),
    ("userId", "user_id"),
    ("clientId", "client_id"),
    ("anonymizeIp", "anonymize_ip"),
    ("contentGroup1", "content_group1"),
    ("contentGroup2", "content_group2"),
    ("contentGroup3", "content_group3"),
    ("contentGroup4", "content_group4"),
    ("contentGroup5", "content_group5"),
    ("allowAdFeatures", "allow_google_signals"),
    ("allowAdPersonalizationSignals", "allow_ad_personalization_signals"),
    ("nonInteraction", "non_interaction"),
    ("page", "page_path"),
    ("hitCallback", "event_callback"),
];

static DEFAULT_FIELD_MAP: LazyLock<FieldMap> = LazyLock::new(|| FieldMap {
    fields: Arc::new(
        DEFAULT_FIELDS
            .iter()
            .map(|(legacy, gtag)| (legacy.to_string(), gtag.to_string()))
            .collect(),
    ),
});

static CUSTOM_MAP_SLOTS: LazyLock<Vec<String>> = LazyLock::new(|| {
    (1..=CUSTOM_SLOT_COUNT)
        .flat_map(|i| [format!("dimension{i}"), format!("metric{i}")])
        .collect()
});

/// Read-only table mapping legacy field names to their gtag equivalents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMap {
    fields: Arc<BTreeMap<String, String>>,
}

impl Default for FieldMap {
    fn default() -> Self {
        DEFAULT_FIELD_MAP.clone()
    }
}

impl FieldMap {
    /// Builds a custom table. Both legacy names and gtag names must be unique.
    pub fn from_pairs<I, K, V>(pairs: I) -> Ga4Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = BTreeMap::new();
        let mut targets = BTreeSet::new();
        for (legacy, gtag) in pairs {
            let legacy = legacy.into();
            let gtag = gtag.into();
            if !targets.insert(gtag.clone()) {
                return Err(invalid_argument(format!(
                    "gtag field `{gtag}` is mapped more than once"
                )));
            }
            if fields.insert(legacy.clone(), gtag).is_some() {
                return Err(invalid_argument(format!(
                    "legacy field `{legacy}` is mapped more than once"
                )));
            }
        }
        Ok(Self {
            fields: Arc::new(fields),
        })
    }

    pub fn get(&self, legacy: &str) -> Option<&str> {
        self.fields.get(legacy).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renames every known legacy key. Unknown keys and `null` values pass through unchanged.
    ///
    /// Returns `None` only when no mapping was supplied; an empty mapping yields an empty one.
    pub fn to_gtag_options(&self, fields: Option<&Params>) -> Option<Params> {
        let fields = fields?;
        let mapped = fields
            .iter()
            .map(|(key, value)| {
                let key = self.get(key).map(str::to_string).unwrap_or_else(|| key.clone());
                (key, value.clone())
            })
            .collect();
        Some(mapped)
    }
}

/// Registers the analytics.js custom dimension and metric slots in `custom_map`.
///
/// Slots that already carry a truthy value are kept. A non-object `custom_map` is replaced.
pub fn append_custom_map(mut options: Params, enabled: bool) -> Params {
    if !enabled {
        return options;
    }

    let custom_map = options
        .entry("custom_map")
        .or_insert_with(|| Value::Object(Map::new()));
    if !custom_map.is_object() {
        log::warn!("`custom_map` must be an object; replacing it with the default slot table");
        *custom_map = Value::Object(Map::new());
    }

    if let Value::Object(slots) = custom_map {
        for slot in CUSTOM_MAP_SLOTS.iter() {
            let occupied = slots.get(slot).is_some_and(is_truthy);
            if !occupied {
                slots.insert(slot.clone(), Value::String(slot.clone()));
            }
        }
    }

    options
}

/// JavaScript truthiness for JSON values.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
