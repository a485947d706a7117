use serde::Deserialize;
use serde_json::Value;

use crate::ga4::call::Params;
use crate::ga4::error::{invalid_argument, Ga4Result};

/// Configuration for one measurement target.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitConfig {
    pub tracking_id: String,
    /// analytics.js-named options, mapped to gtag names before they are sent.
    #[serde(default)]
    pub ga_options: Option<Params>,
    /// gtag-named options, sent as-is.
    #[serde(default)]
    pub gtag_options: Option<Params>,
}

impl InitConfig {
    pub fn new(tracking_id: impl Into<String>) -> Self {
        Self {
            tracking_id: tracking_id.into(),
            ..Default::default()
        }
    }

    pub fn with_ga_options(mut self, options: Params) -> Self {
        self.ga_options = Some(options);
        self
    }

    pub fn with_gtag_options(mut self, options: Params) -> Self {
        self.gtag_options = Some(options);
        self
    }
}

/// Measurement targets passed to `Ga4::initialize`: a single measurement id or a list of
/// per-target configurations.
#[derive(Clone, Debug, PartialEq)]
pub enum InitTargets {
    Single(String),
    Many(Vec<InitConfig>),
}

impl InitTargets {
    /// Expands the targets into configurations, rejecting missing measurement ids.
    pub(crate) fn into_configs(self) -> Ga4Result<Vec<InitConfig>> {
        let configs = match self {
            InitTargets::Single(id) => vec![InitConfig::new(id)],
            InitTargets::Many(configs) => configs,
        };
        if configs.is_empty() {
            return Err(invalid_argument("Require GA_MEASUREMENT_ID"));
        }
        if configs.iter().any(|config| config.tracking_id.trim().is_empty()) {
            return Err(invalid_argument(
                "Require GA_MEASUREMENT_ID: every config needs a non-empty trackingId",
            ));
        }
        Ok(configs)
    }
}

impl From<&str> for InitTargets {
    fn from(id: &str) -> Self {
        InitTargets::Single(id.to_string())
    }
}

impl From<String> for InitTargets {
    fn from(id: String) -> Self {
        InitTargets::Single(id)
    }
}

impl From<InitConfig> for InitTargets {
    fn from(config: InitConfig) -> Self {
        InitTargets::Many(vec![config])
    }
}

impl From<Vec<InitConfig>> for InitTargets {
    fn from(configs: Vec<InitConfig>) -> Self {
        InitTargets::Many(configs)
    }
}

/// Session-wide options accepted by `Ga4::initialize`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitOptions {
    /// Keeps every call in the pending queue and never talks to the transport.
    pub test_mode: bool,
    pub ga_options: Option<Params>,
    pub gtag_options: Option<Params>,
    /// Registers the 200 dimension and 200 metric slots of analytics.js in `custom_map`.
    pub legacy_dimension_metric: bool,
    /// Forwarded to the injected script tag.
    pub nonce: Option<String>,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            test_mode: false,
            ga_options: None,
            gtag_options: None,
            legacy_dimension_metric: true,
            nonce: None,
        }
    }
}

impl InitOptions {
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn with_ga_options(mut self, options: Params) -> Self {
        self.ga_options = Some(options);
        self
    }

    pub fn with_gtag_options(mut self, options: Params) -> Self {
        self.gtag_options = Some(options);
        self
    }

    pub fn with_legacy_dimension_metric(mut self, enabled: bool) -> Self {
        self.legacy_dimension_metric = enabled;
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

/// Universal Analytics style event description accepted by `Ga4::ua_event`.
///
/// The optional fields are kept as raw JSON so malformed values can be reported and skipped
/// instead of rejecting the whole event.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UaEventOptions {
    pub category: Option<String>,
    pub action: Option<String>,
    pub label: Option<String>,
    pub value: Option<Value>,
    pub non_interaction: Option<Value>,
    pub transport: Option<Value>,
    /// Remaining fields. Only `dimension*` and `metric*` entries are forwarded.
    #[serde(flatten)]
    pub extra: Params,
}

impl UaEventOptions {
    pub fn new(category: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            action: Some(action.into()),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_non_interaction(mut self, non_interaction: bool) -> Self {
        self.non_interaction = Some(Value::Bool(non_interaction));
        self
    }

    pub fn with_transport(mut self, transport: impl Into<String>) -> Self {
        self.transport = Some(Value::String(transport.into()));
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_id_expands_to_one_config() {
        let configs = InitTargets::from("G-1").into_configs().unwrap();
        assert_eq!(configs, vec![InitConfig::new("G-1")]);
    }

    #[test]
    fn missing_ids_are_rejected() {
        for targets in [
            InitTargets::from(""),
            InitTargets::Many(Vec::new()),
            InitTargets::from(vec![InitConfig::new("G-1"), InitConfig::new(" ")]),
        ] {
            let err = targets.into_configs().unwrap_err();
            assert_eq!(err.code_str(), "ga4/invalid-argument");
        }
    }

    #[test]
    fn options_deserialize_from_camel_case() {
        let options: InitOptions = serde_json::from_value(json!({
            "testMode": true,
            "gaOptions": {"cookieUpdate": false},
            "nonce": "abc",
        }))
        .unwrap();
        assert!(options.test_mode);
        assert!(options.legacy_dimension_metric);
        assert_eq!(options.nonce.as_deref(), Some("abc"));
        assert_eq!(options.ga_options.unwrap()["cookieUpdate"], json!(false));
    }

    #[test]
    fn init_configs_deserialize() {
        let configs: Vec<InitConfig> = serde_json::from_value(json!([
            {"trackingId": "G-1", "gtagOptions": {"debug_mode": true}},
            {"trackingId": "G-2"},
        ]))
        .unwrap();
        assert_eq!(configs[0].gtag_options.as_ref().unwrap()["debug_mode"], json!(true));
        assert_eq!(configs[1], InitConfig::new("G-2"));
    }

    #[test]
    fn ua_event_collects_extra_fields() {
        let options: UaEventOptions = serde_json::from_value(json!({
            "category": "c",
            "action": "a",
            "nonInteraction": true,
            "dimension2": "d2",
        }))
        .unwrap();
        assert_eq!(options.non_interaction, Some(json!(true)));
        assert_eq!(options.extra.get("dimension2"), Some(&json!("d2")));
        assert!(!options.extra.contains_key("category"));
    }
}
