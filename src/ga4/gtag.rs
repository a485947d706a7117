//! Dispatch sinks: the boundary between the command queue and the gtag.js transport.
//!
//! A sink is fire-and-forget. It never interprets the arguments it receives beyond what is needed
//! to hand them to the transport, and it never reports failures back to the session.

use std::sync::{Arc, LazyLock, Mutex};

use url::Url;

use crate::ga4::call::GtagCall;
use crate::ga4::constants::GTAG_SCRIPT_URL;

/// Transport behind a [`Ga4`](crate::ga4::Ga4) session.
pub trait GtagSink: Send + Sync {
    /// Installs the transport for `measurement_id`. Must be idempotent.
    fn load(&self, measurement_id: &str, nonce: Option<&str>);

    /// Forwards one call to the transport.
    fn gtag(&self, call: GtagCall);
}

impl<T: GtagSink + ?Sized> GtagSink for Arc<T> {
    fn load(&self, measurement_id: &str, nonce: Option<&str>) {
        (**self).load(measurement_id, nonce);
    }

    fn gtag(&self, call: GtagCall) {
        (**self).gtag(call);
    }
}

/// The `<script>` element injected to load gtag.js.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptTag {
    pub src: String,
    pub nonce: Option<String>,
    pub is_async: bool,
}

impl ScriptTag {
    pub fn for_measurement_id(measurement_id: &str, nonce: Option<&str>) -> Self {
        Self {
            src: script_src(measurement_id),
            nonce: nonce.map(str::to_string),
            is_async: true,
        }
    }
}

pub(crate) fn script_src(measurement_id: &str) -> String {
    match Url::parse_with_params(GTAG_SCRIPT_URL, &[("id", measurement_id)]) {
        Ok(url) => url.to_string(),
        Err(err) => {
            log::warn!("failed to build gtag.js url: {err}");
            format!("{GTAG_SCRIPT_URL}?id={measurement_id}")
        }
    }
}

#[derive(Debug, Default)]
struct DataLayerState {
    script: Option<ScriptTag>,
    entries: Vec<GtagCall>,
}

/// Headless gtag host: an ordered in-memory `dataLayer`.
///
/// Used on targets without a document and as a recording transport. When configured with a
/// client id it answers `get <target> client_id` requests immediately, the way gtag.js answers
/// them from its cookie.
#[derive(Debug)]
pub struct DataLayer {
    client_id: Option<String>,
    state: Mutex<DataLayerState>,
}

impl Default for DataLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLayer {
    pub fn new() -> Self {
        Self {
            client_id: None,
            state: Mutex::new(DataLayerState::default()),
        }
    }

    /// Process-wide data layer, the counterpart of `window.dataLayer`.
    pub fn shared() -> Arc<DataLayer> {
        static INSTANCE: LazyLock<Arc<DataLayer>> = LazyLock::new(|| Arc::new(DataLayer::new()));
        INSTANCE.clone()
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// The script tag injected by the first `load`, if any.
    pub fn script(&self) -> Option<ScriptTag> {
        self.lock().script.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// JSON view of every recorded call, oldest first.
    pub fn entries(&self) -> Vec<Vec<serde_json::Value>> {
        self.lock().entries.iter().map(GtagCall::values).collect()
    }

    /// Drains the recorded calls, handing over any callbacks they still carry.
    pub fn take_entries(&self) -> Vec<GtagCall> {
        std::mem::take(&mut self.lock().entries)
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.script = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DataLayerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GtagSink for DataLayer {
    fn load(&self, measurement_id: &str, nonce: Option<&str>) {
        let mut state = self.lock();
        if state.script.is_none() {
            state.script = Some(ScriptTag::for_measurement_id(measurement_id, nonce));
        }
    }

    fn gtag(&self, mut call: GtagCall) {
        let reply = match &self.client_id {
            Some(client_id) if call.is_get() => call
                .take_client_id_reply()
                .map(|reply| (reply, client_id.clone())),
            _ => None,
        };
        self.lock().entries.push(call);
        if let Some((reply, client_id)) = reply {
            reply.resolve(client_id);
        }
    }
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub use browser::BrowserGtag;

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
mod browser {
    use std::sync::atomic::{AtomicBool, Ordering};

    use js_sys::{Array, Function, Reflect};
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};
    use web_sys::HtmlScriptElement;

    use crate::ga4::call::{GtagArg, GtagCall};
    use crate::ga4::constants::{DATA_LAYER_NAME, GTAG_FUNCTION_NAME};
    use crate::ga4::gtag::{script_src, GtagSink};

    /// gtag.js running in a browser page.
    ///
    /// `load` injects the gtag.js script tag; every call is forwarded to `window.gtag`, which is
    /// installed on demand as a function pushing its `arguments` onto `window.dataLayer`.
    #[derive(Debug, Default)]
    pub struct BrowserGtag {
        loaded: AtomicBool,
    }

    impl BrowserGtag {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl GtagSink for BrowserGtag {
        fn load(&self, measurement_id: &str, nonce: Option<&str>) {
            let Some(window) = web_sys::window() else {
                return;
            };
            let Some(document) = window.document() else {
                return;
            };
            if self.loaded.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Err(err) = inject_script(&document, measurement_id, nonce) {
                log::warn!("failed to inject gtag.js: {}", describe(&err));
            }
            if let Err(err) = install_gtag(&window) {
                log::warn!("failed to install window.gtag: {}", describe(&err));
            }
        }

        fn gtag(&self, call: GtagCall) {
            let Some(window) = web_sys::window() else {
                return;
            };
            if let Err(err) = forward(&window, call) {
                log::warn!("gtag call failed: {}", describe(&err));
            }
        }
    }

    fn inject_script(
        document: &web_sys::Document,
        measurement_id: &str,
        nonce: Option<&str>,
    ) -> Result<(), JsValue> {
        let script: HtmlScriptElement = document.create_element("script")?.dyn_into()?;
        script.set_async(true);
        script.set_src(&script_src(measurement_id));
        if let Some(nonce) = nonce {
            script.set_attribute("nonce", nonce)?;
        }
        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;
        body.append_child(&script)?;
        Ok(())
    }

    fn install_gtag(window: &web_sys::Window) -> Result<Function, JsValue> {
        let existing = Reflect::get(window, &JsValue::from_str(GTAG_FUNCTION_NAME))?;
        if let Some(function) = existing.dyn_ref::<Function>() {
            return Ok(function.clone());
        }

        let layer_key = JsValue::from_str(DATA_LAYER_NAME);
        let layer = Reflect::get(window, &layer_key)?;
        if !Array::is_array(&layer) {
            Reflect::set(window, &layer_key, &Array::new())?;
        }

        let function = Function::new_no_args(&format!(
            "window.{DATA_LAYER_NAME}.push(arguments);"
        ));
        Reflect::set(window, &JsValue::from_str(GTAG_FUNCTION_NAME), &function)?;
        Ok(function)
    }

    fn forward(window: &web_sys::Window, call: GtagCall) -> Result<(), JsValue> {
        let gtag = install_gtag(window)?;
        let args = Array::new();
        for arg in call.into_args() {
            match arg {
                GtagArg::Value(value) => {
                    args.push(&to_js(&value)?);
                }
                GtagArg::Timestamp(ts) => {
                    let millis = ts.timestamp_millis() as f64;
                    args.push(&js_sys::Date::new(&JsValue::from_f64(millis)));
                }
                GtagArg::ClientId(reply) => {
                    let callback = Closure::once_into_js(move |client_id: JsValue| {
                        reply.resolve(client_id.as_string().unwrap_or_default());
                    });
                    args.push(&callback);
                }
                GtagArg::EventCallback(hook) => {
                    let callback = Closure::once_into_js(move || hook.invoke());
                    attach_event_callback(&args, callback)?;
                }
            }
        }
        gtag.apply(&JsValue::NULL, &args)?;
        Ok(())
    }

    // gtag expects `event_callback` inside the parameter object.
    fn attach_event_callback(args: &Array, callback: JsValue) -> Result<(), JsValue> {
        let last = args.get(args.length().saturating_sub(1));
        if args.length() > 0 && last.is_object() {
            Reflect::set(&last, &JsValue::from_str("event_callback"), &callback)?;
        } else {
            let params = js_sys::Object::new();
            Reflect::set(&params, &JsValue::from_str("event_callback"), &callback)?;
            args.push(&params);
        }
        Ok(())
    }

    fn to_js(value: &serde_json::Value) -> Result<JsValue, JsValue> {
        let serialized =
            serde_json::to_string(value).map_err(|err| JsValue::from_str(&err.to_string()))?;
        js_sys::JSON::parse(&serialized)
    }

    fn describe(value: &JsValue) -> String {
        value
            .as_string()
            .or_else(|| {
                js_sys::JSON::stringify(value)
                    .ok()
                    .and_then(|text| text.as_string())
            })
            .unwrap_or_else(|| "unknown JavaScript error".to_string())
    }
}
