use std::fmt;
use std::sync::{Arc, Weak};

use chrono::Utc;
use futures::channel::oneshot;
use serde_json::Value;

use crate::ga4::call::{ClientIdReply, EventCallback, GtagArg, GtagCall, Params};
use crate::ga4::command::{translate, ua_event_fields};
use crate::ga4::config::{InitConfig, InitOptions, InitTargets, UaEventOptions};
use crate::ga4::constants::OUTBOUND_LINK_TIMEOUT;
use crate::ga4::error::{invalid_argument, warn_recovered, Ga4Result};
use crate::ga4::format::format_label;
use crate::ga4::gtag::GtagSink;
use crate::ga4::mapper::{append_custom_map, FieldMap};
use crate::ga4::outbound::guard_with_timeout;
use crate::ga4::queue::{CommandQueue, QueueMode};
use crate::ga4::tracker::{Tracker, TrackerReady};
use crate::platform::runtime;
use crate::util::merge_layers;

/// A tracker session: accepts analytics.js and gtag style calls and forwards them, in order, to
/// a [`GtagSink`].
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct Ga4 {
    inner: Arc<Ga4Inner>,
}

struct Ga4Inner {
    queue: CommandQueue,
    field_map: FieldMap,
    multi_target: bool,
}

impl fmt::Debug for Ga4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ga4")
            .field("measurement_id", &self.inner.queue.measurement_id())
            .field("mode", &self.inner.queue.mode())
            .field("pending", &self.inner.queue.pending_len())
            .finish()
    }
}

/// Builder for [`Ga4`] sessions with a non-default field table or target policy.
pub struct Ga4Builder {
    sink: Arc<dyn GtagSink>,
    field_map: FieldMap,
    multi_target: bool,
}

impl Ga4Builder {
    /// Replaces the analytics.js to gtag field table.
    pub fn field_map(mut self, field_map: FieldMap) -> Self {
        self.field_map = field_map;
        self
    }

    /// When disabled, `initialize` configures only the first target. Enabled by default.
    pub fn multi_target(mut self, enabled: bool) -> Self {
        self.multi_target = enabled;
        self
    }

    pub fn build(self) -> Ga4 {
        Ga4 {
            inner: Arc::new(Ga4Inner {
                queue: CommandQueue::new(self.sink),
                field_map: self.field_map,
                multi_target: self.multi_target,
            }),
        }
    }
}

impl Default for Ga4 {
    /// A session on the browser's `window.gtag` on wasm with the `wasm-web` feature, and on the
    /// process-wide [`DataLayer`](crate::ga4::DataLayer) everywhere else.
    fn default() -> Self {
        #[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
        {
            Ga4::new(crate::ga4::gtag::BrowserGtag::new())
        }
        #[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
        {
            Ga4::new(crate::ga4::gtag::DataLayer::shared())
        }
    }
}

impl Ga4 {
    pub fn new(sink: impl GtagSink + 'static) -> Self {
        Self::builder(sink).build()
    }

    pub fn builder(sink: impl GtagSink + 'static) -> Ga4Builder {
        Ga4Builder {
            sink: Arc::new(sink),
            field_map: FieldMap::default(),
            multi_target: true,
        }
    }

    /// Returns the session to its freshly-created state. Pending calls are discarded and
    /// outstanding [`TrackerReady`] handles fail.
    pub fn reset(&self) {
        let discarded = self.inner.queue.reset();
        if !discarded.is_empty() {
            log::debug!("reset discarded {} pending gtag calls", discarded.len());
        }
    }

    /// Resets the session and releases this handle.
    pub fn dispose(self) {
        self.reset();
    }

    /// Configures the measurement targets and loads the transport.
    ///
    /// The first target becomes the active measurement id. Repeat calls update the test mode and
    /// flush the queue but emit no further configuration.
    pub fn initialize(
        &self,
        targets: impl Into<InitTargets>,
        options: InitOptions,
    ) -> Ga4Result<()> {
        let mut configs = targets.into().into_configs()?;
        if !self.inner.multi_target && configs.len() > 1 {
            log::warn!(
                "session is limited to a single measurement target; ignoring {} additional configs",
                configs.len() - 1
            );
            configs.truncate(1);
        }

        let measurement_id = configs
            .first()
            .map(|config| config.tracking_id.clone())
            .ok_or_else(|| invalid_argument("Require GA_MEASUREMENT_ID"))?;
        let queue = &self.inner.queue;

        let already_initialized =
            queue.prepare_initialize(measurement_id.clone(), options.test_mode);
        if !options.test_mode {
            queue.load_transport(&measurement_id, options.nonce.as_deref());
        }

        if !already_initialized {
            queue.gtag(GtagCall::new([GtagArg::from("js"), GtagArg::from(Utc::now())]));
            for config in configs {
                let params = self.config_params(&config, &options);
                queue.gtag(GtagCall::new([
                    GtagArg::from("config"),
                    GtagArg::from(config.tracking_id),
                    GtagArg::from(params),
                ]));
            }
        }

        queue.mark_initialized();
        if !options.test_mode {
            queue.resume();
        }
        Ok(())
    }

    fn config_params(&self, config: &InitConfig, options: &InitOptions) -> Params {
        let empty = Params::new();
        let ga_options = merge_layers([
            options.ga_options.as_ref().unwrap_or(&empty),
            config.ga_options.as_ref().unwrap_or(&empty),
        ]);
        let mapped = self
            .inner
            .field_map
            .to_gtag_options(Some(&ga_options))
            .unwrap_or_default();

        let mut defaults = Params::new();
        defaults.insert("send_page_view".into(), Value::Bool(false));

        let params = merge_layers([
            &defaults,
            &mapped,
            options.gtag_options.as_ref().unwrap_or(&empty),
            config.gtag_options.as_ref().unwrap_or(&empty),
        ]);
        append_custom_map(params, options.legacy_dimension_metric)
    }

    /// Raw gtag call, subject to the same ordering as every other entry point.
    pub fn gtag(&self, call: GtagCall) {
        self.inner.queue.gtag(call);
    }

    /// `set` with an analytics.js fields object.
    pub fn set(&self, fields: Value) {
        match &fields {
            Value::Null => {
                log::warn!("`fieldsObject` is required in .set()");
                return;
            }
            Value::Object(map) if map.is_empty() => {
                log::warn!("empty `fieldsObject` given to .set()");
            }
            Value::Object(_) => {}
            _ => {
                log::warn!("Expected `fieldsObject` arg to be an Object");
                return;
            }
        }
        self.dispatch("set", &[fields], None);
    }

    /// `send` with either a hit type or a fields object carrying `hitType`.
    pub fn send(&self, fields_or_hit_type: Value) {
        self.dispatch("send", &[fields_or_hit_type], None);
    }

    /// Direct gtag event. Parameters are sent as given.
    pub fn event(&self, name: &str, params: Option<Params>) {
        let call = match params {
            Some(params) => GtagCall::new([
                Value::from("event"),
                Value::from(name),
                Value::Object(params),
            ]),
            None => GtagCall::new(["event", name]),
        };
        self.inner.queue.gtag(call);
    }

    /// Universal Analytics style event, routed as a structured `send`.
    pub fn ua_event(&self, options: UaEventOptions) {
        match ua_event_fields(options) {
            Ok(fields) => self.dispatch("send", &[Value::Object(fields)], None),
            Err(err) => warn_recovered(&err),
        }
    }

    /// analytics.js command queue entry point, e.g. `ga.ga("send", [json!("pageview")])`.
    ///
    /// Unknown or malformed commands are reported through `log` and dropped.
    pub fn ga<I>(&self, command: &str, args: I) -> &Self
    where
        I: IntoIterator<Item = Value>,
    {
        let args: Vec<Value> = args.into_iter().collect();
        self.dispatch(command, &args, None);
        self
    }

    /// analytics.js ready callback (`ga(function (tracker) { ... })`).
    ///
    /// Requests the client id of the active target. Every call made after this one is held back
    /// until the client id arrives; then `ready` runs and the held calls are flushed in order.
    /// [`is_queuing`](Self::is_queuing) reports the request as outstanding from this point on,
    /// test mode included. If the transport drops the request unanswered, the held calls are
    /// flushed and the returned handle fails.
    pub fn ga_ready<F>(&self, ready: F) -> TrackerReady
    where
        F: FnOnce(&Tracker) + Send + 'static,
    {
        let queue = &self.inner.queue;
        let measurement_id = queue.measurement_id();
        let generation = queue.generation();
        let (reply, client_id) = ClientIdReply::channel();
        let (done_tx, done_rx) = oneshot::channel();

        let call = GtagCall::new([
            GtagArg::from("get"),
            GtagArg::from(measurement_id.clone()),
            GtagArg::from("client_id"),
            GtagArg::from(reply),
        ]);
        queue.gtag(call);

        let session = Arc::downgrade(&self.inner);
        runtime::spawn_detached(async move {
            match client_id.await {
                Ok(client_id) => {
                    let tracker = Tracker::new(client_id, measurement_id);
                    if let Some(inner) = release_session(&session, generation) {
                        ready(&tracker);
                        inner.queue.drain();
                        let _ = done_tx.send(tracker);
                    }
                }
                Err(_) => {
                    log::debug!("client id request dropped before the transport answered");
                    if let Some(inner) = release_session(&session, generation) {
                        inner.queue.drain();
                    }
                }
            }
        });

        TrackerReady::new(done_rx)
    }

    /// Sends a page view for `path`.
    #[deprecated(note = "use `send` with a `pageview` hit instead")]
    pub fn pageview(&self, path: &str, title: Option<&str>) {
        let path = path.trim();
        if path.is_empty() {
            log::warn!("path cannot be an empty string in .pageview()");
            return;
        }

        let mut fields = Params::new();
        if let Some(title) = title {
            fields.insert("title".into(), Value::from(title));
        }
        self.dispatch(
            "send",
            &[Value::from("pageview"), Value::from(path), Value::Object(fields)],
            None,
        );
    }

    /// Tracks a click on an outbound link. `hit_callback` runs once the transport confirms the
    /// hit, or after a short timeout when it does not.
    #[deprecated(note = "use `event` with an `event_callback` hook instead")]
    pub fn outbound_link<F>(&self, label: &str, hit_callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if label.is_empty() {
            log::warn!("args.label is required in outboundLink()");
            return;
        }

        let mut fields = Params::new();
        fields.insert("hitType".into(), Value::from("event"));
        fields.insert("eventCategory".into(), Value::from("Outbound"));
        fields.insert("eventAction".into(), Value::from("Click"));
        fields.insert("eventLabel".into(), Value::from(format_label(label)));

        let callback = guard_with_timeout(hit_callback, OUTBOUND_LINK_TIMEOUT);
        self.dispatch("send", &[Value::Object(fields)], Some(callback));
    }

    fn dispatch(&self, command: &str, args: &[Value], hit_callback: Option<EventCallback>) {
        match translate(&self.inner.field_map, command, args, hit_callback) {
            Ok(call) => {
                self.inner.queue.gtag(call);
            }
            Err(err) => warn_recovered(&err),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.queue.is_initialized()
    }

    /// Whether calls are being held back for an identity request.
    pub fn is_queuing(&self) -> bool {
        self.inner.queue.is_queuing()
    }

    pub fn is_test_mode(&self) -> bool {
        self.inner.queue.is_test_mode()
    }

    pub fn is_transport_loaded(&self) -> bool {
        self.inner.queue.is_transport_loaded()
    }

    pub fn mode(&self) -> QueueMode {
        self.inner.queue.mode()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.queue.pending_len()
    }

    /// JSON view of the calls waiting in the queue, oldest first.
    pub fn pending_calls(&self) -> Vec<Vec<Value>> {
        self.inner.queue.pending_calls()
    }

    pub fn measurement_id(&self) -> Option<String> {
        self.inner.queue.measurement_id()
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.inner.field_map
    }
}

/// Settles one identity request. Returns the session unless it is gone or was reset since the
/// request was issued.
fn release_session(session: &Weak<Ga4Inner>, generation: u64) -> Option<Arc<Ga4Inner>> {
    let inner = session.upgrade()?;
    if !inner.queue.release(generation) {
        log::debug!("ignoring client id that arrived after the session was reset");
        return None;
    }
    Some(inner)
}
