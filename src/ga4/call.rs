//! Call records exchanged between the command queue and the dispatch sink.
//!
//! A [`GtagCall`] is the Rust counterpart of one `gtag(...)` invocation: an ordered list of
//! arguments. Most arguments are JSON values; the two exceptions are the timestamp carried by the
//! `js` command and the completion handlers (`get` client id replies and `event_callback`
//! hooks) that cannot be represented as JSON.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::channel::oneshot;
use serde_json::{Map, Value};

/// Flat parameter mapping passed to gtag commands.
pub type Params = Map<String, Value>;

/// Completion handle for a `get <target> client_id` request.
///
/// The transport resolves it exactly once with the client identifier it holds. Dropping the reply
/// without resolving it cancels the pending identity resolution.
pub struct ClientIdReply {
    sender: oneshot::Sender<String>,
}

impl ClientIdReply {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<String>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    pub fn resolve(self, client_id: impl Into<String>) {
        if self.sender.send(client_id.into()).is_err() {
            log::debug!("client id resolved after the session stopped waiting for it");
        }
    }
}

impl fmt::Debug for ClientIdReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdReply")
            .field("canceled", &self.sender.is_canceled())
            .finish()
    }
}

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Hook invoked by the transport once an event has been handed off (`event_callback`).
pub struct EventCallback {
    callback: Callback,
}

impl EventCallback {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn invoke(self) {
        (self.callback)();
    }
}

impl fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventCallback")
    }
}

#[derive(Debug)]
pub enum GtagArg {
    Value(Value),
    Timestamp(DateTime<Utc>),
    ClientId(ClientIdReply),
    /// The `event_callback` of the parameter object that precedes it.
    EventCallback(EventCallback),
}

impl GtagArg {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            GtagArg::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for GtagArg {
    fn from(value: Value) -> Self {
        GtagArg::Value(value)
    }
}

impl From<Params> for GtagArg {
    fn from(params: Params) -> Self {
        GtagArg::Value(Value::Object(params))
    }
}

impl From<&str> for GtagArg {
    fn from(value: &str) -> Self {
        GtagArg::Value(Value::String(value.to_owned()))
    }
}

impl From<String> for GtagArg {
    fn from(value: String) -> Self {
        GtagArg::Value(Value::String(value))
    }
}

impl From<Option<String>> for GtagArg {
    fn from(value: Option<String>) -> Self {
        GtagArg::Value(value.map(Value::String).unwrap_or(Value::Null))
    }
}

impl From<DateTime<Utc>> for GtagArg {
    fn from(value: DateTime<Utc>) -> Self {
        GtagArg::Timestamp(value)
    }
}

impl From<ClientIdReply> for GtagArg {
    fn from(reply: ClientIdReply) -> Self {
        GtagArg::ClientId(reply)
    }
}

impl From<EventCallback> for GtagArg {
    fn from(callback: EventCallback) -> Self {
        GtagArg::EventCallback(callback)
    }
}

/// One deferred or forwarded `gtag(...)` invocation.
#[derive(Debug, Default)]
pub struct GtagCall {
    args: Vec<GtagArg>,
}

impl GtagCall {
    pub fn new<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<GtagArg>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<GtagArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(&self) -> &[GtagArg] {
        &self.args
    }

    pub fn into_args(self) -> Vec<GtagArg> {
        self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// The command name, i.e. the leading string argument.
    pub fn command(&self) -> Option<&str> {
        self.args.first().and_then(GtagArg::as_value).and_then(Value::as_str)
    }

    /// `get`-shaped calls suspend forwarding while they are replayed from the queue.
    pub fn is_get(&self) -> bool {
        self.command() == Some("get")
    }

    /// JSON view of the call. Callbacks are skipped and timestamps rendered as RFC 3339.
    pub fn values(&self) -> Vec<Value> {
        self.args
            .iter()
            .filter_map(|arg| match arg {
                GtagArg::Value(value) => Some(value.clone()),
                GtagArg::Timestamp(ts) => {
                    Some(Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)))
                }
                GtagArg::ClientId(_) | GtagArg::EventCallback(_) => None,
            })
            .collect()
    }

    /// The last parameter object of the call, if any.
    pub fn params(&self) -> Option<&Params> {
        self.args
            .iter()
            .rev()
            .filter_map(GtagArg::as_value)
            .find_map(Value::as_object)
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.args.iter().find_map(|arg| match arg {
            GtagArg::Timestamp(ts) => Some(*ts),
            _ => None,
        })
    }

    pub fn has_client_id_reply(&self) -> bool {
        self.args.iter().any(|arg| matches!(arg, GtagArg::ClientId(_)))
    }

    pub fn has_event_callback(&self) -> bool {
        self.args
            .iter()
            .any(|arg| matches!(arg, GtagArg::EventCallback(_)))
    }

    pub fn take_client_id_reply(&mut self) -> Option<ClientIdReply> {
        let index = self
            .args
            .iter()
            .position(|arg| matches!(arg, GtagArg::ClientId(_)))?;
        match self.args.remove(index) {
            GtagArg::ClientId(reply) => Some(reply),
            _ => None,
        }
    }

    pub fn take_event_callback(&mut self) -> Option<EventCallback> {
        let index = self
            .args
            .iter()
            .position(|arg| matches!(arg, GtagArg::EventCallback(_)))?;
        match self.args.remove(index) {
            GtagArg::EventCallback(callback) => Some(callback),
            _ => None,
        }
    }
}
