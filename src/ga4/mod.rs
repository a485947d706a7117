mod api;
mod call;
mod command;
mod config;
mod constants;
pub mod error;
pub mod format;
mod gtag;
mod mapper;
mod outbound;
mod queue;
mod tracker;

pub use api::{Ga4, Ga4Builder};
pub use call::{ClientIdReply, EventCallback, GtagArg, GtagCall, Params};
pub use config::{InitConfig, InitOptions, InitTargets, UaEventOptions};
pub use format::{format, format_label};
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub use gtag::BrowserGtag;
pub use gtag::{DataLayer, GtagSink, ScriptTag};
pub use mapper::{append_custom_map, FieldMap};
pub use queue::QueueMode;
pub use tracker::{Tracker, TrackerReady};
