use std::time::Duration;

/// Script endpoint of the global site tag. The measurement id is appended as the `id` query
/// parameter.
pub const GTAG_SCRIPT_URL: &str = "https://www.googletagmanager.com/gtag/js";

pub const DATA_LAYER_NAME: &str = "dataLayer";
pub const GTAG_FUNCTION_NAME: &str = "gtag";

/// Reported by `Tracker::get("apiVersion")`.
pub const API_VERSION: &str = "1";

/// Number of custom dimension and metric slots registered for analytics.js compatibility.
pub const CUSTOM_SLOT_COUNT: u32 = 200;

pub const REDACTED_EMAIL: &str = "REDACTED (Potential Email Address)";

pub const TRANSPORT_HINTS: [&str; 3] = ["beacon", "xhr", "image"];

/// Safety net for `outbound_link` when the transport never reports back.
pub const OUTBOUND_LINK_TIMEOUT: Duration = Duration::from_millis(250);

pub const UNSUPPORTED_HIT_TYPES: [&str; 5] =
    ["screenview", "transaction", "item", "social", "exception"];
