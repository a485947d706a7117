use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use crate::ga4::constants::API_VERSION;
use crate::ga4::error::{internal_error, Ga4Result};

/// Read-only view handed to `ga_ready` callbacks, mirroring the analytics.js tracker object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tracker {
    client_id: String,
    tracking_id: Option<String>,
}

impl Tracker {
    pub(crate) fn new(client_id: String, tracking_id: Option<String>) -> Self {
        Self {
            client_id,
            tracking_id,
        }
    }

    /// Resolves `clientId`, `trackingId` and `apiVersion`; every other property is `None`.
    pub fn get(&self, property: &str) -> Option<&str> {
        match property {
            "clientId" => Some(&self.client_id),
            "trackingId" => self.tracking_id.as_deref(),
            "apiVersion" => Some(API_VERSION),
            _ => None,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn tracking_id(&self) -> Option<&str> {
        self.tracking_id.as_deref()
    }
}

/// Completion of a `ga_ready` call.
///
/// Resolves after the ready callback ran and the calls buffered during the wait were flushed.
/// Awaiting it is optional; the flush happens either way. Fails with `ga4/internal` when the
/// pending request was discarded by `reset` or `dispose` before the transport answered.
#[must_use = "the flush happens regardless; await the handle to observe it"]
#[derive(Debug)]
pub struct TrackerReady {
    receiver: oneshot::Receiver<Tracker>,
}

impl TrackerReady {
    pub(crate) fn new(receiver: oneshot::Receiver<Tracker>) -> Self {
        Self { receiver }
    }
}

impl Future for TrackerReady {
    type Output = Ga4Result<Tracker>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|result| {
            result.map_err(|_| internal_error("client id request was dropped before it resolved"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_resolves_known_properties() {
        let tracker = Tracker::new("cid".into(), Some("G-1".into()));
        assert_eq!(tracker.get("clientId"), Some("cid"));
        assert_eq!(tracker.get("trackingId"), Some("G-1"));
        assert_eq!(tracker.get("apiVersion"), Some("1"));
        assert_eq!(tracker.get("name"), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dropped_sender_fails_the_handle() {
        let (sender, receiver) = oneshot::channel::<Tracker>();
        drop(sender);
        let err = TrackerReady::new(receiver).await.unwrap_err();
        assert_eq!(err.code_str(), "ga4/internal");
    }
}
