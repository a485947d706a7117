use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future;

use crate::ga4::call::EventCallback;
use crate::platform::runtime;

type HitCallback = Box<dyn FnOnce() + Send + 'static>;

/// Holds a callback that may be claimed by exactly one of several racers.
struct OnceCallback {
    callback: Mutex<Option<HitCallback>>,
}

impl OnceCallback {
    fn new<F>(callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            callback: Mutex::new(Some(Box::new(callback))),
        }
    }

    fn fire(&self) {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Wraps `hit_callback` into an `event_callback` hook that races a `timeout` timer.
///
/// Whichever of the transport and the timer reports first runs the callback; the other one finds
/// it already taken. When the transport wins, the timer is aborted.
pub(crate) fn guard_with_timeout<F>(hit_callback: F, timeout: Duration) -> EventCallback
where
    F: FnOnce() + Send + 'static,
{
    let once = Arc::new(OnceCallback::new(hit_callback));
    let (timer, abort) = future::abortable(runtime::sleep(timeout));

    let on_timeout = Arc::clone(&once);
    runtime::spawn_detached(async move {
        if timer.await.is_ok() {
            log::debug!("transport did not report back within {timeout:?}; running hit callback");
            on_timeout.fire();
        }
    });

    EventCallback::new(move || {
        abort.abort();
        once.fire();
    })
}
