//! Ordering engine: decides whether a call is forwarded to the sink or buffered, and replays the
//! buffer in submission order.
//!
//! The state lock is never held while the sink runs, so a transport (or test double) may call
//! back into the session synchronously.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::ga4::call::GtagCall;
use crate::ga4::gtag::GtagSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueMode {
    /// Calls go straight to the sink.
    Idle,
    /// Calls are buffered, either in test mode or while a client id is being resolved.
    Queuing,
    /// A buffered snapshot is being replayed; new calls line up behind it.
    Draining,
}

#[derive(Debug, Default)]
struct QueueState {
    initialized: bool,
    test_mode: bool,
    transport_loaded: bool,
    // Identity requests forwarded to the sink and not answered yet.
    waits: usize,
    // Identity requests issued and not answered yet, forwarded or still pending.
    requested: usize,
    // Set when a replayed `get` without a reply handle re-arms queuing.
    rearmed: bool,
    draining: bool,
    pending: VecDeque<GtagCall>,
    measurement_id: Option<String>,
    // Bumped by every reset so late identity completions cannot touch a fresh session.
    generation: u64,
}

impl QueueState {
    fn holds_calls(&self) -> bool {
        self.test_mode || self.waits > 0 || self.rearmed
    }

    // Must run in the same critical section that hands `call` to the sink.
    fn record_forward(&mut self, call: &GtagCall) {
        if call.has_client_id_reply() {
            self.waits += 1;
        } else if call.is_get() {
            self.rearmed = true;
        }
    }
}

pub(crate) struct CommandQueue {
    sink: Arc<dyn GtagSink>,
    state: Mutex<QueueState>,
}

impl CommandQueue {
    pub(crate) fn new(sink: Arc<dyn GtagSink>) -> Self {
        Self {
            sink,
            state: Mutex::new(QueueState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Restores the freshly-created state and returns the calls that were still pending.
    pub(crate) fn reset(&self) -> Vec<GtagCall> {
        let mut state = self.lock();
        let generation = state.generation.wrapping_add(1);
        let previous = std::mem::replace(
            &mut *state,
            QueueState {
                generation,
                ..Default::default()
            },
        );
        previous.pending.into()
    }

    /// Records the session flags for an `initialize` call. Returns whether the session had
    /// already been initialized.
    pub(crate) fn prepare_initialize(&self, measurement_id: String, test_mode: bool) -> bool {
        let mut state = self.lock();
        state.measurement_id = Some(measurement_id);
        state.test_mode = test_mode;
        state.initialized
    }

    pub(crate) fn mark_initialized(&self) {
        self.lock().initialized = true;
    }

    /// Loads the transport the first time it is requested.
    pub(crate) fn load_transport(&self, measurement_id: &str, nonce: Option<&str>) {
        let first = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.transport_loaded, true)
        };
        if first {
            log::debug!("loading gtag.js for `{measurement_id}`");
            self.sink.load(measurement_id, nonce);
        }
    }

    /// Forwards `call` to the sink, or buffers it while the session is in test mode, waiting for
    /// a client id or draining. Returns `true` when the call was forwarded.
    ///
    /// A forwarded call carrying a [`ClientIdReply`](crate::ga4::ClientIdReply) holds back every
    /// later call until [`release`](Self::release) is called for it.
    pub(crate) fn gtag(&self, call: GtagCall) -> bool {
        let forward = {
            let mut state = self.lock();
            if call.has_client_id_reply() {
                state.requested += 1;
            }
            if state.holds_calls() || state.draining {
                state.pending.push_back(call);
                log::debug!("buffered gtag call ({} pending)", state.pending.len());
                None
            } else {
                if call.has_client_id_reply() {
                    state.waits += 1;
                }
                Some(call)
            }
        };

        match forward {
            Some(call) => {
                self.sink.gtag(call);
                true
            }
            None => false,
        }
    }

    /// Clears a re-armed queue and replays whatever accumulated. Outstanding identity requests
    /// keep holding calls back. No-op in test mode.
    pub(crate) fn resume(&self) {
        {
            let mut state = self.lock();
            if state.test_mode {
                return;
            }
            state.rearmed = false;
        }
        self.drain();
    }

    /// Settles one forwarded identity request issued in `generation`. Returns `false` when the
    /// session was reset in the meantime.
    pub(crate) fn release(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.waits = state.waits.saturating_sub(1);
        state.requested = state.requested.saturating_sub(1);
        state.rearmed = false;
        true
    }

    /// Replays pending calls in FIFO order.
    ///
    /// Each round takes a snapshot of the queue. A replayed `get` call holds back the calls behind
    /// it; they go back to the head of the queue, ahead of anything submitted meanwhile. Calls
    /// that arrive during a round are replayed by the next one.
    pub(crate) fn drain(&self) {
        {
            let mut state = self.lock();
            if state.draining {
                return;
            }
            state.draining = true;
        }

        loop {
            let mut batch: VecDeque<GtagCall> = {
                let mut state = self.lock();
                if state.holds_calls() || state.pending.is_empty() {
                    state.draining = false;
                    return;
                }
                std::mem::take(&mut state.pending)
            };

            while let Some(call) = batch.pop_front() {
                {
                    let mut state = self.lock();
                    if state.holds_calls() {
                        batch.push_front(call);
                        while let Some(rest) = batch.pop_back() {
                            state.pending.push_front(rest);
                        }
                        state.draining = false;
                        return;
                    }
                    state.record_forward(&call);
                }
                self.sink.gtag(call);
            }
        }
    }

    pub(crate) fn mode(&self) -> QueueMode {
        let state = self.lock();
        if state.draining {
            QueueMode::Draining
        } else if state.holds_calls() || state.requested > 0 {
            QueueMode::Queuing
        } else {
            QueueMode::Idle
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Whether calls are held back by an identity request, answered or not yet forwarded.
    pub(crate) fn is_queuing(&self) -> bool {
        let state = self.lock();
        state.waits > 0 || state.requested > 0 || state.rearmed
    }

    pub(crate) fn is_test_mode(&self) -> bool {
        self.lock().test_mode
    }

    pub(crate) fn is_transport_loaded(&self) -> bool {
        self.lock().transport_loaded
    }

    pub(crate) fn measurement_id(&self) -> Option<String> {
        self.lock().measurement_id.clone()
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub(crate) fn pending_calls(&self) -> Vec<Vec<Value>> {
        self.lock().pending.iter().map(GtagCall::values).collect()
    }
}
