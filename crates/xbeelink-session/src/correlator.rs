//! Frame id allocation and response routing.
//!
//! Each request registers the frame type it expects back and receives a
//! fresh frame id. Inbound frames are handed to the one waiter whose id
//! *and* expected type both match; anything else is ignored here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::oneshot;
use tracing::{debug, trace};
use xbeelink_frame::{frame_type_name, Frame};

use crate::error::{Result, SessionError};

/// Number of assignable frame ids. Id 0 asks the radio not to respond.
pub(crate) const FRAME_ID_SPACE: usize = u8::MAX as usize;

#[derive(Debug, Default)]
pub(crate) struct Correlator {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    last_id: u8,
    next_ticket: u64,
    pending: HashMap<u8, Waiter>,
    closed: bool,
}

#[derive(Debug)]
struct Waiter {
    expected_type: u8,
    ticket: u64,
    registered_at: Instant,
    tx: oneshot::Sender<Frame>,
}

impl State {
    fn allocate(&mut self) -> Option<u8> {
        for _ in 0..FRAME_ID_SPACE {
            self.last_id = self.last_id.checked_add(1).unwrap_or(1);
            if !self.pending.contains_key(&self.last_id) {
                return Some(self.last_id);
            }
        }
        None
    }
}

impl Correlator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve a frame id for a request expecting `expected_type`.
    pub(crate) fn register(self: &Arc<Self>, expected_type: u8) -> Result<PendingResponse> {
        let mut state = self.lock();
        if state.closed {
            return Err(SessionError::Closed);
        }
        let id = state
            .allocate()
            .ok_or(SessionError::TooManyPending(FRAME_ID_SPACE))?;
        let ticket = state.next_ticket;
        state.next_ticket += 1;

        let (tx, rx) = oneshot::channel();
        state.pending.insert(
            id,
            Waiter {
                expected_type,
                ticket,
                registered_at: Instant::now(),
                tx,
            },
        );
        debug!(
            frame_id = id,
            expect = frame_type_name(expected_type),
            pending = state.pending.len(),
            "registered request"
        );

        Ok(PendingResponse {
            id,
            ticket,
            rx,
            correlator: Arc::clone(self),
        })
    }

    /// Deliver `frame` to its waiter, if any. Returns whether it was claimed.
    pub(crate) fn route(&self, frame: &Frame) -> bool {
        let Some(id) = frame.frame_id() else {
            return false;
        };
        let mut state = self.lock();
        match state.pending.get(&id) {
            Some(waiter) if waiter.expected_type == frame.frame_type() => {}
            Some(waiter) => {
                trace!(
                    frame_id = id,
                    got = frame_type_name(frame.frame_type()),
                    expect = frame_type_name(waiter.expected_type),
                    "frame id matches a request but type does not"
                );
                return false;
            }
            None => {
                trace!(frame_id = id, "no request waiting on frame id");
                return false;
            }
        }
        let Some(waiter) = state.pending.remove(&id) else {
            return false;
        };
        drop(state);

        debug!(
            frame_id = id,
            elapsed_ms = waiter.registered_at.elapsed().as_millis() as u64,
            "response matched"
        );
        waiter.tx.send(frame.clone()).is_ok()
    }

    /// Fail every outstanding request and refuse new ones.
    pub(crate) fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        let dropped = state.pending.len();
        state.pending.clear();
        if dropped > 0 {
            debug!(dropped, "abandoned outstanding requests");
        }
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    fn release(&self, id: u8, ticket: u64) {
        let mut state = self.lock();
        if state.pending.get(&id).is_some_and(|w| w.ticket == ticket) {
            state.pending.remove(&id);
            debug!(frame_id = id, "request abandoned before a response arrived");
        }
    }
}

/// A registered request. Dropping it frees the frame id, so a request that
/// times out or is cancelled never receives a late response.
#[derive(Debug)]
pub(crate) struct PendingResponse {
    id: u8,
    ticket: u64,
    rx: oneshot::Receiver<Frame>,
    correlator: Arc<Correlator>,
}

impl PendingResponse {
    pub(crate) fn id(&self) -> u8 {
        self.id
    }

    /// Wait for the matching frame.
    pub(crate) async fn recv(&mut self) -> Result<Frame> {
        (&mut self.rx).await.map_err(|_| SessionError::Closed)
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        self.correlator.release(self.id, self.ticket);
    }
}
