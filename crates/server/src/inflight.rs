use crate::cancel::CancelToken;
use javals_protocol::RequestId;
use std::collections::HashMap;
use std::sync::Mutex;

/// Tracks in-flight requests by correlation id.
///
/// Three threads race on this table: the dispatcher inserting a new request,
/// the handler task completing it, and the cancellation path marking it.
/// Every transition is one locked map operation, so a response that removes
/// its entry can never be resurrected by a late cancellation.
#[derive(Default)]
pub struct InFlightTable {
    entries: Mutex<HashMap<RequestId, CancelToken>>,
}

impl InFlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `id` and returns the token its handler must poll. A
    /// duplicate id replaces the stale entry; id uniqueness is the client's
    /// responsibility.
    pub fn begin(&self, id: RequestId) -> CancelToken {
        let token = CancelToken::new();
        let previous = self
            .entries
            .lock()
            .expect("in-flight table mutex poisoned")
            .insert(id.clone(), token.clone());
        if previous.is_some() {
            log::warn!("replacing stale in-flight entry for duplicate request id {id}");
        }
        token
    }

    /// Removes the entry for `id`, pairing with response emission. Returns
    /// false when the entry was already gone.
    pub fn complete(&self, id: &RequestId) -> bool {
        self.entries
            .lock()
            .expect("in-flight table mutex poisoned")
            .remove(id)
            .is_some()
    }

    /// Marks the request cancelled if it is still in flight. Cancellation
    /// after completion finds no entry and is a no-op.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let entries = self.entries.lock().expect("in-flight table mutex poisoned");
        match entries.get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("in-flight table mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
