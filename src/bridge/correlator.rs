/*!
 * Request/response pairing over an unordered transport.
 */

use log::debug;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Payload of a correlated response
pub type ResponsePayload = Result<Value, String>;

/// Pending requests keyed by message id.
///
/// Entries are only removed when their response arrives or when the caller
/// gives up, so a response is routed to its caller however many binds and
/// unbinds happened in between.
#[derive(Debug, Default)]
pub struct Correlator {
    pending: Mutex<HashMap<String, oneshot::Sender<ResponsePayload>>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh message id and the receiver its response will arrive on
    pub fn register(&self) -> (String, oneshot::Receiver<ResponsePayload>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);
        (id, rx)
    }

    /// Route a response. Returns false if no one is waiting for `id`.
    pub fn resolve(&self, id: &str, payload: ResponsePayload) -> bool {
        let Some(tx) = self.pending.lock().remove(id) else {
            debug!("Dropping response for unknown message id {}", id);
            return false;
        };

        // Receiver may have been dropped by a caller that timed out
        tx.send(payload).is_ok()
    }

    /// Forget a pending request
    pub fn cancel(&self, id: &str) {
        self.pending.lock().remove(id);
    }

    /// Number of requests still waiting for an answer
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}
