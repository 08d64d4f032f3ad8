use javals_protocol::{Message, Method, RequestId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Server-to-client channel: notifications plus blocking callbacks.
///
/// A blocking callback registers a reply slot keyed by a server-minted id,
/// sends the request, and waits under the single global timeout. On timeout
/// the caller gets the default value back instead of hanging forever; the
/// late reply, if it ever arrives, is dropped.
#[derive(Clone)]
pub struct ClientChannel {
    outbound: mpsc::Sender<Message>,
    pending: Arc<Mutex<HashMap<RequestId, oneshot::Sender<Message>>>>,
    next_id: Arc<AtomicI64>,
    timeout: Duration,
}

impl ClientChannel {
    pub fn new(outbound: mpsc::Sender<Message>, timeout: Duration) -> Self {
        Self {
            outbound,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
            timeout,
        }
    }

    /// Fire-and-forget notification to the client.
    pub async fn notify<P: Serialize>(&self, method: Method, params: &P) {
        let params = match serde_json::to_value(params) {
            Ok(value) => value,
            Err(err) => {
                log::error!("dropping unserializable {method} notification: {err}");
                return;
            }
        };
        if self
            .outbound
            .send(Message::notification(method, params))
            .await
            .is_err()
        {
            log::debug!("client connection gone, {method} notification dropped");
        }
    }

    /// Blocking callback to the client; returns `R::default()` on timeout or
    /// on any reply that does not carry a result decodable as `R`.
    pub async fn request<P: Serialize, R: DeserializeOwned + Default>(
        &self,
        method: Method,
        params: &P,
    ) -> R {
        let params = match serde_json::to_value(params) {
            Ok(value) => value,
            Err(err) => {
                log::error!("dropping unserializable {method} callback: {err}");
                return R::default();
            }
        };

        // Server-minted ids use their own namespace so they can never
        // collide with client request ids.
        let id = RequestId::Text(format!(
            "javals:{}",
            self.next_id.fetch_add(1, Ordering::Relaxed)
        ));
        let (reply_tx, reply_rx) = oneshot::channel::<Message>();
        self.pending
            .lock()
            .expect("pending callback mutex poisoned")
            .insert(id.clone(), reply_tx);

        if self
            .outbound
            .send(Message::request(method, id.clone(), params))
            .await
            .is_err()
        {
            self.forget(&id);
            log::warn!("client connection gone, {method} callback returns default");
            return R::default();
        }

        match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(reply)) => {
                if let Some(error) = &reply.error {
                    log::warn!("{method} callback failed on the client: {}", error.message);
                    return R::default();
                }
                match reply.result {
                    Some(result) => serde_json::from_value(result).unwrap_or_else(|err| {
                        log::warn!("{method} callback reply does not decode: {err}");
                        R::default()
                    }),
                    None => R::default(),
                }
            }
            Ok(Err(_)) => {
                // Reply slot dropped with the connection.
                R::default()
            }
            Err(_) => {
                self.forget(&id);
                log::warn!(
                    "{method} callback timed out after {:?}, returning default",
                    self.timeout
                );
                R::default()
            }
        }
    }

    /// Routes an inbound response to the callback waiting on its id.
    /// Returns false when nobody is waiting, which covers replies that
    /// arrive after their timeout.
    pub fn accept_response(&self, msg: &Message) -> bool {
        let Some(id) = msg.id.clone() else {
            return false;
        };
        let waiter = self
            .pending
            .lock()
            .expect("pending callback mutex poisoned")
            .remove(&id);
        match waiter {
            Some(tx) => tx.send(msg.clone()).is_ok(),
            None => {
                log::debug!("dropping reply for unknown or timed-out callback id {id}");
                false
            }
        }
    }

    fn forget(&self, id: &RequestId) {
        self.pending
            .lock()
            .expect("pending callback mutex poisoned")
            .remove(id);
    }
}
