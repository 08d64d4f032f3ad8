use crate::cancel::CancelToken;
use crate::context::ServerContext;
use crate::handlers::{self, HandlerError};
use crate::types::{CancelParams, DidChangeParams, DidCloseParams, DidOpenParams, DidSaveParams};
use javals_protocol::{to_request, Message, Method, RequestId, ResponseError};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// Routes inbound messages: responses back to waiting callbacks, document
/// notifications applied inline in receive order, cancellations into the
/// in-flight table, and requests onto their own tasks.
pub struct Dispatcher {
    ctx: Arc<ServerContext>,
    outbound: mpsc::Sender<Message>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<ServerContext>, outbound: mpsc::Sender<Message>) -> Self {
        Self { ctx, outbound }
    }

    pub async fn dispatch(&self, msg: Message) -> LoopControl {
        if msg.is_malformed() {
            // Already degraded by the codec; nothing to correlate a reply to.
            log::warn!("ignoring malformed message");
            return LoopControl::Continue;
        }

        if msg.is_response() {
            self.ctx.client.accept_response(&msg);
            return LoopControl::Continue;
        }

        let method = msg.classify();
        match method {
            Method::Exit => LoopControl::Exit,
            Method::CancelRequest => {
                self.handle_cancel(&msg);
                LoopControl::Continue
            }
            Method::DidOpen | Method::DidChange | Method::DidSave | Method::DidClose => {
                self.apply_document_notification(method, &msg);
                LoopControl::Continue
            }
            Method::ShowMessage | Method::PartialResult | Method::WorkspaceConfiguration => {
                // Client-bound methods arriving inbound are a protocol
                // violation, but not one worth dropping the connection over.
                match msg.id.clone() {
                    Some(id) => {
                        self.send(Message::error_response(
                            id,
                            ResponseError::new(
                                ResponseError::INVALID_REQUEST,
                                format!("{method} is a server-to-client method"),
                            ),
                        ))
                        .await;
                    }
                    None => log::debug!("ignoring client-bound {method} notification"),
                }
                LoopControl::Continue
            }
            Method::Unknown => {
                let name = msg.method.clone().unwrap_or_default();
                log::warn!("unsupported method `{name}`");
                if let Some(id) = msg.id.clone() {
                    self.send(Message::error_response(
                        id,
                        ResponseError::method_not_found(&name),
                    ))
                    .await;
                }
                LoopControl::Continue
            }
            _ => {
                match msg.id.clone() {
                    Some(id) => self.spawn_request(id, msg),
                    None => self.spawn_notification(method, msg),
                }
                LoopControl::Continue
            }
        }
    }

    /// Runs a tracked request on its own task. Completion removes the
    /// in-flight entry in the same step that decides the response, so a
    /// cancellation arriving afterwards finds nothing to act on.
    fn spawn_request(&self, id: RequestId, msg: Message) {
        let ctx = Arc::clone(&self.ctx);
        let outbound = self.outbound.clone();
        let token = ctx.inflight.begin(id.clone());
        tokio::spawn(async move {
            let outcome = handlers::handle_request(&ctx, &msg, &token).await;
            ctx.inflight.complete(&id);

            let response = match outcome {
                Ok(result) => Message::response(id.clone(), result),
                Err(err) => {
                    match &err {
                        HandlerError::Cancelled(_) => {
                            log::debug!("request {id} abandoned after cancellation")
                        }
                        other => log::warn!("request {id} failed: {other}"),
                    }
                    Message::error_response(id.clone(), err.to_response_error())
                }
            };
            if outbound.send(response).await.is_err() {
                log::debug!("client connection gone before response for {id}");
            }
        });
    }

    /// Known methods without an id expect no reply: run them fire-and-forget
    /// with failures logged, never propagated.
    fn spawn_notification(&self, method: Method, msg: Message) {
        let ctx = Arc::clone(&self.ctx);
        javals_fetch::spawn_logged(
            self.ctx.pools.general(),
            format!("notification:{method}"),
            async move {
                let token = CancelToken::new();
                handlers::handle_request(&ctx, &msg, &token)
                    .await
                    .map(|_| ())
                    .map_err(anyhow::Error::new)
            },
        );
    }

    fn handle_cancel(&self, msg: &Message) {
        match to_request::<CancelParams>(msg) {
            Ok(request) => {
                let id = request.params.id;
                if self.ctx.inflight.cancel(&id) {
                    log::debug!("cancellation requested for in-flight request {id}");
                } else {
                    // Completed, unknown or never tracked: a no-op by design.
                    log::debug!("cancellation for {id} ignored, request is not in flight");
                }
            }
            Err(err) => log::warn!("unusable $/cancelRequest payload: {err}"),
        }
    }

    /// Document notifications mutate per-document state sequentially, in
    /// receive order, and invalidate whatever derived state was cached for
    /// that document.
    fn apply_document_notification(&self, method: Method, msg: &Message) {
        let uri = match method {
            Method::DidOpen => match to_request::<DidOpenParams>(msg) {
                Ok(request) => {
                    let doc = request.params.text_document;
                    self.ctx.documents.open(&doc.uri, doc.text, doc.version);
                    Some(doc.uri)
                }
                Err(err) => {
                    log::warn!("unusable didOpen payload: {err}");
                    None
                }
            },
            Method::DidChange => match to_request::<DidChangeParams>(msg) {
                Ok(request) => {
                    let uri = request.params.text_document.uri;
                    let version = request.params.text_document.version;
                    match request.params.content_changes.into_iter().last() {
                        Some(change) => {
                            self.ctx.documents.change(&uri, change.text, version);
                            Some(uri)
                        }
                        None => {
                            log::debug!("didChange for {uri} carried no content changes");
                            None
                        }
                    }
                }
                Err(err) => {
                    log::warn!("unusable didChange payload: {err}");
                    None
                }
            },
            Method::DidSave => match to_request::<DidSaveParams>(msg) {
                Ok(request) => Some(request.params.text_document.uri),
                Err(err) => {
                    log::warn!("unusable didSave payload: {err}");
                    None
                }
            },
            Method::DidClose => match to_request::<DidCloseParams>(msg) {
                Ok(request) => {
                    let uri = request.params.text_document.uri;
                    self.ctx.documents.close(&uri);
                    Some(uri)
                }
                Err(err) => {
                    log::warn!("unusable didClose payload: {err}");
                    None
                }
            },
            _ => None,
        };

        if let Some(uri) = uri {
            debug_assert!(method.affects_file_system());
            self.ctx.cache.remove_prefix(&format!("doc:{uri}:"));
        }
    }

    async fn send(&self, msg: Message) {
        if self.outbound.send(msg).await.is_err() {
            log::debug!("client connection gone, outbound message dropped");
        }
    }
}
