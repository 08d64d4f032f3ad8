use crate::cache::{MemoryCache, NoopCache, WorkspaceCache};
use crate::client::ClientChannel;
use crate::config::ServerConfig;
use crate::context::ServerContext;
use crate::dispatch::{Dispatcher, LoopControl};
use crate::inflight::InFlightTable;
use crate::workspace::{
    CandidateSource, ContentProvider, DetachedWorkspace, DocumentStore, SymbolResolver,
};
use javals_fetch::FetchPools;
use javals_protocol::{parse_message, serialize, FrameReader, FrameWriter, Message};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

const OUTBOUND_QUEUE: usize = 64;

/// The assembled server: context plus the outbound message queue feeding
/// the write half of the connection.
pub struct Server {
    ctx: Arc<ServerContext>,
    outbound_tx: mpsc::Sender<Message>,
    outbound_rx: mpsc::Receiver<Message>,
}

impl Server {
    pub fn new(
        config: ServerConfig,
        resolver: Arc<dyn SymbolResolver>,
        candidates: Arc<dyn CandidateSource>,
        content: Arc<dyn ContentProvider>,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);
        let cache: Arc<dyn WorkspaceCache> = if config.cache_enabled {
            Arc::new(MemoryCache::new())
        } else {
            Arc::new(NoopCache)
        };
        if let Some(credentials) = &config.repo_credentials {
            log::debug!(
                "artifact repository credentials configured for user {}",
                credentials.user
            );
        }
        let client = ClientChannel::new(outbound_tx.clone(), config.request_timeout);
        let pools = FetchPools::new(config.pool_budgets);
        let ctx = Arc::new(ServerContext {
            config,
            pools,
            cache,
            documents: DocumentStore::new(),
            resolver,
            candidates,
            content,
            client,
            inflight: InFlightTable::new(),
            shutdown_requested: AtomicBool::new(false),
        });
        Self {
            ctx,
            outbound_tx,
            outbound_rx,
        }
    }

    /// A server with no language front end or build extractor attached.
    pub fn detached(config: ServerConfig) -> Self {
        Self::new(
            config,
            Arc::new(DetachedWorkspace),
            Arc::new(DetachedWorkspace),
            Arc::new(DetachedWorkspace),
        )
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.ctx)
    }

    /// Runs the read loop until `exit`, end of stream, or a transport-fatal
    /// framing error. Returns true when a shutdown request preceded the
    /// stop, the clean path.
    pub async fn run<R, W>(self, read: R, write: W) -> anyhow::Result<bool>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Server {
            ctx,
            outbound_tx,
            mut outbound_rx,
        } = self;

        let writer_task = tokio::spawn(async move {
            let mut writer = FrameWriter::new(write);
            while let Some(msg) = outbound_rx.recv().await {
                let body = match serialize(&msg) {
                    Ok(body) => body,
                    Err(err) => {
                        // Fatal to this one response only.
                        log::error!("dropping unserializable outgoing message: {err}");
                        continue;
                    }
                };
                if let Err(err) = writer.write_frame(&body).await {
                    log::error!("write side closed: {err}");
                    break;
                }
            }
        });

        let dispatcher = Dispatcher::new(Arc::clone(&ctx), outbound_tx.clone());
        let mut reader = FrameReader::new(read);
        loop {
            match reader.next_frame().await {
                Ok(Some(body)) => {
                    let msg = parse_message(&body);
                    if dispatcher.dispatch(msg).await == LoopControl::Exit {
                        log::info!("exit notification received");
                        break;
                    }
                }
                Ok(None) => {
                    log::info!("client closed the connection");
                    break;
                }
                Err(err) => {
                    log::error!("transport error, stopping: {err}");
                    break;
                }
            }
        }

        let clean = ctx.shutdown_requested.load(Ordering::SeqCst);

        // Release our senders so the writer drains outstanding responses
        // from still-running handler tasks and then stops.
        drop(dispatcher);
        drop(outbound_tx);
        drop(ctx);
        writer_task.await.ok();

        Ok(clean)
    }
}
