use crate::cache::WorkspaceCache;
use crate::client::ClientChannel;
use crate::config::ServerConfig;
use crate::inflight::InFlightTable;
use crate::workspace::{CandidateSource, ContentProvider, DocumentStore, SymbolResolver};
use javals_fetch::FetchPools;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// All process-wide state, constructed once at startup and shared by
/// reference into every component that needs it. No ambient globals.
pub struct ServerContext {
    pub config: ServerConfig,
    pub pools: FetchPools,
    pub cache: Arc<dyn WorkspaceCache>,
    pub documents: DocumentStore,
    pub resolver: Arc<dyn SymbolResolver>,
    pub candidates: Arc<dyn CandidateSource>,
    pub content: Arc<dyn ContentProvider>,
    pub client: ClientChannel,
    pub inflight: InFlightTable,
    pub shutdown_requested: AtomicBool,
}
