mod cache;
mod cancel;
mod client;
mod config;
mod context;
mod dispatch;
mod handlers;
mod inflight;
mod server;
mod types;
mod workspace;

pub use cache::{MemoryCache, NoopCache, WorkspaceCache};
pub use cancel::{CancelToken, Cancelled};
pub use client::ClientChannel;
pub use config::{RepoCredentials, RootPatterns, ServerConfig};
pub use context::ServerContext;
pub use inflight::InFlightTable;
pub use server::Server;
pub use types::*;
pub use workspace::{
    CandidateSource, ContentProvider, DetachedWorkspace, DocumentStore, SymbolResolver,
};
