use crate::types::{Location, MarkedTextList, Position, SymbolInformation};
use async_trait::async_trait;
use javals_scope::{Candidate, Symbol};
use std::collections::HashMap;
use std::sync::Mutex;

/// The language front end, seen through the narrowest interface the server
/// needs. Parsing, name binding and type checking all live behind it.
#[async_trait]
pub trait SymbolResolver: Send + Sync {
    /// The symbol declared or referenced at a source position, if any.
    async fn symbol_at(&self, uri: &str, position: Position) -> anyhow::Result<Option<Symbol>>;

    /// The symbol best matching a workspace-level textual query, if any.
    async fn symbol_by_query(&self, query: &str) -> anyhow::Result<Option<Symbol>>;

    /// All references to `symbol` inside one candidate file.
    async fn references_in(
        &self,
        candidate: &Candidate,
        symbol: &Symbol,
    ) -> anyhow::Result<Vec<Location>>;

    async fn definition_of(&self, uri: &str, position: Position) -> anyhow::Result<Vec<Location>>;

    async fn hover_text(&self, uri: &str, position: Position) -> anyhow::Result<MarkedTextList>;

    async fn document_symbols(&self, uri: &str) -> anyhow::Result<Vec<SymbolInformation>>;

    async fn workspace_symbols(&self, query: &str) -> anyhow::Result<Vec<SymbolInformation>>;
}

/// The build metadata extractor, reduced to what reference scans and the
/// workspace queries consume: an enumerable candidate set plus package and
/// dependency listings.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn candidate_files(&self) -> anyhow::Result<Vec<Candidate>>;

    async fn packages(&self) -> anyhow::Result<Vec<crate::types::PackageInformation>>;

    async fn dependencies(&self) -> anyhow::Result<Vec<crate::types::DependencyReference>>;
}

/// Remote file content, fetched under a fetch-pool permit.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn file_content(&self, uri: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone)]
struct Document {
    text: String,
    version: i64,
}

/// Open-document state. Notifications for the same document are applied in
/// receive order; the dispatcher guarantees that by applying them inline on
/// the read loop.
#[derive(Default)]
pub struct DocumentStore {
    documents: Mutex<HashMap<String, Document>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, uri: &str, text: String, version: i64) {
        self.documents
            .lock()
            .expect("document store mutex poisoned")
            .insert(uri.to_string(), Document { text, version });
    }

    pub fn change(&self, uri: &str, text: String, version: i64) {
        let mut documents = self
            .documents
            .lock()
            .expect("document store mutex poisoned");
        match documents.get_mut(uri) {
            Some(document) => {
                document.text = text;
                document.version = version;
            }
            None => {
                // Change before open: tolerate it, the client state is
                // authoritative for open documents.
                log::warn!("didChange for unopened document {uri}");
                documents.insert(uri.to_string(), Document { text, version });
            }
        }
    }

    pub fn close(&self, uri: &str) {
        self.documents
            .lock()
            .expect("document store mutex poisoned")
            .remove(uri);
    }

    pub fn text(&self, uri: &str) -> Option<String> {
        self.documents
            .lock()
            .expect("document store mutex poisoned")
            .get(uri)
            .map(|doc| doc.text.clone())
    }

    pub fn version(&self, uri: &str) -> Option<i64> {
        self.documents
            .lock()
            .expect("document store mutex poisoned")
            .get(uri)
            .map(|doc| doc.version)
    }

    pub fn is_open(&self, uri: &str) -> bool {
        self.documents
            .lock()
            .expect("document store mutex poisoned")
            .contains_key(uri)
    }
}

/// Collaborator set used when the server runs without an attached language
/// front end or build extractor: structural queries resolve to empty
/// results and content comes from local disk.
pub struct DetachedWorkspace;

#[async_trait]
impl SymbolResolver for DetachedWorkspace {
    async fn symbol_at(&self, _uri: &str, _position: Position) -> anyhow::Result<Option<Symbol>> {
        Ok(None)
    }

    async fn symbol_by_query(&self, _query: &str) -> anyhow::Result<Option<Symbol>> {
        Ok(None)
    }

    async fn references_in(
        &self,
        _candidate: &Candidate,
        _symbol: &Symbol,
    ) -> anyhow::Result<Vec<Location>> {
        Ok(Vec::new())
    }

    async fn definition_of(
        &self,
        _uri: &str,
        _position: Position,
    ) -> anyhow::Result<Vec<Location>> {
        Ok(Vec::new())
    }

    async fn hover_text(
        &self,
        _uri: &str,
        _position: Position,
    ) -> anyhow::Result<MarkedTextList> {
        Ok(Vec::new())
    }

    async fn document_symbols(&self, _uri: &str) -> anyhow::Result<Vec<SymbolInformation>> {
        Ok(Vec::new())
    }

    async fn workspace_symbols(&self, _query: &str) -> anyhow::Result<Vec<SymbolInformation>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl CandidateSource for DetachedWorkspace {
    async fn candidate_files(&self) -> anyhow::Result<Vec<Candidate>> {
        Ok(Vec::new())
    }

    async fn packages(&self) -> anyhow::Result<Vec<crate::types::PackageInformation>> {
        Ok(Vec::new())
    }

    async fn dependencies(&self) -> anyhow::Result<Vec<crate::types::DependencyReference>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl ContentProvider for DetachedWorkspace {
    async fn file_content(&self, uri: &str) -> anyhow::Result<String> {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        Ok(tokio::fs::read_to_string(path).await?)
    }
}
