//! Shared harness for the server integration tests: an in-memory duplex
//! connection, a scriptable workspace, and a minimal protocol client.

use async_trait::async_trait;
use javals_protocol::{parse_message, FrameReader, FrameWriter, Message};
use javals_scope::{Candidate, Symbol};
use javals_server::{
    CandidateSource, ContentProvider, Location, MarkedTextList, PackageInformation, Position,
    Server, ServerConfig, SymbolResolver, SymbolInformation,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

#[derive(Default)]
pub struct TestWorkspace {
    /// Symbol returned for any position in the given uri.
    pub symbols: HashMap<String, Symbol>,
    /// References returned per candidate file name.
    pub references: HashMap<String, Vec<Location>>,
    pub candidates: Vec<Candidate>,
    /// Extra latency per uri, for out-of-order completion tests.
    pub hover_delays: HashMap<String, Duration>,
    /// Extra latency for every per-candidate reference scan.
    pub scan_delay: Option<Duration>,
    /// Candidate file names the scan actually visited.
    pub scanned: Mutex<Vec<String>>,
    /// Content served for unopened documents, keyed by uri.
    pub remote_content: HashMap<String, String>,
    pub content_fetches: AtomicUsize,
}

impl TestWorkspace {
    pub fn scanned_files(&self) -> Vec<String> {
        self.scanned.lock().expect("scanned mutex").clone()
    }
}

pub fn location(uri: &str, line: u32) -> Location {
    Location {
        uri: uri.to_string(),
        range: javals_server::Range {
            start: Position { line, character: 0 },
            end: Position { line, character: 1 },
        },
    }
}

#[async_trait]
impl SymbolResolver for TestWorkspace {
    async fn symbol_at(&self, uri: &str, _position: Position) -> anyhow::Result<Option<Symbol>> {
        Ok(self.symbols.get(uri).cloned())
    }

    async fn symbol_by_query(&self, query: &str) -> anyhow::Result<Option<Symbol>> {
        Ok(self.symbols.values().find(|s| s.name == query).cloned())
    }

    async fn references_in(
        &self,
        candidate: &Candidate,
        _symbol: &Symbol,
    ) -> anyhow::Result<Vec<Location>> {
        if let Some(delay) = self.scan_delay {
            tokio::time::sleep(delay).await;
        }
        self.scanned
            .lock()
            .expect("scanned mutex")
            .push(candidate.file_name.clone());
        Ok(self
            .references
            .get(&candidate.file_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn definition_of(&self, uri: &str, _position: Position) -> anyhow::Result<Vec<Location>> {
        Ok(vec![location(uri, 0)])
    }

    async fn hover_text(&self, uri: &str, _position: Position) -> anyhow::Result<MarkedTextList> {
        if let Some(delay) = self.hover_delays.get(uri) {
            tokio::time::sleep(*delay).await;
        }
        Ok(vec![javals_protocol::MarkedText::with_language(
            "java",
            format!("symbol in {uri}"),
        )])
    }

    async fn document_symbols(&self, _uri: &str) -> anyhow::Result<Vec<SymbolInformation>> {
        Ok(Vec::new())
    }

    async fn workspace_symbols(&self, _query: &str) -> anyhow::Result<Vec<SymbolInformation>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl CandidateSource for TestWorkspace {
    async fn candidate_files(&self) -> anyhow::Result<Vec<Candidate>> {
        Ok(self.candidates.clone())
    }

    async fn packages(&self) -> anyhow::Result<Vec<PackageInformation>> {
        Ok(Vec::new())
    }

    async fn dependencies(&self) -> anyhow::Result<Vec<javals_server::DependencyReference>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl ContentProvider for TestWorkspace {
    async fn file_content(&self, uri: &str) -> anyhow::Result<String> {
        self.content_fetches.fetch_add(1, Ordering::SeqCst);
        self.remote_content
            .get(uri)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no content for {uri}"))
    }
}

pub struct TestClient {
    writer: FrameWriter<WriteHalf<DuplexStream>>,
    reader: FrameReader<ReadHalf<DuplexStream>>,
}

impl TestClient {
    pub async fn send(&mut self, value: serde_json::Value) {
        self.writer
            .write_frame(&value.to_string())
            .await
            .expect("frame written");
    }

    pub async fn send_raw(&mut self, body: &str) {
        self.writer.write_frame(body).await.expect("frame written");
    }

    pub async fn recv(&mut self) -> Message {
        let body = self
            .reader
            .next_frame()
            .await
            .expect("frame read")
            .expect("connection open");
        parse_message(&body)
    }

    /// Next message that carries a result or error, collecting any
    /// notifications seen on the way.
    pub async fn recv_response(&mut self) -> (Message, Vec<Message>) {
        let mut notifications = Vec::new();
        loop {
            let msg = self.recv().await;
            if msg.is_response() {
                return (msg, notifications);
            }
            notifications.push(msg);
        }
    }
}

pub fn start(workspace: TestWorkspace) -> (TestClient, Arc<TestWorkspace>, ServerHandle) {
    // Keep the callback timeout short so tests that never answer a
    // server-to-client request do not stall the shutdown tail.
    let config = ServerConfig {
        request_timeout: Duration::from_millis(200),
        ..ServerConfig::default()
    };
    start_with_config(config, workspace)
}

pub fn start_with_config(
    config: ServerConfig,
    workspace: TestWorkspace,
) -> (TestClient, Arc<TestWorkspace>, ServerHandle) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    let (client_read, client_write) = tokio::io::split(client_io);

    let workspace = Arc::new(workspace);
    let server = Server::new(
        config,
        Arc::clone(&workspace) as Arc<dyn SymbolResolver>,
        Arc::clone(&workspace) as Arc<dyn CandidateSource>,
        Arc::clone(&workspace) as Arc<dyn ContentProvider>,
    );
    let handle = tokio::spawn(server.run(server_read, server_write));

    (
        TestClient {
            writer: FrameWriter::new(client_write),
            reader: FrameReader::new(client_read),
        },
        workspace,
        handle,
    )
}

pub type ServerHandle = JoinHandle<anyhow::Result<bool>>;

/// Drives the clean shutdown tail: shutdown request, exit notification,
/// then joins the server task.
pub async fn shut_down(mut client: TestClient, handle: ServerHandle) {
    client.send(serde_json::json!({
        "jsonrpc": "2.0", "id": "shutdown", "method": "shutdown"
    }))
    .await;
    let (response, _) = client.recv_response().await;
    assert!(response.error.is_none(), "shutdown must succeed");
    client
        .send(serde_json::json!({"jsonrpc": "2.0", "method": "exit"}))
        .await;
    let clean = handle
        .await
        .expect("server task joins")
        .expect("server loop ends cleanly");
    assert!(clean, "shutdown must precede exit");
}
