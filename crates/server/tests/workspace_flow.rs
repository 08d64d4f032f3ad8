//! Document synchronization, content materialization, cache invalidation,
//! and scope-pruned reference scans.

mod support;

use javals_scope::{Candidate, Modifiers, Symbol, SymbolKind};
use serde_json::json;
use std::collections::HashMap;
use support::{location, start, TestWorkspace};

fn private_field_in(file: &str) -> Symbol {
    Symbol::new("count", SymbolKind::Field)
        .with_modifiers(Modifiers::PRIVATE)
        .inside(
            Symbol::new(file.trim_end_matches(".java"), SymbolKind::Type)
                .with_modifiers(Modifiers::PUBLIC)
                .inside(Symbol::new("com.x", SymbolKind::Package)),
        )
}

fn default_member_in(file: &str) -> Symbol {
    Symbol::new("helper", SymbolKind::Method)
        .with_modifiers(Modifiers::PACKAGE_DEFAULT)
        .inside(
            Symbol::new(file.trim_end_matches(".java"), SymbolKind::Type)
                .with_modifiers(Modifiers::PUBLIC)
                .inside(Symbol::new("com.x", SymbolKind::Package)),
        )
}

#[tokio::test]
async fn open_documents_win_over_fetched_content() {
    let workspace = TestWorkspace {
        remote_content: HashMap::from([(
            "file:///A.java".to_string(),
            "remote text".to_string(),
        )]),
        ..TestWorkspace::default()
    };
    let (mut client, workspace, handle) = start(workspace);

    client
        .send(json!({
            "jsonrpc": "2.0", "method": "textDocument/didOpen",
            "params": {"textDocument": {
                "uri": "file:///A.java", "languageId": "java", "version": 1,
                "text": "class A {}"
            }}
        }))
        .await;
    client
        .send(json!({
            "jsonrpc": "2.0", "id": 1, "method": "textDocument/xcontent",
            "params": {"textDocument": {"uri": "file:///A.java"}}
        }))
        .await;

    let (response, _) = client.recv_response().await;
    assert_eq!(
        response.result.expect("content")["text"],
        json!("class A {}")
    );
    assert_eq!(
        workspace
            .content_fetches
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );

    support::shut_down(client, handle).await;
}

#[tokio::test]
async fn document_notifications_apply_in_order() {
    let (mut client, _workspace, handle) = start(TestWorkspace::default());

    client
        .send(json!({
            "jsonrpc": "2.0", "method": "textDocument/didOpen",
            "params": {"textDocument": {
                "uri": "file:///A.java", "languageId": "java", "version": 1, "text": "v1"
            }}
        }))
        .await;
    for (version, text) in [(2, "v2"), (3, "v3")] {
        client
            .send(json!({
                "jsonrpc": "2.0", "method": "textDocument/didChange",
                "params": {
                    "textDocument": {"uri": "file:///A.java", "version": version},
                    "contentChanges": [{"text": text}]
                }
            }))
            .await;
    }
    client
        .send(json!({
            "jsonrpc": "2.0", "id": 1, "method": "textDocument/xcontent",
            "params": {"textDocument": {"uri": "file:///A.java"}}
        }))
        .await;

    let (response, _) = client.recv_response().await;
    assert_eq!(response.result.expect("content")["text"], json!("v3"));

    support::shut_down(client, handle).await;
}

#[tokio::test]
async fn fetched_content_is_cached_until_the_document_changes() {
    let workspace = TestWorkspace {
        remote_content: HashMap::from([(
            "file:///B.java".to_string(),
            "remote text".to_string(),
        )]),
        ..TestWorkspace::default()
    };
    let (mut client, workspace, handle) = start(workspace);

    let fetch = |id: i64| {
        json!({
            "jsonrpc": "2.0", "id": id, "method": "textDocument/xcontent",
            "params": {"textDocument": {"uri": "file:///B.java"}}
        })
    };
    let fetches = |workspace: &TestWorkspace| {
        workspace
            .content_fetches
            .load(std::sync::atomic::Ordering::SeqCst)
    };

    client.send(fetch(1)).await;
    let (response, _) = client.recv_response().await;
    assert_eq!(response.result.expect("content")["text"], json!("remote text"));
    assert_eq!(fetches(&workspace), 1);

    // Cache hit, no second fetch.
    client.send(fetch(2)).await;
    client.recv_response().await;
    assert_eq!(fetches(&workspace), 1);

    // A file-system-affecting notification invalidates the cached content.
    client
        .send(json!({
            "jsonrpc": "2.0", "method": "textDocument/didSave",
            "params": {"textDocument": {"uri": "file:///B.java"}}
        }))
        .await;
    client.send(fetch(3)).await;
    client.recv_response().await;
    assert_eq!(fetches(&workspace), 2);

    support::shut_down(client, handle).await;
}

#[tokio::test]
async fn file_scoped_references_scan_only_the_declaring_file() {
    let workspace = TestWorkspace {
        symbols: HashMap::from([(
            "file:///A.java".to_string(),
            private_field_in("A.java"),
        )]),
        candidates: vec![
            Candidate::new("A.java", "com.x.A"),
            Candidate::new("B.java", "com.x.B"),
            Candidate::new("C.java", "com.y.C"),
        ],
        references: HashMap::from([
            ("A.java".to_string(), vec![location("file:///A.java", 4)]),
            ("B.java".to_string(), vec![location("file:///B.java", 9)]),
        ]),
        ..TestWorkspace::default()
    };
    let (mut client, workspace, handle) = start(workspace);

    client
        .send(json!({
            "jsonrpc": "2.0", "id": 1, "method": "textDocument/references",
            "params": {
                "textDocument": {"uri": "file:///A.java"},
                "position": {"line": 4, "character": 12},
                "context": {"includeDeclaration": false}
            }
        }))
        .await;

    let (response, _) = client.recv_response().await;
    let locations = response.result.expect("locations");
    assert_eq!(locations, json!([location("file:///A.java", 4)]));
    assert_eq!(workspace.scanned_files(), vec!["A.java".to_string()]);

    support::shut_down(client, handle).await;
}

#[tokio::test]
async fn package_scoped_references_skip_other_packages() {
    let workspace = TestWorkspace {
        symbols: HashMap::from([(
            "file:///A.java".to_string(),
            default_member_in("A.java"),
        )]),
        candidates: vec![
            Candidate::new("A.java", "com.x.A"),
            Candidate::new("B.java", "com.x.B"),
            Candidate::new("C.java", "com.y.C"),
            Candidate::new("NoPackage.java", "NoPackage"),
        ],
        references: HashMap::from([
            ("A.java".to_string(), vec![location("file:///A.java", 1)]),
            ("B.java".to_string(), vec![location("file:///B.java", 2)]),
            ("C.java".to_string(), vec![location("file:///C.java", 3)]),
        ]),
        ..TestWorkspace::default()
    };
    let (mut client, workspace, handle) = start(workspace);

    client
        .send(json!({
            "jsonrpc": "2.0", "id": 1, "method": "textDocument/references",
            "params": {
                "textDocument": {"uri": "file:///A.java"},
                "position": {"line": 1, "character": 1},
                "context": {"includeDeclaration": false}
            }
        }))
        .await;

    let (response, _) = client.recv_response().await;
    let locations = response.result.expect("locations");
    let returned: Vec<&str> = locations
        .as_array()
        .expect("array")
        .iter()
        .map(|l| l["uri"].as_str().expect("uri"))
        .collect();
    let mut sorted = returned.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec!["file:///A.java", "file:///B.java"]);

    let mut scanned = workspace.scanned_files();
    scanned.sort_unstable();
    assert_eq!(scanned, vec!["A.java".to_string(), "B.java".to_string()]);

    support::shut_down(client, handle).await;
}

#[tokio::test]
async fn reference_batches_stream_as_partial_results() {
    let workspace = TestWorkspace {
        symbols: HashMap::from([(
            "file:///A.java".to_string(),
            default_member_in("A.java"),
        )]),
        candidates: vec![
            Candidate::new("A.java", "com.x.A"),
            Candidate::new("B.java", "com.x.B"),
        ],
        references: HashMap::from([
            ("A.java".to_string(), vec![location("file:///A.java", 1)]),
            ("B.java".to_string(), vec![location("file:///B.java", 2)]),
        ]),
        ..TestWorkspace::default()
    };
    let (mut client, _workspace, handle) = start(workspace);

    client
        .send(json!({
            "jsonrpc": "2.0", "id": "refs", "method": "textDocument/references",
            "params": {
                "textDocument": {"uri": "file:///A.java"},
                "position": {"line": 1, "character": 1},
                "context": {"includeDeclaration": false}
            }
        }))
        .await;

    let (response, notifications) = client.recv_response().await;
    assert!(response.error.is_none());

    let partials: Vec<&javals_protocol::Message> = notifications
        .iter()
        .filter(|msg| msg.method.as_deref() == Some("$/partialResult"))
        .collect();
    assert!(!partials.is_empty(), "scan batches must stream");
    for partial in partials {
        assert_eq!(partial.params["id"], json!("refs"));
        assert!(partial.params["patch"].is_array());
    }

    support::shut_down(client, handle).await;
}

#[tokio::test]
async fn xcache_round_trips_values() {
    let (mut client, _workspace, handle) = start(TestWorkspace::default());

    client
        .send(json!({
            "jsonrpc": "2.0", "id": 1, "method": "xcache/set",
            "params": {"key": "deps:com.x", "value": {"resolved": true}}
        }))
        .await;
    client.recv_response().await;

    client
        .send(json!({
            "jsonrpc": "2.0", "id": 2, "method": "xcache/get",
            "params": {"key": "deps:com.x"}
        }))
        .await;
    let (response, _) = client.recv_response().await;
    assert_eq!(response.result, Some(json!({"resolved": true})));

    // Unknown keys read as null, not as an error.
    client
        .send(json!({
            "jsonrpc": "2.0", "id": 3, "method": "xcache/get",
            "params": {"key": "deps:absent"}
        }))
        .await;
    let (response, _) = client.recv_response().await;
    assert_eq!(response.result, Some(json!(null)));

    support::shut_down(client, handle).await;
}

#[tokio::test]
async fn workspace_xfiles_lists_candidates() {
    let workspace = TestWorkspace {
        candidates: vec![
            Candidate::new("A.java", "com.x.A"),
            Candidate::new("B.java", "com.x.B"),
        ],
        ..TestWorkspace::default()
    };
    let (mut client, _workspace, handle) = start(workspace);

    client
        .send(json!({
            "jsonrpc": "2.0", "id": 1, "method": "workspace/xfiles", "params": {}
        }))
        .await;
    let (response, _) = client.recv_response().await;
    assert_eq!(
        response.result,
        Some(json!([{"uri": "A.java"}, {"uri": "B.java"}]))
    );

    support::shut_down(client, handle).await;
}
