use crate::cache;
use crate::cancel::{CancelToken, Cancelled};
use crate::context::ServerContext;
use crate::types::*;
use javals_protocol::{to_request, Message, Method, ProtocolError, RequestId, ResponseError};
use javals_scope::{Candidate, ReferenceScanFilter, Symbol};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn to_response_error(&self) -> ResponseError {
        match self {
            HandlerError::Cancelled(_) => ResponseError::cancelled(),
            HandlerError::Protocol(err @ ProtocolError::TypeConversion { .. }) => {
                ResponseError::invalid_params(err)
            }
            HandlerError::Protocol(err) => ResponseError::internal(err),
            HandlerError::Internal(err) => ResponseError::internal(format!("{err:#}")),
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, HandlerError> {
    Ok(serde_json::to_value(value).map_err(ProtocolError::Serialization)?)
}

fn file_name_of(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

fn content_cache_key(uri: &str) -> String {
    format!("doc:{uri}:content")
}

/// Routes a typed request to its handler. Every method decodes its own
/// parameter type here; the dispatcher has already peeled off
/// notifications, cancellations and unknown methods.
pub async fn handle_request(
    ctx: &Arc<ServerContext>,
    msg: &Message,
    token: &CancelToken,
) -> Result<Value, HandlerError> {
    match msg.classify() {
        Method::Initialize => initialize(ctx, to_request::<InitializeParams>(msg)?.params).await,
        Method::Shutdown => shutdown(ctx),
        Method::Hover => hover(ctx, to_request::<TextDocumentPositionParams>(msg)?.params).await,
        Method::Definition => {
            definition(ctx, to_request::<TextDocumentPositionParams>(msg)?.params).await
        }
        Method::XDefinition => {
            xdefinition(ctx, to_request::<TextDocumentPositionParams>(msg)?.params).await
        }
        Method::References => {
            references(
                ctx,
                to_request::<ReferenceParams>(msg)?.params,
                msg.id.as_ref(),
                token,
            )
            .await
        }
        Method::DocumentSymbol => {
            document_symbol(ctx, to_request::<ContentParams>(msg)?.params).await
        }
        Method::XContent => xcontent(ctx, to_request::<ContentParams>(msg)?.params, token).await,
        Method::WorkspaceSymbol => {
            workspace_symbol(ctx, to_request::<WorkspaceSymbolParams>(msg)?.params).await
        }
        Method::WorkspaceXReferences => {
            xreferences(
                ctx,
                to_request::<XReferencesParams>(msg)?.params,
                msg.id.as_ref(),
                token,
            )
            .await
        }
        Method::WorkspaceXFiles => xfiles(ctx).await,
        Method::WorkspaceXPackages => xpackages(ctx).await,
        Method::WorkspaceXDependencies => xdependencies(ctx).await,
        Method::CacheGet => cache_get(ctx, to_request::<CacheGetParams>(msg)?.params),
        Method::CacheSet => cache_set(ctx, to_request::<CacheSetParams>(msg)?.params),
        other => Err(HandlerError::Internal(anyhow::anyhow!(
            "no handler registered for {other}"
        ))),
    }
}

fn capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: 1,
        hover_provider: true,
        definition_provider: true,
        references_provider: true,
        document_symbol_provider: true,
        workspace_symbol_provider: true,
        xworkspace_references_provider: true,
        xdefinition_provider: true,
        xpackages_provider: true,
    }
}

async fn initialize(
    ctx: &Arc<ServerContext>,
    params: InitializeParams,
) -> Result<Value, HandlerError> {
    if let Some(root) = params.root_uri.as_deref().or(params.root_path.as_deref()) {
        if ctx.config.alt_build_roots.matches(root) {
            log::info!("workspace root {root} uses the alternate build-metadata extraction path");
            ctx.client
                .notify(
                    Method::ShowMessage,
                    &ShowMessageParams::info(format!(
                        "using alternate build metadata extraction for {root}"
                    )),
                )
                .await;
        }
        log::info!("initialized for workspace root {root}");
    }
    pull_client_configuration(ctx);
    to_value(&InitializeResult {
        capabilities: capabilities(),
    })
}

/// Asks the client for its `java` settings section once the handshake is
/// done. Blocks only its own background task: a slow or silent client costs
/// the global callback timeout and the server proceeds on defaults.
fn pull_client_configuration(ctx: &Arc<ServerContext>) {
    let task_ctx = Arc::clone(ctx);
    javals_fetch::spawn_logged(ctx.pools.general(), "configuration-pull", async move {
        let settings: Value = task_ctx
            .client
            .request(
                Method::WorkspaceConfiguration,
                &ConfigurationParams {
                    items: vec![ConfigurationItem {
                        section: Some("java".to_string()),
                    }],
                },
            )
            .await;
        log::debug!("client configuration: {settings}");
        Ok(())
    });
}

fn shutdown(ctx: &Arc<ServerContext>) -> Result<Value, HandlerError> {
    ctx.shutdown_requested.store(true, Ordering::SeqCst);
    Ok(Value::Null)
}

async fn hover(
    ctx: &Arc<ServerContext>,
    params: TextDocumentPositionParams,
) -> Result<Value, HandlerError> {
    let contents = ctx
        .resolver
        .hover_text(&params.text_document.uri, params.position)
        .await?;
    to_value(&Hover {
        contents,
        range: None,
    })
}

async fn definition(
    ctx: &Arc<ServerContext>,
    params: TextDocumentPositionParams,
) -> Result<Value, HandlerError> {
    let locations = ctx
        .resolver
        .definition_of(&params.text_document.uri, params.position)
        .await?;
    to_value(&locations)
}

async fn xdefinition(
    ctx: &Arc<ServerContext>,
    params: TextDocumentPositionParams,
) -> Result<Value, HandlerError> {
    let uri = &params.text_document.uri;
    let Some(symbol) = ctx.resolver.symbol_at(uri, params.position).await? else {
        return to_value(&Vec::<XDefinitionItem>::new());
    };
    let locations = ctx.resolver.definition_of(uri, params.position).await?;
    let items: Vec<XDefinitionItem> = if locations.is_empty() {
        // Definition may live in a dependency that is not materialized yet;
        // the descriptor alone still lets the client chase it elsewhere.
        vec![XDefinitionItem {
            location: None,
            symbol,
        }]
    } else {
        locations
            .into_iter()
            .map(|location| XDefinitionItem {
                location: Some(location),
                symbol: symbol.clone(),
            })
            .collect()
    };
    to_value(&items)
}

async fn document_symbol(
    ctx: &Arc<ServerContext>,
    params: ContentParams,
) -> Result<Value, HandlerError> {
    let symbols = ctx
        .resolver
        .document_symbols(&params.text_document.uri)
        .await?;
    to_value(&symbols)
}

async fn workspace_symbol(
    ctx: &Arc<ServerContext>,
    params: WorkspaceSymbolParams,
) -> Result<Value, HandlerError> {
    let symbols = ctx.resolver.workspace_symbols(&params.query).await?;
    to_value(&symbols)
}

async fn references(
    ctx: &Arc<ServerContext>,
    params: ReferenceParams,
    id: Option<&RequestId>,
    token: &CancelToken,
) -> Result<Value, HandlerError> {
    let uri = &params.text_document.uri;
    let symbol = ctx.resolver.symbol_at(uri, params.position).await?;
    token.checkpoint()?;

    let Some(symbol) = symbol else {
        return to_value(&Vec::<Location>::new());
    };

    let mut locations = Vec::new();
    if params.context.include_declaration {
        locations.extend(ctx.resolver.definition_of(uri, params.position).await?);
    }

    let filter = ReferenceScanFilter::for_symbol(Some(&symbol), file_name_of(uri));
    locations.extend(scan_candidates(ctx, &symbol, &filter, None, id, token).await?);
    to_value(&locations)
}

async fn xreferences(
    ctx: &Arc<ServerContext>,
    params: XReferencesParams,
    id: Option<&RequestId>,
    token: &CancelToken,
) -> Result<Value, HandlerError> {
    let Some(symbol) = ctx.resolver.symbol_by_query(&params.query).await? else {
        return to_value(&Vec::<Location>::new());
    };
    token.checkpoint()?;

    // Workspace-level queries have no declaring file to anchor on, so a
    // file-scoped result cannot be narrowed here.
    let filter = match ReferenceScanFilter::for_symbol(Some(&symbol), "") {
        ReferenceScanFilter::File { .. } => ReferenceScanFilter::Global,
        filter => filter,
    };
    let locations = scan_candidates(ctx, &symbol, &filter, params.limit, id, token).await?;
    to_value(&locations)
}

/// Scans every candidate the filter admits, fanned out under file-fetch
/// pool permits. Batches stream to the client as `$/partialResult`
/// notifications as they land; cancellation is observed between per-file
/// scans.
async fn scan_candidates(
    ctx: &Arc<ServerContext>,
    symbol: &Symbol,
    filter: &ReferenceScanFilter,
    limit: Option<usize>,
    id: Option<&RequestId>,
    token: &CancelToken,
) -> Result<Vec<Location>, HandlerError> {
    let candidates = ctx.candidates.candidate_files().await?;
    let matching: Vec<Candidate> = candidates
        .into_iter()
        .filter(|candidate| filter.matches(candidate))
        .collect();
    log::debug!(
        "reference scan over {} candidate file(s) with filter {filter:?}",
        matching.len()
    );

    let mut join = tokio::task::JoinSet::new();
    for candidate in matching {
        let pool = ctx.pools.file().clone();
        let resolver = Arc::clone(&ctx.resolver);
        let symbol = symbol.clone();
        let token = token.clone();
        join.spawn(async move {
            if token.is_cancelled() {
                return Ok(Vec::new());
            }
            let _permit = pool.acquire().await;
            if token.is_cancelled() {
                return Ok(Vec::new());
            }
            resolver.references_in(&candidate, &symbol).await
        });
    }

    let mut locations = Vec::new();
    while let Some(scanned) = join.join_next().await {
        token.checkpoint()?;
        let scanned = scanned.map_err(|err| anyhow::anyhow!("scan task failed: {err}"))?;
        let batch = scanned?;
        if batch.is_empty() {
            continue;
        }
        if let Some(id) = id {
            stream_partial(ctx, id, &batch).await;
        }
        locations.extend(batch);
        if let Some(limit) = limit {
            if locations.len() >= limit {
                locations.truncate(limit);
                break;
            }
        }
    }
    Ok(locations)
}

async fn stream_partial(ctx: &Arc<ServerContext>, id: &RequestId, batch: &[Location]) {
    let patch = match serde_json::to_value(batch) {
        Ok(patch) => patch,
        Err(err) => {
            log::warn!("partial result batch does not serialize: {err}");
            return;
        }
    };
    ctx.client
        .notify(
            Method::PartialResult,
            &PartialResultParams {
                id: id.clone(),
                patch,
            },
        )
        .await;
}

async fn xcontent(
    ctx: &Arc<ServerContext>,
    params: ContentParams,
    token: &CancelToken,
) -> Result<Value, HandlerError> {
    let uri = &params.text_document.uri;

    // Open documents are authoritative over anything fetched or cached.
    if let Some(text) = ctx.documents.text(uri) {
        return to_value(&DocumentContent { text });
    }

    let key = content_cache_key(uri);
    if let Some(text) = cache::get_typed::<String>(ctx.cache.as_ref(), &key) {
        return to_value(&DocumentContent { text });
    }

    if !ctx.config.network_enabled {
        return Err(HandlerError::Internal(anyhow::anyhow!(
            "content for {uri} is not materialized and network fetch is disabled"
        )));
    }

    token.checkpoint()?;
    let text = {
        let _permit = ctx.pools.file().acquire().await;
        token.checkpoint()?;
        ctx.content.file_content(uri).await?
    };
    cache::set_typed(ctx.cache.as_ref(), &key, &text);
    to_value(&DocumentContent { text })
}

async fn xfiles(ctx: &Arc<ServerContext>) -> Result<Value, HandlerError> {
    let candidates = ctx.candidates.candidate_files().await?;
    let identifiers: Vec<TextDocumentIdentifier> = candidates
        .into_iter()
        .map(|candidate| TextDocumentIdentifier {
            uri: candidate.file_name,
        })
        .collect();
    to_value(&identifiers)
}

async fn xpackages(ctx: &Arc<ServerContext>) -> Result<Value, HandlerError> {
    // Package listings may materialize build metadata from remote artifacts.
    let _permit = ctx.pools.artifact().acquire().await;
    let packages = ctx.candidates.packages().await?;
    to_value(&packages)
}

async fn xdependencies(ctx: &Arc<ServerContext>) -> Result<Value, HandlerError> {
    let _permit = ctx.pools.artifact().acquire().await;
    let dependencies = ctx.candidates.dependencies().await?;
    to_value(&dependencies)
}

fn cache_get(ctx: &Arc<ServerContext>, params: CacheGetParams) -> Result<Value, HandlerError> {
    Ok(ctx.cache.get(&params.key).unwrap_or(Value::Null))
}

fn cache_set(ctx: &Arc<ServerContext>, params: CacheSetParams) -> Result<Value, HandlerError> {
    ctx.cache.set(&params.key, params.value);
    Ok(Value::Null)
}
