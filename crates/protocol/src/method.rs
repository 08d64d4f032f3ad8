/// Closed catalog of protocol methods. Every name maps to exactly one
/// member or to `Unknown`; unknown methods are routed to the unsupported
/// method response path, never dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    Shutdown,
    Exit,
    CancelRequest,
    PartialResult,
    WorkspaceSymbol,
    WorkspaceXPackages,
    WorkspaceXDependencies,
    WorkspaceXReferences,
    WorkspaceXFiles,
    WorkspaceConfiguration,
    DidClose,
    DidOpen,
    DidChange,
    DidSave,
    Hover,
    References,
    DocumentSymbol,
    Definition,
    XDefinition,
    XContent,
    ShowMessage,
    CacheGet,
    CacheSet,
    Unknown,
}

const CATALOG: &[(Method, &str)] = &[
    (Method::Initialize, "initialize"),
    (Method::Shutdown, "shutdown"),
    (Method::Exit, "exit"),
    (Method::CancelRequest, "$/cancelRequest"),
    (Method::PartialResult, "$/partialResult"),
    (Method::WorkspaceSymbol, "workspace/symbol"),
    (Method::WorkspaceXPackages, "workspace/xpackages"),
    (Method::WorkspaceXDependencies, "workspace/xdependencies"),
    (Method::WorkspaceXReferences, "workspace/xreferences"),
    (Method::WorkspaceXFiles, "workspace/xfiles"),
    (Method::WorkspaceConfiguration, "workspace/configuration"),
    (Method::DidClose, "textDocument/didClose"),
    (Method::DidOpen, "textDocument/didOpen"),
    (Method::DidChange, "textDocument/didChange"),
    (Method::DidSave, "textDocument/didSave"),
    (Method::Hover, "textDocument/hover"),
    (Method::References, "textDocument/references"),
    (Method::DocumentSymbol, "textDocument/documentSymbol"),
    (Method::Definition, "textDocument/definition"),
    (Method::XDefinition, "textDocument/xdefinition"),
    (Method::XContent, "textDocument/xcontent"),
    (Method::ShowMessage, "window/showMessage"),
    (Method::CacheGet, "xcache/get"),
    (Method::CacheSet, "xcache/set"),
];

impl Method {
    /// Linear scan over the catalog; anything unmatched is `Unknown`.
    pub fn from_name(name: &str) -> Method {
        CATALOG
            .iter()
            .find(|(_, catalog_name)| *catalog_name == name)
            .map(|(method, _)| *method)
            .unwrap_or(Method::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        CATALOG
            .iter()
            .find(|(method, _)| method == self)
            .map(|(_, name)| *name)
            .unwrap_or("<unknown>")
    }

    /// Methods that mutate the server's view of open documents. These must
    /// invalidate any derived state cached for the document they touch.
    pub fn affects_file_system(&self) -> bool {
        matches!(
            self,
            Method::DidOpen | Method::DidChange | Method::DidSave | Method::DidClose
        )
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Method::Unknown)
    }

    pub fn all_known() -> impl Iterator<Item = Method> {
        CATALOG.iter().map(|(method, _)| *method)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
