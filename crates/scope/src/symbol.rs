use serde::{Deserialize, Serialize};

/// Symbol kinds as exposed by the language front end. The scope filter only
/// cares about which bucket a kind falls into, not its full semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Package,
    Type,
    Field,
    Method,
    Constructor,
    Parameter,
    Local,
    TypeParameter,
    ExceptionBinding,
    Other,
}

/// Visibility modifier set. `public`, `protected` and `private` are mutually
/// exclusive in well-formed input; all three false means package-default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub private: bool,
}

impl Modifiers {
    pub const PUBLIC: Modifiers = Modifiers {
        public: true,
        protected: false,
        private: false,
    };
    pub const PROTECTED: Modifiers = Modifiers {
        public: false,
        protected: true,
        private: false,
    };
    pub const PRIVATE: Modifiers = Modifiers {
        public: false,
        protected: false,
        private: true,
    };
    pub const PACKAGE_DEFAULT: Modifiers = Modifiers {
        public: false,
        protected: false,
        private: false,
    };
}

/// A symbol as supplied by the front end: kind, modifier set and the
/// enclosing-symbol chain, which forms a tree rooted at a package. Owned by
/// the front end; the scope filter reads it for one query and lets go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Absent when the front end has no modifier information at all, which
    /// is treated the same as package-default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<Modifiers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing: Option<Box<Symbol>>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: None,
            enclosing: None,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = Some(modifiers);
        self
    }

    pub fn inside(mut self, enclosing: Symbol) -> Self {
        self.enclosing = Some(Box::new(enclosing));
        self
    }

    /// The name of the package this symbol is declared in, found by walking
    /// the enclosing chain to its root. `None` when the chain does not reach
    /// a package symbol.
    pub fn declaring_package(&self) -> Option<&str> {
        let mut current = Some(self);
        while let Some(symbol) = current {
            if symbol.kind == SymbolKind::Package {
                return Some(&symbol.name);
            }
            current = symbol.enclosing.as_deref();
        }
        None
    }
}
