use crate::symbol::Symbol;
use crate::visibility::{scope_of, Scope};
use serde::{Deserialize, Serialize};

/// A file considered for a reference scan: a simple file name plus the
/// qualified name the build metadata derived for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// e.g. `Widget.java`
    pub file_name: String,
    /// e.g. `com.x.Widget`
    pub qualified_name: String,
}

impl Candidate {
    pub fn new(file_name: impl Into<String>, qualified_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            qualified_name: qualified_name.into(),
        }
    }

    pub fn package(&self) -> Option<&str> {
        package_of(&self.qualified_name)
    }
}

/// The portion of a qualified name preceding the final separator, or `None`
/// when there is nothing to derive a package from.
pub fn package_of(qualified_name: &str) -> Option<&str> {
    qualified_name
        .rsplit_once('.')
        .map(|(package, _)| package)
        .filter(|package| !package.is_empty())
}

/// Predicate over candidate files for one reference scan. Advisory pruning
/// only: it must never exclude a file that could hold a reference, so any
/// doubt widens the scope. Recomputed per query, never cached across
/// symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceScanFilter {
    /// Only the declaring file can hold references.
    File { file_name: String },
    /// Only files in the declaring package can hold references.
    Package { package: String },
    /// Every candidate must be scanned.
    Global,
}

impl ReferenceScanFilter {
    /// Builds the narrowest provably-sufficient filter for a search anchored
    /// at `symbol` in `declaring_file`.
    pub fn for_symbol(symbol: Option<&Symbol>, declaring_file: &str) -> Self {
        match scope_of(symbol) {
            Scope::File => ReferenceScanFilter::File {
                file_name: declaring_file.to_string(),
            },
            Scope::Package => {
                // Package scope with no derivable declaring package cannot be
                // narrowed safely; fall back to scanning everything.
                match symbol.and_then(Symbol::declaring_package) {
                    Some(package) => ReferenceScanFilter::Package {
                        package: package.to_string(),
                    },
                    None => ReferenceScanFilter::Global,
                }
            }
            Scope::Global => ReferenceScanFilter::Global,
        }
    }

    pub fn matches(&self, candidate: &Candidate) -> bool {
        match self {
            ReferenceScanFilter::File { file_name } => candidate.file_name == *file_name,
            ReferenceScanFilter::Package { package } => {
                candidate.package().is_some_and(|p| p == package)
            }
            ReferenceScanFilter::Global => true,
        }
    }
}
