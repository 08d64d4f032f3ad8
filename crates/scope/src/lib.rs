mod filter;
mod symbol;
mod visibility;

pub use filter::{package_of, Candidate, ReferenceScanFilter};
pub use symbol::{Modifiers, Symbol, SymbolKind};
pub use visibility::{scope_of, Scope};
