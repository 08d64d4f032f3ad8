use crate::symbol::{Modifiers, Symbol, SymbolKind};

/// Visibility scope of a symbol, totally ordered from narrowest to widest.
/// Computed per query, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scope {
    File,
    Package,
    Global,
}

fn modifier_scope(modifiers: Option<Modifiers>) -> Scope {
    // An absent modifier set defaults to package visibility.
    let Some(modifiers) = modifiers else {
        return Scope::Package;
    };
    if modifiers.public || modifiers.protected {
        Scope::Global
    } else if modifiers.private {
        Scope::File
    } else {
        Scope::Package
    }
}

/// Computes the narrowest boundary within which `symbol` can possibly be
/// referenced.
///
/// A member's effective scope is capped by every container on its enclosing
/// chain: a private field inside a public class stays file-scoped, and a
/// public method inside a package-default class stays package-scoped. No
/// symbol means nothing to restrict by, so the whole workspace must be
/// scanned.
pub fn scope_of(symbol: Option<&Symbol>) -> Scope {
    let Some(symbol) = symbol else {
        return Scope::Global;
    };
    match symbol.kind {
        SymbolKind::Package => Scope::Global,
        SymbolKind::Local
        | SymbolKind::Parameter
        | SymbolKind::TypeParameter
        | SymbolKind::ExceptionBinding => Scope::File,
        SymbolKind::Type | SymbolKind::Field | SymbolKind::Method | SymbolKind::Constructor => {
            let own = modifier_scope(symbol.modifiers);
            own.min(scope_of(symbol.enclosing.as_deref()))
        }
        SymbolKind::Other => scope_of(symbol.enclosing.as_deref()),
    }
}
