//! Context keys shared by the lowering code

use formula_core::types::Type;
use formula_core::ScopeTag;

/// Type the enclosing node wants the current node to produce
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeHint(pub Option<Type>);

impl TypeHint {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn of(ty: Type) -> Self {
        Self(Some(ty))
    }
}

/// Current [`TypeHint`]
pub const HINT: ScopeTag = ScopeTag::new("type_hint");

/// Parameters of the function body being lowered
pub const PARAMETERS: ScopeTag = ScopeTag::new("parameters");

/// Local definitions visible at the current node
pub const DEFINITIONS: ScopeTag = ScopeTag::new("definitions");

/// Input slot table, shared through the root scope
pub const SLOTS: ScopeTag = ScopeTag::new("slots");

/// Compiled function table, shared through the root scope
pub const FUNCTIONS: ScopeTag = ScopeTag::new("functions");
