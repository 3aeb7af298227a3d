//! IR Program
//!
//! A program is a root node, the user functions it calls, the input slots
//! it reads and associated metadata.

use crate::ir::{FunctionId, Node};
use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Input slot read by a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub name: String,
    pub ty: Type,
}

/// Compiled user function; parameters are read through `Node::Local`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    pub name: String,
    pub parameters: Vec<Type>,
    pub return_type: Type,
    pub body: Node,
}

/// An IR program ready for execution
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Root expression
    pub root: Node,

    /// User functions, indexed by `FunctionId`
    pub functions: Vec<FunctionBody>,

    /// Input slots, indexed by `Node::Slot::index`
    pub slots: Vec<SlotInfo>,

    /// Type of the value produced by `root`
    pub return_type: Type,

    /// Program metadata
    pub metadata: ProgramMetadata,
}

/// Metadata associated with a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramMetadata {
    /// Source text, when compiled from a string
    pub source: Option<String>,

    /// Domain restrictions guarding the program, outermost first
    #[serde(default)]
    pub restrictions: Vec<String>,

    /// Custom metadata fields
    #[serde(default)]
    pub custom: HashMap<String, String>,

    /// Version of the compiler that generated this
    pub compiler_version: String,
}

impl Program {
    /// Create a new program
    pub fn new(root: Node, metadata: ProgramMetadata) -> Self {
        let return_type = root.ty();
        Self {
            root,
            functions: Vec::new(),
            slots: Vec::new(),
            return_type,
            metadata,
        }
    }

    pub fn with_functions(mut self, functions: Vec<FunctionBody>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_slots(mut self, slots: Vec<SlotInfo>) -> Self {
        self.slots = slots;
        self
    }

    /// Get a compiled function by id
    pub fn function(&self, id: FunctionId) -> Option<&FunctionBody> {
        self.functions.get(id.0)
    }

    /// Get a slot by name
    pub fn slot(&self, name: &str) -> Option<(usize, &SlotInfo)> {
        self.slots.iter().enumerate().find(|(_, slot)| slot.name == name)
    }

    /// Names of the input slots, in slot order
    pub fn slot_names(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.name.as_str()).collect()
    }
}

impl ProgramMetadata {
    /// Metadata for a program compiled from source text
    pub fn for_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    pub fn with_restriction(mut self, restriction: impl Into<String>) -> Self {
        self.restrictions.push(restriction.into());
        self
    }

    /// Add a custom metadata field
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }
}

impl Default for ProgramMetadata {
    fn default() -> Self {
        Self {
            source: None,
            restrictions: Vec::new(),
            custom: HashMap::new(),
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
