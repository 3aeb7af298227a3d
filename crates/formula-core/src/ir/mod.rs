//! Executable intermediate representation
//!
//! The IR is a typed node tree specialised to the numeric types chosen at
//! compile time. It is the target of the compiler backend and the input of
//! the runtime executor.

pub mod node;
pub mod program;

pub use node::{FunctionId, HostFn, HostFunction, MathFunction, NativeFunction, Node};
pub use program::{FunctionBody, Program, ProgramMetadata, SlotInfo};
