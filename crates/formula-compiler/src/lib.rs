//! Formula Compiler - expression AST to executable IR
//!
//! Compilation runs in two stages. An [`OptimizationPipeline`] rewrites the
//! tree pass by pass (inlining, exponent simplification, flattening and
//! literal folding); the [`Backend`] then lowers it to typed IR nodes,
//! guided by the expected return type and the cached
//! [`ConversionResolver`].

pub mod codegen;
pub mod compiler;
pub mod conversion;
pub mod error;
pub mod optimizer;
pub mod options;

// Re-export main types
pub use compiler::Compiler;
pub use error::{CompileError, Result};
pub use options::{CompilerOptions, InliningOptions};

pub use codegen::{
    Backend, Builtin, BuiltinRegistry, HostBuiltin, IfBuiltin, MathBuiltin, PowerStrategy,
};
pub use conversion::{ConversionCache, ConversionResolver};
pub use optimizer::{
    BinaryCombiner, ExponentSimplifier, FunctionInliner, LiteralCombiner, OptimizationPass,
    OptimizationPipeline, Optimized, Rewrite,
};
