//! Type conversion resolution

pub mod cache;
pub mod resolver;

pub use cache::ConversionCache;
pub use resolver::ConversionResolver;
