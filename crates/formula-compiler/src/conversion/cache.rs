//! Shared memo tables for conversion search
//!
//! One cache may be shared by many compilers on many threads. Inserts are
//! insert-if-absent, so two threads resolving the same pair agree on the
//! stored result.

use dashmap::DashMap;
use formula_core::types::{ConversionOperator, ConversionPath, Type};
use std::sync::Arc;

/// Memoised conversion paths and per-type operator listings
#[derive(Debug, Default)]
pub struct ConversionCache {
    paths: DashMap<(Type, Type), Option<Arc<ConversionPath>>>,
    operators: DashMap<Type, Arc<Vec<ConversionOperator>>>,
}

impl ConversionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached search result; `Some(None)` records that no path exists
    pub fn path(&self, from: &Type, to: &Type) -> Option<Option<Arc<ConversionPath>>> {
        self.paths
            .get(&(from.clone(), to.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Store a search result, returning whichever result was stored first
    pub fn insert_path(
        &self,
        from: Type,
        to: Type,
        path: Option<ConversionPath>,
    ) -> Option<Arc<ConversionPath>> {
        self.paths
            .entry((from, to))
            .or_insert_with(|| path.map(Arc::new))
            .value()
            .clone()
    }

    /// Operators declared on `ty`, computed once per type
    pub fn operators<F>(&self, ty: &Type, list: F) -> Arc<Vec<ConversionOperator>>
    where
        F: FnOnce() -> Vec<ConversionOperator>,
    {
        if let Some(entry) = self.operators.get(ty) {
            return entry.value().clone();
        }
        self.operators
            .entry(ty.clone())
            .or_insert_with(|| Arc::new(list()))
            .value()
            .clone()
    }

    /// Number of memoised paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Forget every memoised entry
    pub fn clear(&self) {
        self.paths.clear();
        self.operators.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_core::types::ConversionStep;

    fn widen() -> ConversionPath {
        ConversionPath::single(ConversionStep::Primitive {
            from: Type::I32,
            to: Type::I64,
        })
    }

    #[test]
    fn test_first_insert_wins() {
        let cache = ConversionCache::new();
        let stored = cache.insert_path(Type::I32, Type::I64, Some(widen()));
        let second = cache.insert_path(Type::I32, Type::I64, None);

        assert_eq!(stored, second);
        assert_eq!(cache.path(&Type::I32, &Type::I64), Some(Some(Arc::new(widen()))));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_negative_results_are_cached() {
        let cache = ConversionCache::new();
        cache.insert_path(Type::Str, Type::I32, None);
        assert_eq!(cache.path(&Type::Str, &Type::I32), Some(None));
        assert_eq!(cache.path(&Type::I32, &Type::Str), None);
    }

    #[test]
    fn test_operator_listing_computed_once() {
        let cache = ConversionCache::new();
        let mut calls = 0;
        cache.operators(&Type::Decimal, || {
            calls += 1;
            Vec::new()
        });
        cache.operators(&Type::Decimal, || {
            calls += 1;
            Vec::new()
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_clear() {
        let cache = ConversionCache::new();
        cache.insert_path(Type::I32, Type::I64, Some(widen()));
        cache.clear();
        assert!(cache.is_empty());
    }
}
