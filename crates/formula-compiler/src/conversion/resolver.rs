//! Conversion path search
//!
//! Paths between primitive numeric types are a single cast. Anything else
//! is searched through the catalog's declared operators: operators leaving
//! the source type (`fromPath`) and operators entering the target type
//! (`toPath`), recursing on the intermediate type. Conversions between
//! numbers and truth values come from a fixed synthetic table.

use super::cache::ConversionCache;
use crate::error::{CompileError, Result};
use formula_core::types::{ConversionPath, ConversionStep, Type, TypeCatalog};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

/// Ordering key of a candidate path: shorter, then fewer explicit
/// operators, then less lossy
type Cost = (usize, usize, usize);

/// Finds and memoises conversion paths for one type catalog
#[derive(Debug, Clone)]
pub struct ConversionResolver {
    catalog: Arc<TypeCatalog>,
    cache: Arc<ConversionCache>,
}

impl ConversionResolver {
    /// Resolver with a private cache
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self::with_cache(catalog, Arc::new(ConversionCache::new()))
    }

    /// Resolver sharing `cache`; the cache must only ever be used with this catalog
    pub fn with_cache(catalog: Arc<TypeCatalog>, cache: Arc<ConversionCache>) -> Self {
        Self { catalog, cache }
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<ConversionCache> {
        &self.cache
    }

    /// Cheapest path from `from` to `to`, or `None` when the types are unrelated
    pub fn find_path(&self, from: &Type, to: &Type) -> Option<Arc<ConversionPath>> {
        if let Some(cached) = self.cache.path(from, to) {
            trace!("Conversion cache hit: {} -> {}", from, to);
            return cached;
        }

        let mut visiting = HashSet::new();
        let path = self.search(from, to, &mut visiting);
        trace!(
            "Resolved conversion {} -> {}: {}",
            from,
            to,
            path.as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "none".to_string())
        );
        self.cache.insert_path(from.clone(), to.clone(), path)
    }

    /// Like `find_path`, failing with `NoConversionPath`
    pub fn require_path(&self, from: &Type, to: &Type) -> Result<Arc<ConversionPath>> {
        self.find_path(from, to)
            .ok_or_else(|| CompileError::NoConversionPath {
                from: from.clone(),
                to: to.clone(),
            })
    }

    pub fn can_convert(&self, from: &Type, to: &Type) -> bool {
        self.find_path(from, to).is_some()
    }

    /// Widest of `types` reachable from every one of them
    pub fn widest(&self, types: &[Type]) -> Option<Type> {
        let mut candidates: Vec<&Type> = types.iter().collect();
        candidates.sort_by(|a, b| b.width().cmp(&a.width()));
        candidates.dedup();
        candidates
            .into_iter()
            .find(|candidate| types.iter().all(|ty| self.can_convert(ty, candidate)))
            .cloned()
    }

    fn search(
        &self,
        from: &Type,
        to: &Type,
        visiting: &mut HashSet<(Type, Type)>,
    ) -> Option<ConversionPath> {
        if from == to || self.catalog.is_subtype(from, to) {
            return Some(ConversionPath::identity());
        }
        if from.is_primitive_numeric() && to.is_primitive_numeric() {
            return Some(ConversionPath::single(ConversionStep::Primitive {
                from: from.clone(),
                to: to.clone(),
            }));
        }

        let key = (from.clone(), to.clone());
        if !visiting.insert(key.clone()) {
            return None;
        }

        let from_path = self.from_path(from, to, visiting);
        let to_path = self.to_path(from, to, visiting);
        visiting.remove(&key);

        [from_path, to_path, synthetic(from, to)]
            .into_iter()
            .flatten()
            .fold(None, cheaper)
    }

    /// Best path starting with an operator that converts from `from`
    fn from_path(
        &self,
        from: &Type,
        to: &Type,
        visiting: &mut HashSet<(Type, Type)>,
    ) -> Option<ConversionPath> {
        let operators = self.cache.operators(from, || self.catalog.operators_on(from));
        let mut best: Option<ConversionPath> = None;
        for op in operators.iter().filter(|op| &op.from == from) {
            let Some(rest) = self.search(&op.to, to, visiting) else {
                continue;
            };
            let mut steps = vec![ConversionStep::Operator(op.clone())];
            steps.extend(rest.steps);
            best = cheaper(best, ConversionPath::new(steps));
        }
        best
    }

    /// Best path ending with an operator that converts to `to`
    fn to_path(
        &self,
        from: &Type,
        to: &Type,
        visiting: &mut HashSet<(Type, Type)>,
    ) -> Option<ConversionPath> {
        let operators = self.cache.operators(to, || self.catalog.operators_on(to));
        let mut best: Option<ConversionPath> = None;
        for op in operators.iter().filter(|op| &op.to == to) {
            let Some(head) = self.search(from, &op.from, visiting) else {
                continue;
            };
            let mut steps = head.steps;
            steps.push(ConversionStep::Operator(op.clone()));
            best = cheaper(best, ConversionPath::new(steps));
        }
        best
    }
}

fn cheaper(best: Option<ConversionPath>, candidate: ConversionPath) -> Option<ConversionPath> {
    match best {
        Some(best) if cost(&best) <= cost(&candidate) => Some(best),
        _ => Some(candidate),
    }
}

fn cost(path: &ConversionPath) -> Cost {
    let lossiness = path.steps.iter().map(step_loss).sum();
    (path.len(), path.explicit_count(), lossiness)
}

fn step_loss(step: &ConversionStep) -> usize {
    match step {
        ConversionStep::Primitive { from, to } => match (from.is_float(), to.is_float()) {
            (true, false) => 2,
            (false, true) => 1,
            _ if to.width() < from.width() => 1,
            _ => 0,
        },
        ConversionStep::NonZero { .. } => 1,
        ConversionStep::Operator(_) | ConversionStep::Select { .. } => 0,
    }
}

/// Numbers to truth values and back
fn synthetic(from: &Type, to: &Type) -> Option<ConversionPath> {
    match (from, to) {
        (from, Type::Bool) if from.is_numeric() => {
            Some(ConversionPath::single(ConversionStep::NonZero { from: from.clone() }))
        }
        (Type::Bool, to) if to.is_numeric() => {
            Some(ConversionPath::single(ConversionStep::Select { to: to.clone() }))
        }
        _ => None,
    }
}
