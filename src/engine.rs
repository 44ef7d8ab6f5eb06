use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ast::{Formula, ParameterSource};
use crate::error::Error;
use crate::function::FunctionRegistry;
use crate::generate::Compiled;
use crate::tolerance::Tolerance;
use crate::value::Value;

type CacheKey = (String, Option<Tolerance>);

/// Parses, simplifies and generates formulas against one parameter source,
/// caching the result per formula text and tolerance.
///
/// The cache is unbounded unless [`Engine::with_cache_limit`] is set. Hosts
/// compiling arbitrary user text should set a limit or call
/// [`Engine::clear`].
#[derive(Debug)]
pub struct Engine {
    parameters: Arc<ParameterSource>,
    functions: FunctionRegistry,
    cache: RwLock<HashMap<CacheKey, Compiled>>,
    cache_limit: Option<usize>,
}

impl Engine {
    /// An engine with the built-in functions.
    pub fn new(parameters: Arc<ParameterSource>) -> Self {
        Self::with_functions(parameters, FunctionRegistry::builtin())
    }

    pub fn with_functions(parameters: Arc<ParameterSource>, functions: FunctionRegistry) -> Self {
        Self {
            parameters,
            functions,
            cache: RwLock::new(HashMap::new()),
            cache_limit: None,
        }
    }

    /// Keeps at most `limit` compilations (at least one). A full cache is
    /// emptied before the next new entry is stored.
    pub fn with_cache_limit(mut self, limit: usize) -> Self {
        self.cache_limit = Some(limit.max(1));
        self
    }

    pub fn parameters(&self) -> &Arc<ParameterSource> {
        &self.parameters
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn compile(&self, formula: &str) -> Result<Compiled, Error> {
        self.cached((formula.to_string(), None))
    }

    pub fn compile_with_tolerance(
        &self,
        formula: &str,
        tolerance: &Tolerance,
    ) -> Result<Compiled, Error> {
        self.cached((formula.to_string(), Some(*tolerance)))
    }

    /// Compiles `formula` (or reuses a cached compilation) and evaluates it.
    pub fn evaluate(&self, formula: &str, arguments: &[Value]) -> Result<Value, Error> {
        Ok(self.compile(formula)?.evaluate(arguments)?)
    }

    /// Number of cached compilations.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn cached(&self, key: CacheKey) -> Result<Compiled, Error> {
        if let Some(compiled) = self.read().get(&key) {
            tracing::trace!(formula = %key.0, "cache hit");
            return Ok(compiled.clone());
        }

        tracing::debug!(formula = %key.0, tolerance = ?key.1, "compiling");
        let formula = Formula::parse(&key.0, Arc::clone(&self.parameters), &self.functions)?;
        let compiled = match &key.1 {
            Some(tolerance) => formula.generate_with_tolerance(tolerance)?,
            None => formula.generate()?,
        };
        let mut cache = self.write();
        if let Some(limit) = self.cache_limit {
            if cache.len() >= limit && !cache.contains_key(&key) {
                tracing::debug!(limit, "cache full, clearing");
                cache.clear();
            }
        }
        // Another thread may have compiled the same key meanwhile; either copy
        // is equivalent.
        Ok(cache.entry(key).or_insert(compiled).clone())
    }

    // Poisoning is ignored: entries are only ever inserted whole.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<CacheKey, Compiled>> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<CacheKey, Compiled>> {
        self.cache.write().unwrap_or_else(|e| e.into_inner())
    }
}
