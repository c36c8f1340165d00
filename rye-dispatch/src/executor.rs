//! Primitive executors: the end of an executor chain (§4.12).
//!
//! Every tool declares `executor_id`, typically pointing at a runtime
//! item (e.g. "python script runtime"), which in turn points at a
//! primitive executor registered here by name — `subprocess` or
//! `http_client` in the contract, though embedders may register others.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DispatchError;

/// Something that can actually perform the work an item's chain resolves
/// to, given the caller's parameters.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run with `params`, returning the raw result value.
    async fn invoke(&self, params: serde_json::Value) -> Result<serde_json::Value, DispatchError>;
}

/// Named collection of primitive executors, keyed by the executor name
/// a chain terminates on (e.g. `"subprocess"`, `"http_client"`).
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a primitive executor under `name`.
    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn Executor>) {
        self.executors.insert(name.into(), executor);
    }

    /// Look up a primitive executor by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Executor>> {
        self.executors.get(name).cloned()
    }
}
