//! The Tool Dispatcher: resolve → verify → capability-check → execute (§4.12).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use rye_capability::matcher::{action_string, check};
use rye_capability::token::CapabilityToken;

use crate::error::DispatchError;
use crate::executor::ExecutorRegistry;
use crate::item::{verify_item, Item, ItemRef, Space, TrustPolicy};

/// Resolves an [`ItemRef`] to an [`Item`] within a single space.
/// Implementations back this with a filesystem, an embedded bundle, or
/// (for tests) memory.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Look up `item_ref` in `space`, returning `None` if absent there.
    async fn lookup(&self, space: Space, item_ref: &ItemRef) -> Option<Item>;
}

/// In-memory [`ItemStore`], used in tests and for embedding small,
/// statically-known item sets.
#[derive(Default)]
pub struct InMemoryItemStore {
    items: RwLock<HashMap<(Space, ItemRef), Item>>,
}

impl InMemoryItemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) an item in the given space.
    pub fn insert(&self, space: Space, item: Item) {
        self.items.write().unwrap().insert((space, item.item_ref.clone()), item);
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn lookup(&self, space: Space, item_ref: &ItemRef) -> Option<Item> {
        self.items.read().unwrap().get(&(space, item_ref.clone())).cloned()
    }
}

/// A denied dispatch, returned as data rather than an error — the Runner
/// injects this as a tool-result instead of terminating the thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenialResult {
    /// The canonical action string that was denied.
    pub action: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Outcome of a dispatch: either the executor's raw result, or a
/// structured denial.
#[derive(Debug, Clone)]
pub enum DispatchResult {
    /// The action was allowed and the executor ran to completion.
    Completed(serde_json::Value),
    /// The capability token did not cover this action.
    Denied(DenialResult),
}

/// Resolves items across spaces, verifies their signatures, follows
/// executor chains to a primitive, capability-checks the action, and
/// invokes the terminal executor.
pub struct Dispatcher<S: ItemStore> {
    store: S,
    executors: ExecutorRegistry,
    trusted_keys: HashMap<String, VerifyingKey>,
    policy: TrustPolicy,
}

impl<S: ItemStore> Dispatcher<S> {
    /// Create a dispatcher over `store`, with the given registered
    /// primitive executors, trusted signing keys (by fingerprint), and
    /// trust policy.
    pub fn new(
        store: S,
        executors: ExecutorRegistry,
        trusted_keys: HashMap<String, VerifyingKey>,
        policy: TrustPolicy,
    ) -> Self {
        Self { store, executors, trusted_keys, policy }
    }

    /// Dispatch `item_ref` under the canonical action
    /// `rye.<primary>.<item_type>.<dotted_id>`, checked against `token`
    /// before any resolution happens.
    pub async fn dispatch(
        &self,
        token: &CapabilityToken,
        primary: &str,
        item_ref: &ItemRef,
        params: serde_json::Value,
    ) -> Result<DispatchResult, DispatchError> {
        let action = action_string(primary, &item_ref.item_type, &item_ref.dotted_id);
        if !check(token, &action).is_allowed() {
            return Ok(DispatchResult::Denied(DenialResult {
                action,
                reason: "not covered by capability token".to_string(),
            }));
        }

        let item = self.resolve(item_ref).await?;
        if !verify_item(&item, &self.trusted_keys, self.policy) {
            return Err(DispatchError::UntrustedItem(item_ref.dotted_id.clone()));
        }

        let executor = self.resolve_executor_chain(&item).await?;
        let result = executor.invoke(params).await?;
        Ok(DispatchResult::Completed(result))
    }

    /// Resolve `item_ref` across spaces in priority order: project, then
    /// user, then system. The first match wins.
    async fn resolve(&self, item_ref: &ItemRef) -> Result<Item, DispatchError> {
        for space in Space::resolution_order() {
            if let Some(item) = self.store.lookup(space, item_ref).await {
                return Ok(item);
            }
        }
        Err(DispatchError::NotFound {
            item_type: item_ref.item_type.clone(),
            dotted_id: item_ref.dotted_id.clone(),
        })
    }

    /// Follow `item`'s `executor_id` chain to a registered primitive,
    /// detecting cycles along the way.
    async fn resolve_executor_chain(&self, item: &Item) -> Result<Arc<dyn crate::executor::Executor>, DispatchError> {
        let mut seen = HashSet::new();
        let mut executor_id = item
            .executor_id
            .clone()
            .ok_or_else(|| DispatchError::ExecutorNotFound(item.item_ref.dotted_id.clone()))?;

        loop {
            if !seen.insert(executor_id.clone()) {
                return Err(DispatchError::ExecutorCycle(executor_id));
            }
            if let Some(executor) = self.executors.get(&executor_id) {
                return Ok(executor);
            }
            let next_ref = ItemRef::new("runtime", executor_id.clone());
            let next_item = self.resolve(&next_ref).await?;
            executor_id = next_item
                .executor_id
                .clone()
                .ok_or_else(|| DispatchError::ExecutorNotFound(executor_id.clone()))?;
        }
    }
}
