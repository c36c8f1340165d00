//! Thread registry rows and indexed queries (§4.3, §6.4).
//!
//! There's no dedicated registry trait in this workspace — a registry
//! row is just a value written under `Scope::Thread(id)` at a fixed
//! key, the same pattern `rye-checkpoint` uses for `"checkpoint"`.
//! `rye_registry::FsStore` and `rye_registry_memory::MemoryStore` are
//! both `StateStore`s, so either backs this without the Runner caring
//! which. Secondary indexes (by parent, chain root, and status) live
//! under `Scope::Global` as plain JSON arrays of thread ids —
//! `StateStore::list` only enumerates keys within a single scope and
//! can't discover which thread scopes exist, so the registry keeps its
//! own index rather than scanning.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rye_capability::RatedPattern;
use rye_checkpoint::LimitConfig;
use rye_core::effect::Scope;
use rye_core::error::StateError;
use rye_core::id::{DirectiveId, ThreadId};
use rye_core::state::StateStore;
use rye_core::thread::ThreadStatus;
use rye_dispatch::Space;

/// The key a thread's registry row is written under, within its own
/// `Scope::Thread` — mirrors `rye-checkpoint`'s `CHECKPOINT_KEY`.
pub const REGISTRY_KEY: &str = "registry";

fn parent_index_key(parent: &ThreadId) -> String {
    format!("registry_index:parent:{}", parent.as_str())
}

fn chain_root_index_key(root: &ThreadId) -> String {
    format!("registry_index:chain_root:{}", root.as_str())
}

fn status_index_key(status: RegistryStatus) -> String {
    format!("registry_index:status:{}", status.as_str())
}

/// Where a thread is in its lifecycle, as seen by the registry. Mirrors
/// `rye_core::thread::ThreadStatus` one-for-one, plus a `From`
/// conversion so a row can be moved straight from a `ThreadOutput`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryStatus {
    /// Actively looping.
    Running,
    /// Suspended by the caller, resumable without losing state.
    Paused,
    /// Reached a terminal success state.
    Completed,
    /// Reached a terminal failure state.
    Errored,
    /// Suspended by the runtime (limit hit awaiting escalation).
    Suspended,
    /// Terminated by external cancellation.
    Cancelled,
}

impl RegistryStatus {
    fn as_str(self) -> &'static str {
        match self {
            RegistryStatus::Running => "running",
            RegistryStatus::Paused => "paused",
            RegistryStatus::Completed => "completed",
            RegistryStatus::Errored => "errored",
            RegistryStatus::Suspended => "suspended",
            RegistryStatus::Cancelled => "cancelled",
        }
    }

    /// Whether this status counts as active for `list_active`.
    pub fn is_active(self) -> bool {
        matches!(self, RegistryStatus::Running | RegistryStatus::Paused | RegistryStatus::Suspended)
    }
}

impl From<ThreadStatus> for RegistryStatus {
    fn from(status: ThreadStatus) -> Self {
        match status {
            ThreadStatus::Running => RegistryStatus::Running,
            ThreadStatus::Paused => RegistryStatus::Paused,
            ThreadStatus::Completed => RegistryStatus::Completed,
            ThreadStatus::Error => RegistryStatus::Errored,
            ThreadStatus::Suspended => RegistryStatus::Suspended,
            ThreadStatus::Cancelled => RegistryStatus::Cancelled,
            // `ThreadStatus` is `#[non_exhaustive]`; an unrecognized
            // future variant is recorded as errored rather than silently
            // dropped from every status index.
            _ => RegistryStatus::Errored,
        }
    }
}

/// A thread's registry row (§6.4): the record an Orchestrator's
/// `list_active`/`get_status`/`resolve_chain` primitives read,
/// independent of the thread's own transcript or checkpoint.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// This thread's id.
    pub thread_id: ThreadId,
    /// The directive it's running.
    pub directive: DirectiveId,
    /// Model in use, if the directive (or runner default) resolved one.
    pub model: Option<String>,
    /// Current lifecycle status.
    pub status: RegistryStatus,
    /// The thread that spawned this one, if any.
    pub parent_id: Option<ThreadId>,
    /// The first thread in this chain of parent/continuation relationships.
    pub chain_root_id: ThreadId,
    /// The thread this one continues from, if it was spawned by a
    /// continuation handoff (§4.11).
    pub continuation_of: Option<ThreadId>,
    /// The thread this one handed off to, once that successor's row
    /// exists. Only written once the successor is created (§4.3's
    /// atomic-after-successor rule) via [`set_continuation_next`].
    pub continuation_next: Option<ThreadId>,
    /// Distance from `chain_root_id` along the parent/delegate lineage.
    pub depth: u32,
    /// Which space this thread's directive was resolved from.
    pub origin_space: Space,
    /// Turns executed so far.
    pub turns: u32,
    /// Cumulative input tokens.
    pub input_tokens: u64,
    /// Cumulative output tokens.
    pub output_tokens: u64,
    /// Cumulative spend in USD.
    pub spend: Decimal,
    /// Wall-clock duration so far, in seconds.
    pub duration_seconds: f64,
    /// The capability patterns minted for this thread.
    pub capabilities: Vec<RatedPattern>,
    /// The limits this thread is running under.
    pub limits: LimitConfig,
    /// Milliseconds since the Unix epoch this row was created.
    pub created_at: u64,
    /// Milliseconds since the Unix epoch this row was last updated.
    pub updated_at: u64,
}

impl RegistryEntry {
    /// A root thread's starting row: its own id is also its chain root,
    /// it has no parent or continuation lineage yet, and it starts at
    /// depth 0 with zeroed cost totals.
    #[allow(clippy::too_many_arguments)]
    pub fn root(
        thread_id: ThreadId,
        directive: DirectiveId,
        model: Option<String>,
        origin_space: Space,
        capabilities: Vec<RatedPattern>,
        limits: LimitConfig,
        now_ms: u64,
    ) -> Self {
        Self {
            chain_root_id: thread_id.clone(),
            thread_id,
            directive,
            model,
            status: RegistryStatus::Running,
            parent_id: None,
            continuation_of: None,
            continuation_next: None,
            depth: 0,
            origin_space,
            turns: 0,
            input_tokens: 0,
            output_tokens: 0,
            spend: Decimal::ZERO,
            duration_seconds: 0.0,
            capabilities,
            limits,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }
}

/// Errors specific to registry operations, beyond the underlying store's own.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The underlying state store rejected a read or write.
    #[error("state store error: {0}")]
    Store(#[from] StateError),
    /// No row exists for the given thread id.
    #[error("no registry row for thread {0}")]
    NotFound(String),
    /// Linking `continuation_next` would create a cycle back to the
    /// thread being linked.
    #[error("continuation_next cycle detected at {0}")]
    Cycle(String),
}

async fn read_index(store: &dyn StateStore, key: &str) -> Result<Vec<String>, StateError> {
    match store.read(&Scope::Global, key).await? {
        Some(value) => Ok(serde_json::from_value(value).unwrap_or_default()),
        None => Ok(Vec::new()),
    }
}

async fn append_index(store: &dyn StateStore, key: &str, thread_id: &str) -> Result<(), StateError> {
    let mut ids = read_index(store, key).await?;
    if !ids.iter().any(|id| id == thread_id) {
        ids.push(thread_id.to_string());
        let value = serde_json::to_value(&ids).map_err(|e| StateError::Serialization(e.to_string()))?;
        store.write(&Scope::Global, key, value).await?;
    }
    Ok(())
}

async fn remove_from_index(store: &dyn StateStore, key: &str, thread_id: &str) -> Result<(), StateError> {
    let mut ids = read_index(store, key).await?;
    let before = ids.len();
    ids.retain(|id| id != thread_id);
    if ids.len() != before {
        let value = serde_json::to_value(&ids).map_err(|e| StateError::Serialization(e.to_string()))?;
        store.write(&Scope::Global, key, value).await?;
    }
    Ok(())
}

async fn write_row(store: &dyn StateStore, entry: &RegistryEntry) -> Result<(), StateError> {
    let scope = Scope::Thread(entry.thread_id.clone());
    let value = serde_json::to_value(entry).map_err(|e| StateError::Serialization(e.to_string()))?;
    store.write(&scope, REGISTRY_KEY, value).await
}

/// Read a thread's registry row, if one has been written.
pub async fn get(store: &dyn StateStore, thread_id: &ThreadId) -> Result<Option<RegistryEntry>, StateError> {
    let scope = Scope::Thread(thread_id.clone());
    match store.read(&scope, REGISTRY_KEY).await? {
        None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StateError::Serialization(e.to_string())),
    }
}

/// Write (or overwrite) a thread's registry row without touching its
/// indexes — used when only in-place fields (cost totals,
/// `updated_at`) change and status hasn't moved. Prefer
/// [`create`]/[`update_status`] when status or lineage is changing.
pub async fn write_entry(store: &dyn StateStore, entry: &RegistryEntry) -> Result<(), StateError> {
    write_row(store, entry).await
}

/// Insert a new row, indexed by parent (if any), chain root, and status.
pub async fn create(store: &dyn StateStore, entry: &RegistryEntry) -> Result<(), StateError> {
    write_row(store, entry).await?;
    if let Some(parent) = &entry.parent_id {
        append_index(store, &parent_index_key(parent), entry.thread_id.as_str()).await?;
    }
    append_index(store, &chain_root_index_key(&entry.chain_root_id), entry.thread_id.as_str()).await?;
    append_index(store, &status_index_key(entry.status), entry.thread_id.as_str()).await?;
    Ok(())
}

/// Atomically move a row to a new status plus updated cost/duration
/// fields, re-indexing it under the new status.
#[allow(clippy::too_many_arguments)]
pub async fn update_status(
    store: &dyn StateStore,
    thread_id: &ThreadId,
    status: RegistryStatus,
    turns: u32,
    input_tokens: u64,
    output_tokens: u64,
    spend: Decimal,
    duration_seconds: f64,
    now_ms: u64,
) -> Result<RegistryEntry, RegistryError> {
    let mut entry = get(store, thread_id)
        .await?
        .ok_or_else(|| RegistryError::NotFound(thread_id.as_str().to_string()))?;
    let previous_status = entry.status;
    entry.status = status;
    entry.turns = turns;
    entry.input_tokens = input_tokens;
    entry.output_tokens = output_tokens;
    entry.spend = spend;
    entry.duration_seconds = duration_seconds;
    entry.updated_at = now_ms;
    write_row(store, &entry).await?;
    if previous_status != status {
        remove_from_index(store, &status_index_key(previous_status), thread_id.as_str()).await?;
        append_index(store, &status_index_key(status), thread_id.as_str()).await?;
    }
    Ok(entry)
}

/// Link `thread_id`'s `continuation_next` to `successor_id`. Requires
/// the successor's own row to already exist (§4.3's atomic-after-
/// successor rule — `continuation_next` is only written once the thing
/// it points at is real) and refuses to create a cycle: a successor
/// whose own chain already leads back to `thread_id` is rejected.
pub async fn set_continuation_next(
    store: &dyn StateStore,
    thread_id: &ThreadId,
    successor_id: &ThreadId,
) -> Result<(), RegistryError> {
    if get(store, successor_id).await?.is_none() {
        return Err(RegistryError::NotFound(successor_id.as_str().to_string()));
    }

    let mut seen = HashSet::new();
    seen.insert(thread_id.as_str().to_string());
    let mut cursor = successor_id.clone();
    loop {
        if !seen.insert(cursor.as_str().to_string()) {
            return Err(RegistryError::Cycle(cursor.as_str().to_string()));
        }
        match get(store, &cursor).await? {
            Some(row) => match row.continuation_next {
                Some(next) => cursor = next,
                None => break,
            },
            None => break,
        }
    }

    let mut entry = get(store, thread_id)
        .await?
        .ok_or_else(|| RegistryError::NotFound(thread_id.as_str().to_string()))?;
    entry.continuation_next = Some(successor_id.clone());
    write_row(store, &entry).await?;
    Ok(())
}

/// All rows whose `parent_id` is `parent`.
pub async fn list_by_parent(store: &dyn StateStore, parent: &ThreadId) -> Result<Vec<RegistryEntry>, StateError> {
    let ids = read_index(store, &parent_index_key(parent)).await?;
    let mut rows = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(row) = get(store, &ThreadId::new(id)).await? {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Every row currently `running`, `paused`, or `suspended`.
pub async fn list_active(store: &dyn StateStore) -> Result<Vec<RegistryEntry>, StateError> {
    let mut rows = Vec::new();
    for status in [RegistryStatus::Running, RegistryStatus::Paused, RegistryStatus::Suspended] {
        for id in read_index(store, &status_index_key(status)).await? {
            if let Some(row) = get(store, &ThreadId::new(id)).await? {
                rows.push(row);
            }
        }
    }
    Ok(rows)
}

/// Follow `continuation_next` from `thread_id` to the terminal record in
/// its chain, guarded by the same cycle detector as [`set_continuation_next`].
pub async fn resolve_chain(store: &dyn StateStore, thread_id: &ThreadId) -> Result<RegistryEntry, RegistryError> {
    let mut seen = HashSet::new();
    let mut current = get(store, thread_id)
        .await?
        .ok_or_else(|| RegistryError::NotFound(thread_id.as_str().to_string()))?;
    seen.insert(current.thread_id.as_str().to_string());
    while let Some(next_id) = current.continuation_next.clone() {
        if !seen.insert(next_id.as_str().to_string()) {
            return Err(RegistryError::Cycle(next_id.as_str().to_string()));
        }
        current = get(store, &next_id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(next_id.as_str().to_string()))?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rye_registry_memory::MemoryStore;

    fn sample(thread_id: &str, now_ms: u64) -> RegistryEntry {
        RegistryEntry::root(
            ThreadId::new(thread_id),
            DirectiveId::new("review_pr"),
            Some("test-model".into()),
            Space::Project,
            vec![RatedPattern::new("rye.execute.tool.*", rye_capability::RiskTier::Safe)],
            LimitConfig::default(),
            now_ms,
        )
    }

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let store = MemoryStore::new();
        let entry = sample("t1", 1_000);
        create(&store, &entry).await.unwrap();

        let read_back = get(&store, &entry.thread_id).await.unwrap().unwrap();
        assert_eq!(read_back.status, RegistryStatus::Running);
        assert_eq!(read_back.chain_root_id, ThreadId::new("t1"));
    }

    #[tokio::test]
    async fn unknown_thread_returns_none() {
        let store = MemoryStore::new();
        let found = get(&store, &ThreadId::new("missing")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn list_by_parent_finds_children() {
        let store = MemoryStore::new();
        let mut child = sample("child-1", 1_000);
        child.parent_id = Some(ThreadId::new("parent-1"));
        create(&store, &child).await.unwrap();

        let other = sample("unrelated", 1_000);
        create(&store, &other).await.unwrap();

        let children = list_by_parent(&store, &ThreadId::new("parent-1")).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].thread_id, ThreadId::new("child-1"));
    }

    #[tokio::test]
    async fn list_active_excludes_terminal_statuses() {
        let store = MemoryStore::new();
        create(&store, &sample("running", 1_000)).await.unwrap();
        create(&store, &sample("done", 1_000)).await.unwrap();
        update_status(&store, &ThreadId::new("done"), RegistryStatus::Completed, 3, 10, 5, Decimal::ZERO, 1.0, 2_000)
            .await
            .unwrap();

        let active = list_active(&store).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].thread_id, ThreadId::new("running"));
    }

    #[tokio::test]
    async fn update_status_moves_between_status_indexes() {
        let store = MemoryStore::new();
        create(&store, &sample("t1", 1_000)).await.unwrap();

        update_status(&store, &ThreadId::new("t1"), RegistryStatus::Suspended, 1, 0, 0, Decimal::ZERO, 0.5, 1_500)
            .await
            .unwrap();
        assert_eq!(list_active(&store).await.unwrap().len(), 1);

        update_status(&store, &ThreadId::new("t1"), RegistryStatus::Errored, 1, 0, 0, Decimal::ZERO, 0.5, 2_000)
            .await
            .unwrap();
        assert!(list_active(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolve_chain_follows_continuation_next_to_the_terminal_row() {
        let store = MemoryStore::new();
        create(&store, &sample("t1", 1_000)).await.unwrap();
        create(&store, &sample("t2", 1_000)).await.unwrap();
        create(&store, &sample("t3", 1_000)).await.unwrap();

        set_continuation_next(&store, &ThreadId::new("t1"), &ThreadId::new("t2")).await.unwrap();
        set_continuation_next(&store, &ThreadId::new("t2"), &ThreadId::new("t3")).await.unwrap();

        let terminal = resolve_chain(&store, &ThreadId::new("t1")).await.unwrap();
        assert_eq!(terminal.thread_id, ThreadId::new("t3"));
    }

    #[tokio::test]
    async fn resolve_chain_on_a_row_with_no_successor_returns_itself() {
        let store = MemoryStore::new();
        create(&store, &sample("solo", 1_000)).await.unwrap();

        let terminal = resolve_chain(&store, &ThreadId::new("solo")).await.unwrap();
        assert_eq!(terminal.thread_id, ThreadId::new("solo"));
    }

    #[tokio::test]
    async fn set_continuation_next_rejects_linking_back_to_self() {
        let store = MemoryStore::new();
        create(&store, &sample("t1", 1_000)).await.unwrap();
        create(&store, &sample("t2", 1_000)).await.unwrap();
        set_continuation_next(&store, &ThreadId::new("t2"), &ThreadId::new("t1")).await.unwrap();

        let err = set_continuation_next(&store, &ThreadId::new("t1"), &ThreadId::new("t2")).await.unwrap_err();
        assert!(matches!(err, RegistryError::Cycle(_)));
    }

    #[tokio::test]
    async fn set_continuation_next_requires_the_successor_to_already_exist() {
        let store = MemoryStore::new();
        create(&store, &sample("t1", 1_000)).await.unwrap();

        let err = set_continuation_next(&store, &ThreadId::new("t1"), &ThreadId::new("ghost")).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }
}
