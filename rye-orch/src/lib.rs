#![deny(missing_docs)]
//! In-process implementation of the Orchestrator protocol (§4.10).
//!
//! Dispatches to registered directive threads via `HashMap<DirectiveId,
//! Arc<dyn Thread>>`. Each `spawn_thread` call runs its thread on its own
//! `tokio::spawn` task for true concurrent dispatch; `wait_threads` awaits
//! those tasks (with a timeout), `kill_thread` aborts the task. There's no
//! durability beyond whatever the thread's own Checkpoint/Registry writes
//! leave behind — cross-process orchestration (fork, SIGTERM, polling a
//! shared registry) is a different deployment shape this crate doesn't
//! implement.

use async_trait::async_trait;
use rye_core::duration::DurationMs;
use rye_core::effect::SignalPayload;
use rye_core::error::OrchError;
use rye_core::id::{DirectiveId, ThreadId};
use rye_core::orchestrator::{Orchestrator, SpawnOverrides, WaitOutcome};
use rye_core::thread::{Thread, ThreadInput, ThreadOutput, ThreadStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

struct ThreadRecord {
    status: ThreadStatus,
    output: Option<ThreadOutput>,
    handle: Option<JoinHandle<()>>,
}

/// In-process orchestrator that dispatches thread executions against a
/// registered set of directives.
///
/// Threads run concurrently — `spawn_thread` hands the thread off to a
/// `tokio::spawn` task and returns immediately, regardless of
/// `SpawnOverrides::detached`; detached-vs-attached only matters for a
/// cross-process fork, which this orchestrator doesn't perform.
pub struct LocalOrchestrator {
    directives: HashMap<String, Arc<dyn Thread>>,
    threads: Arc<Mutex<HashMap<String, ThreadRecord>>>,
    seq: AtomicU64,
}

impl LocalOrchestrator {
    /// Create a new empty orchestrator.
    pub fn new() -> Self {
        Self {
            directives: HashMap::new(),
            threads: Arc::new(Mutex::new(HashMap::new())),
            seq: AtomicU64::new(0),
        }
    }

    /// Register a thread implementation for a directive id.
    pub fn register(&mut self, id: DirectiveId, thread: Arc<dyn Thread>) {
        self.directives.insert(id.0, thread);
    }
}

impl Default for LocalOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Orchestrator for LocalOrchestrator {
    async fn spawn_thread(
        &self,
        directive: &DirectiveId,
        input: ThreadInput,
        _overrides: SpawnOverrides,
    ) -> Result<ThreadId, OrchError> {
        let thread = self
            .directives
            .get(directive.as_str())
            .cloned()
            .ok_or_else(|| OrchError::DirectiveNotFound(directive.to_string()))?;

        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        let thread_id = ThreadId::new(format!("{directive}-{n}"));
        let key = thread_id.as_str().to_owned();

        self.threads.lock().unwrap().insert(
            key.clone(),
            ThreadRecord {
                status: ThreadStatus::Running,
                output: None,
                handle: None,
            },
        );

        let threads = Arc::clone(&self.threads);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = thread.execute(input).await;
            let mut threads = threads.lock().unwrap();
            if let Some(record) = threads.get_mut(&task_key) {
                match result {
                    Ok(output) => {
                        record.status = output.status;
                        record.output = Some(output);
                    }
                    Err(_) => {
                        // The thread failed before producing a `ThreadOutput` at
                        // all (e.g. capability mint or checkpoint write failed).
                        // Callers observe this as a terminal `Error` with no
                        // output rather than a panic.
                        record.status = ThreadStatus::Error;
                    }
                }
            }
        });

        if let Some(record) = self.threads.lock().unwrap().get_mut(&key) {
            record.handle = Some(handle);
        }

        Ok(thread_id)
    }

    async fn wait_threads(
        &self,
        ids: &[ThreadId],
        timeout: DurationMs,
    ) -> Result<WaitOutcome, OrchError> {
        let deadline = tokio::time::Instant::now() + timeout.to_std();
        loop {
            {
                let threads = self.threads.lock().unwrap();
                let all_terminal = ids.iter().all(|id| {
                    threads
                        .get(id.as_str())
                        .map(|r| r.status != ThreadStatus::Running && r.status != ThreadStatus::Paused)
                        .unwrap_or(true)
                });
                if all_terminal || tokio::time::Instant::now() >= deadline {
                    let mut results = Vec::with_capacity(ids.len());
                    let mut aggregate_success = true;
                    for id in ids {
                        let output = threads.get(id.as_str()).and_then(|r| r.output.clone());
                        aggregate_success &= matches!(
                            output.as_ref().map(|o| o.status),
                            Some(ThreadStatus::Completed)
                        );
                        results.push(output);
                    }
                    return Ok(WaitOutcome { results, aggregate_success });
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    }

    async fn aggregate_results(
        &self,
        ids: &[ThreadId],
    ) -> Result<Vec<Option<ThreadOutput>>, OrchError> {
        let threads = self.threads.lock().unwrap();
        Ok(ids
            .iter()
            .map(|id| threads.get(id.as_str()).and_then(|r| r.output.clone()))
            .collect())
    }

    async fn get_status(&self, id: &ThreadId) -> Result<ThreadStatus, OrchError> {
        self.threads
            .lock()
            .unwrap()
            .get(id.as_str())
            .map(|r| r.status)
            .ok_or_else(|| OrchError::ThreadNotFound(id.to_string()))
    }

    async fn list_active(&self) -> Result<Vec<ThreadId>, OrchError> {
        Ok(self
            .threads
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| matches!(r.status, ThreadStatus::Running | ThreadStatus::Paused))
            .map(|(id, _)| ThreadId::new(id.clone()))
            .collect())
    }

    async fn kill_thread(&self, id: &ThreadId) -> Result<(), OrchError> {
        let mut threads = self.threads.lock().unwrap();
        let record = threads
            .get_mut(id.as_str())
            .ok_or_else(|| OrchError::ThreadNotFound(id.to_string()))?;
        if let Some(handle) = &record.handle {
            handle.abort();
        }
        record.status = ThreadStatus::Cancelled;
        Ok(())
    }

    async fn signal(&self, target: &ThreadId, _signal: SignalPayload) -> Result<(), OrchError> {
        // `Thread::execute` takes no inbound channel, so an in-process
        // thread has nothing to deliver a signal to yet — accept it as
        // long as the target is known, matching the contract's "accepted,
        // not processed" semantics.
        if self.threads.lock().unwrap().contains_key(target.as_str()) {
            Ok(())
        } else {
            Err(OrchError::ThreadNotFound(target.to_string()))
        }
    }
}
