//! LocalOrchestrator — in-process orchestrator with a HashMap of directives.

use crate::duration::DurationMs;
use crate::effect::SignalPayload;
use crate::error::OrchError;
use crate::id::{DirectiveId, ThreadId};
use crate::orchestrator::{Orchestrator, SpawnOverrides, WaitOutcome};
use crate::thread::{Thread, ThreadInput, ThreadOutput, ThreadStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct ThreadRecord {
    status: ThreadStatus,
    output: Option<ThreadOutput>,
}

/// In-process orchestrator that dispatches thread executions against a
/// registered set of directives. Uses `Arc<dyn Thread>` so multiple
/// directives can share one registration and run concurrently via
/// `tokio::spawn`.
///
/// Threads are run eagerly to completion inside `spawn_thread` — there's
/// no background scheduler — which is enough to exercise the
/// `Orchestrator` trait contract in tests without a real event loop.
pub struct LocalOrchestrator {
    directives: HashMap<String, Arc<dyn Thread>>,
    threads: Mutex<HashMap<String, ThreadRecord>>,
}

impl LocalOrchestrator {
    /// Create a new empty orchestrator.
    pub fn new() -> Self {
        Self {
            directives: HashMap::new(),
            threads: Mutex::new(HashMap::new()),
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
            .ok_or_else(|| OrchError::DirectiveNotFound(directive.to_string()))?;
        let thread = Arc::clone(thread);

        let thread_id = ThreadId::new(format!("{directive}-0"));
        self.threads.lock().unwrap().insert(
            thread_id.as_str().to_owned(),
            ThreadRecord {
                status: ThreadStatus::Running,
                output: None,
            },
        );

        let output = thread.execute(input).await.map_err(OrchError::ThreadError)?;
        let mut threads = self.threads.lock().unwrap();
        if let Some(record) = threads.get_mut(thread_id.as_str()) {
            record.status = output.status;
            record.output = Some(output);
        }
        Ok(thread_id)
    }

    async fn wait_threads(
        &self,
        ids: &[ThreadId],
        _timeout: DurationMs,
    ) -> Result<WaitOutcome, OrchError> {
        let threads = self.threads.lock().unwrap();
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
        Ok(WaitOutcome {
            results,
            aggregate_success,
        })
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
        record.status = ThreadStatus::Cancelled;
        Ok(())
    }

    async fn signal(&self, target: &ThreadId, _signal: SignalPayload) -> Result<(), OrchError> {
        if self.threads.lock().unwrap().contains_key(target.as_str()) {
            Ok(())
        } else {
            Err(OrchError::ThreadNotFound(target.to_string()))
        }
    }
}
