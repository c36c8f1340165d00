//! LoggingHook — logs every event and always returns Continue.

use crate::error::HookError;
use crate::hook::{Hook, HookAction, HookContext, HookEvent};
use async_trait::async_trait;
use std::sync::Mutex;

/// A recorded hook event for inspection in tests.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    /// The hook event that fired.
    pub event: HookEvent,
    /// Tokens used at the time of the event.
    pub tokens_used: u64,
    /// Turn number at the time of the event, if any.
    pub turn_number: Option<u32>,
}

/// A hook that records every event and always returns [`HookAction::Continue`].
/// Use `.events()` to inspect what was recorded.
pub struct LoggingHook {
    watched: Vec<HookEvent>,
    recorded: Mutex<Vec<RecordedEvent>>,
}

impl LoggingHook {
    /// Create a new LoggingHook that fires at every hook event.
    pub fn new() -> Self {
        Self {
            watched: vec![
                HookEvent::ThreadStarted,
                HookEvent::StepStart,
                HookEvent::AfterStep,
                HookEvent::AfterComplete,
                HookEvent::Error,
                HookEvent::Limit,
                HookEvent::ContextWindowPressure,
                HookEvent::DirectiveReturn,
                HookEvent::GraphStarted,
                HookEvent::GraphCompleted,
            ],
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Return a snapshot of all recorded events.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.recorded.lock().unwrap().clone()
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hook for LoggingHook {
    fn events(&self) -> &[HookEvent] {
        &self.watched
    }

    async fn on_event(&self, ctx: &HookContext) -> Result<HookAction, HookError> {
        self.recorded.lock().unwrap().push(RecordedEvent {
            event: ctx.event,
            tokens_used: ctx.tokens_used,
            turn_number: ctx.turn_number,
        });
        Ok(HookAction::Continue)
    }
}
