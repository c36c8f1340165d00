//! EchoThread — returns the directive inputs as the thread outputs.

use crate::error::ThreadError;
use crate::thread::{ExitReason, Thread, ThreadCost, ThreadInput, ThreadMetadata, ThreadOutput, ThreadStatus};
use async_trait::async_trait;

/// A thread implementation that echoes its inputs back as outputs.
/// Used for testing orchestration and hook integrations without a real
/// model provider.
pub struct EchoThread;

#[async_trait]
impl Thread for EchoThread {
    async fn execute(&self, input: ThreadInput) -> Result<ThreadOutput, ThreadError> {
        Ok(ThreadOutput {
            status: ThreadStatus::Completed,
            exit_reason: ExitReason::Complete,
            outputs: Some(input.inputs),
            parse_error: None,
            cost: ThreadCost::default(),
            metadata: ThreadMetadata::default(),
        })
    }
}
