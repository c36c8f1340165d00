#![deny(missing_docs)]
//! Context compaction and continuation handoff (§4.11).
//!
//! Two related but distinct concerns live here:
//!
//! - **Compaction strategies** ([`ContextStrategy`] implementations):
//!   [`SlidingWindow`], [`ToolResultClearing`], and [`Composite`] trim a
//!   thread's in-flight message list in place when context pressure
//!   crosses the *compaction* threshold. `rye_runner::ThreadRunner` is
//!   given one of these (boxed) at construction time.
//! - **Continuation handoff** ([`ContinuationManager`]): once context
//!   pressure crosses the higher *handoff* threshold, compacting in
//!   place isn't enough — the thread instead summarizes and hands its
//!   remaining work to a successor thread. The manager builds the
//!   effects and successor input for that handoff as plain data; it
//!   doesn't itself call a provider or spawn anything.

mod counter;
mod manager;
mod strategies;

pub use counter::TokenCounter;
pub use manager::{ContinuationManager, HandoffPlan, SUMMARY_KEY_PREFIX};
/// Re-exported so callers don't need a direct `rye-turn` dependency just
/// to name the trait these strategies implement.
pub use rye_turn::context::ContextStrategy;
pub use strategies::{Composite, SlidingWindow, ToolResultClearing};
