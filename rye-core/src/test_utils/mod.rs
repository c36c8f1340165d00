//! In-memory implementations for testing.
//!
//! Available behind the `test-utils` feature flag. These are minimal
//! implementations that prove the trait APIs are usable.

mod echo_thread;
mod in_memory_store;
mod local_orchestrator;
mod logging_hook;

pub use echo_thread::EchoThread;
pub use in_memory_store::InMemoryStore;
pub use local_orchestrator::LocalOrchestrator;
pub use logging_hook::LoggingHook;
