#![deny(missing_docs)]
//! The Tool Dispatcher (§4.12): resolve an item across project, user,
//! and system spaces, verify its signature, capability-check the
//! requested action, follow its executor chain to a primitive, and
//! invoke it.
//!
//! Denials are ordinary values, not errors — [`DispatchResult::Denied`]
//! carries a structured reason the Thread Runner injects as a
//! tool-result rather than terminating the thread.

mod dispatcher;
mod error;
mod executor;
mod item;

pub use dispatcher::{DenialResult, Dispatcher, DispatchResult, InMemoryItemStore, ItemStore};
pub use error::DispatchError;
pub use executor::{Executor, ExecutorRegistry};
pub use item::{key_fingerprint, sign_content, verify_item, Item, ItemRef, SignatureHeader, Space, TrustPolicy};
