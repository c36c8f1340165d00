#![deny(missing_docs)]
//! Capability tokens and permission matching (§4.1).
//!
//! An Ed25519-signed token holds a set of permission patterns; minting a
//! child token from a parent's patterns enforces attenuation — a child
//! can only narrow, never widen, what it was handed. The matcher checks
//! a requested action string against a token's patterns using the
//! hierarchical wildcard syntax `rye.<primary>.<item_type>.<dotted.id>`.
//!
//! Private keys are held by the caller (typically the Orchestrator),
//! never by this crate — `mint`/`verify` take a [`ed25519_dalek::SigningKey`]
//! / [`ed25519_dalek::VerifyingKey`] as parameters rather than managing
//! key material themselves.

pub mod matcher;
pub mod pattern;
pub mod token;

pub use matcher::{check, Decision};
pub use pattern::{Pattern, RatedPattern, RiskTier};
pub use token::{mint, verify, CapabilityError, CapabilityToken};
