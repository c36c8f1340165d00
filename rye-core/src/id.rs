//! Typed ID wrappers for thread, directive, token, reservation, and approval identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up thread IDs, directive IDs, etc.
/// These are just strings underneath — no UUID enforcement, no format
/// requirement beyond what the minting component chooses.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(ThreadId, "Identifies one execution of one directive: `{directive_id}-{epoch_seconds}`.");
typed_id!(DirectiveId, "Identifies a directive (declarative program) independent of any run.");
typed_id!(TokenId, "Identifies a minted capability token.");
typed_id!(
    ReservationId,
    "Identifies a budget reservation between a parent and child thread."
);
typed_id!(
    ApprovalId,
    "Identifies a pending approval request created by the `escalate` hook action."
);
