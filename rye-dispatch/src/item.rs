//! Item addressing, spaces, and signature verification (§4.12, §6.2).

use std::collections::HashMap;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Where an item was resolved from. Checked in this order — project wins
/// over user wins over system, and the first match fully replaces any
/// lower-priority entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Space {
    /// The current project's own items.
    Project,
    /// Items scoped to the invoking user, shared across their projects.
    User,
    /// System-wide items, shared across all users.
    System,
}

impl Space {
    /// Resolution order: project, then user, then system.
    pub fn resolution_order() -> [Space; 3] {
        [Space::Project, Space::User, Space::System]
    }

    /// The directory name a space lives under.
    pub fn dir_name(self) -> &'static str {
        match self {
            Space::Project => "project",
            Space::User => "user",
            Space::System => "system",
        }
    }
}

/// Address of an item: its type (`tool`, `runtime`, ...) and dotted id
/// (`a.b.c`), independent of which space it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    /// The item's declared type, e.g. `tool` or `runtime`.
    pub item_type: String,
    /// The item's dotted id, e.g. `fetch.http`.
    pub dotted_id: String,
}

impl ItemRef {
    /// Create an item reference.
    pub fn new(item_type: impl Into<String>, dotted_id: impl Into<String>) -> Self {
        Self { item_type: item_type.into(), dotted_id: dotted_id.into() }
    }

    /// Path fragment this item resolves to within a space:
    /// `<item_type>/<dotted/id>.<ext>` (§6.2: dots in the id become path
    /// separators).
    pub fn path_fragment(&self, ext: &str) -> String {
        format!("{}/{}.{}", self.item_type, self.dotted_id.replace('.', "/"), ext)
    }
}

/// Integrity header carried by every item (§4.12): a timestamp, the
/// content's SHA-256 digest, an Ed25519 signature over that digest, and
/// the signing key's fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureHeader {
    /// When the item was signed, in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// SHA-256 digest of the item's content.
    pub content_sha256: [u8; 32],
    /// Ed25519 signature over `content_sha256`.
    pub signature: Vec<u8>,
    /// Fingerprint identifying which trusted key signed this item.
    pub key_fingerprint: String,
}

/// A resolved item: its content, declared executor, space of origin, and
/// signature header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// This item's address.
    pub item_ref: ItemRef,
    /// Which space it was resolved from.
    pub space: Space,
    /// The item this one delegates execution to, if any. Tools declare
    /// this; primitive executors (`subprocess`, `http_client`) leave it
    /// unset.
    pub executor_id: Option<String>,
    /// The item's own declared content (schema, parameters, script body —
    /// opaque to the dispatcher).
    pub content: serde_json::Value,
    /// Integrity header.
    pub signature: SignatureHeader,
}

/// Per-space trust policy: whether unsigned or tampered items are
/// accepted anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrustPolicy {
    /// If true, an item that fails verification is used anyway.
    pub allow_unsigned: bool,
}

/// Fingerprint a verifying key as a hex-encoded SHA-256 digest of its
/// raw bytes.
pub fn key_fingerprint(key: &VerifyingKey) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Sign `content` with `key`, producing the header an [`Item`] carries.
/// Used by item authors (and by tests) to produce the header [`verify_item`] checks.
pub fn sign_content(key: &SigningKey, content: &serde_json::Value, timestamp: u64) -> SignatureHeader {
    let digest: [u8; 32] = Sha256::digest(content.to_string().as_bytes()).into();
    let signature = key.sign(&digest);
    SignatureHeader {
        timestamp,
        content_sha256: digest,
        signature: signature.to_bytes().to_vec(),
        key_fingerprint: key_fingerprint(&key.verifying_key()),
    }
}

/// Verifies an item's signature header against a trust store of known
/// verifying keys, keyed by fingerprint. Unsigned or tampered items are
/// rejected unless `policy.allow_unsigned` opts in.
pub fn verify_item(item: &Item, trusted_keys: &HashMap<String, VerifyingKey>, policy: TrustPolicy) -> bool {
    let digest: [u8; 32] = Sha256::digest(item.content.to_string().as_bytes()).into();
    if digest != item.signature.content_sha256 {
        return policy.allow_unsigned;
    }
    let Some(key) = trusted_keys.get(&item.signature.key_fingerprint) else {
        return policy.allow_unsigned;
    };
    let sig_bytes: [u8; 64] = match item.signature.signature.clone().try_into() {
        Ok(b) => b,
        Err(_) => return policy.allow_unsigned,
    };
    let signature = Signature::from_bytes(&sig_bytes);
    key.verify(&digest, &signature).is_ok() || policy.allow_unsigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn signed_item_verifies() {
        let key = SigningKey::generate(&mut OsRng);
        let content = serde_json::json!({"body": "echo hi"});
        let signature = sign_content(&key, &content, 0);
        let item = Item {
            item_ref: ItemRef::new("tool", "echo"),
            space: Space::Project,
            executor_id: Some("subprocess".into()),
            content,
            signature,
        };
        let mut trusted = HashMap::new();
        trusted.insert(key_fingerprint(&key.verifying_key()), key.verifying_key());

        assert!(verify_item(&item, &trusted, TrustPolicy::default()));
    }

    #[test]
    fn tampered_content_fails_closed() {
        let key = SigningKey::generate(&mut OsRng);
        let signature = sign_content(&key, &serde_json::json!({"body": "echo hi"}), 0);
        let item = Item {
            item_ref: ItemRef::new("tool", "echo"),
            space: Space::Project,
            executor_id: None,
            content: serde_json::json!({"body": "rm -rf /"}),
            signature,
        };
        let mut trusted = HashMap::new();
        trusted.insert(key_fingerprint(&key.verifying_key()), key.verifying_key());

        assert!(!verify_item(&item, &trusted, TrustPolicy::default()));
    }

    #[test]
    fn tampered_content_passes_when_space_opts_in_to_unsigned() {
        let key = SigningKey::generate(&mut OsRng);
        let signature = sign_content(&key, &serde_json::json!({"body": "echo hi"}), 0);
        let item = Item {
            item_ref: ItemRef::new("tool", "echo"),
            space: Space::Project,
            executor_id: None,
            content: serde_json::json!({"body": "rm -rf /"}),
            signature,
        };
        let policy = TrustPolicy { allow_unsigned: true };
        assert!(verify_item(&item, &HashMap::new(), policy));
    }

    #[test]
    fn unknown_signer_fails_closed() {
        let key = SigningKey::generate(&mut OsRng);
        let content = serde_json::json!({"body": "echo hi"});
        let signature = sign_content(&key, &content, 0);
        let item = Item {
            item_ref: ItemRef::new("tool", "echo"),
            space: Space::Project,
            executor_id: None,
            content,
            signature,
        };
        assert!(!verify_item(&item, &HashMap::new(), TrustPolicy::default()));
    }

    #[test]
    fn path_fragment_substitutes_dots_for_slashes() {
        let item_ref = ItemRef::new("tool", "fetch.http");
        assert_eq!(item_ref.path_fragment("py"), "tool/fetch/http.py");
    }
}
