//! The Capability Token: an Ed25519-signed credential holding a set of
//! permission patterns, with attenuation enforced at mint time (§3, §4.1).

use crate::pattern::{RatedPattern, RiskTier};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rye_core::{duration::DurationMs, id::ThreadId, id::TokenId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from minting, verifying, or checking capability tokens.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// A requested pattern is not covered by the parent token's patterns.
    #[error("pattern not covered by parent: {0}")]
    NotCovered(String),

    /// The root thread was minted with no patterns at all — a
    /// misconfiguration, rejected before the first tool dispatch (§4.1).
    #[error("empty capability set for root thread")]
    EmptyRootCapabilities,

    /// An `elevated` pattern has no matching risk acknowledgment in the
    /// directive.
    #[error("elevated pattern {0} requires a risk acknowledgment")]
    MissingElevatedAcknowledgment(String),

    /// An `unrestricted` pattern is present without an acknowledgment.
    #[error("unrestricted pattern {0} requires a risk acknowledgment")]
    MissingUnrestrictedAcknowledgment(String),

    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    InvalidSignature(String),

    /// The token has expired.
    #[error("token expired at {0}")]
    Expired(u64),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// An Ed25519-signed capability token (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityToken {
    /// This token's id.
    pub token_id: TokenId,
    /// The parent token's id, if any (absent for the root thread).
    pub parent_token_id: Option<TokenId>,
    /// When this token was minted, in milliseconds since the Unix epoch.
    pub issued_at: u64,
    /// When this token expires, in milliseconds since the Unix epoch.
    pub expires_at: u64,
    /// The thread this token was minted for.
    pub thread_id: ThreadId,
    /// The patterns this token grants, each with its risk tier.
    pub patterns: Vec<RatedPattern>,
    /// Highest risk tier among `patterns`, recorded for quick inspection.
    pub risk_tier: RiskTier,
    /// Ed25519 signature over the canonical serialization of the fields
    /// above (everything except this field).
    pub signature: Vec<u8>,
}

/// Canonical bytes signed over — every field of the token except the
/// signature itself, in a fixed order so sign and verify agree.
fn signing_bytes(
    token_id: &TokenId,
    parent_token_id: &Option<TokenId>,
    issued_at: u64,
    expires_at: u64,
    thread_id: &ThreadId,
    patterns: &[RatedPattern],
) -> Vec<u8> {
    let canonical = serde_json::json!({
        "token_id": token_id.as_str(),
        "parent_token_id": parent_token_id.as_ref().map(TokenId::as_str),
        "issued_at": issued_at,
        "expires_at": expires_at,
        "thread_id": thread_id.as_str(),
        "patterns": patterns,
    });
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&canonical).unwrap_or_default());
    hasher.finalize().to_vec()
}

fn highest_risk(patterns: &[RatedPattern]) -> RiskTier {
    patterns
        .iter()
        .map(|p| p.risk)
        .max_by_key(|r| match r {
            RiskTier::Safe => 0,
            RiskTier::Write => 1,
            RiskTier::Elevated => 2,
            RiskTier::Unrestricted => 3,
        })
        .unwrap_or(RiskTier::Safe)
}

/// Mint a new token from a parent's granted patterns and a set of
/// requested patterns, enforcing attenuation: every requested pattern
/// must be covered by some pattern the parent holds (§4.1).
///
/// `parent_patterns` is `None` only for the root thread, in which case
/// `requested` is taken as-is (there is no parent to attenuate against)
/// but must be non-empty.
pub fn mint(
    signing_key: &SigningKey,
    parent_token_id: Option<TokenId>,
    parent_patterns: Option<&[RatedPattern]>,
    requested: Vec<RatedPattern>,
    thread_id: ThreadId,
    ttl: DurationMs,
    now_ms: u64,
) -> Result<CapabilityToken, CapabilityError> {
    if parent_patterns.is_none() && requested.is_empty() {
        return Err(CapabilityError::EmptyRootCapabilities);
    }

    if let Some(parent_patterns) = parent_patterns {
        for rated in &requested {
            let covered = parent_patterns
                .iter()
                .any(|p| rated.pattern.covered_by(&p.pattern));
            if !covered {
                return Err(CapabilityError::NotCovered(rated.pattern.to_string()));
            }
        }
    }

    let token_id = TokenId::new(format!("tok-{thread_id}-{now_ms}"));
    let expires_at = now_ms + ttl.as_millis();
    let risk_tier = highest_risk(&requested);

    let digest = signing_bytes(
        &token_id,
        &parent_token_id,
        now_ms,
        expires_at,
        &thread_id,
        &requested,
    );
    let signature = signing_key.sign(&digest);

    Ok(CapabilityToken {
        token_id,
        parent_token_id,
        issued_at: now_ms,
        expires_at,
        thread_id,
        patterns: requested,
        risk_tier,
        signature: signature.to_bytes().to_vec(),
    })
}

/// Verify a token's signature and expiry against a trusted verifying key.
pub fn verify(
    token: &CapabilityToken,
    verifying_key: &VerifyingKey,
    now_ms: u64,
) -> Result<(), CapabilityError> {
    if now_ms > token.expires_at {
        return Err(CapabilityError::Expired(token.expires_at));
    }

    let digest = signing_bytes(
        &token.token_id,
        &token.parent_token_id,
        token.issued_at,
        token.expires_at,
        &token.thread_id,
        &token.patterns,
    );

    let sig_bytes: [u8; 64] = token
        .signature
        .as_slice()
        .try_into()
        .map_err(|_| CapabilityError::InvalidSignature("wrong signature length".into()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    verifying_key
        .verify(&digest, &signature)
        .map_err(|e| CapabilityError::InvalidSignature(e.to_string()))
}

/// Check that every `elevated`/`unrestricted` pattern in `patterns` has a
/// matching acknowledgment in `acknowledged` (risk tiers a directive
/// declared via `<acknowledge risk="...">`).
pub fn check_acknowledgments(
    patterns: &[RatedPattern],
    acknowledged: &[RiskTier],
) -> Result<(), CapabilityError> {
    for rated in patterns {
        match rated.risk {
            RiskTier::Elevated if !acknowledged.contains(&RiskTier::Elevated) => {
                return Err(CapabilityError::MissingElevatedAcknowledgment(
                    rated.pattern.to_string(),
                ));
            }
            RiskTier::Unrestricted if !acknowledged.contains(&RiskTier::Unrestricted) => {
                return Err(CapabilityError::MissingUnrestrictedAcknowledgment(
                    rated.pattern.to_string(),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    fn test_key() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    #[test]
    fn root_mint_rejects_empty_patterns() {
        let key = test_key();
        let err = mint(
            &key,
            None,
            None,
            vec![],
            ThreadId::new("t-1"),
            DurationMs::from_secs(3600),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, CapabilityError::EmptyRootCapabilities));
    }

    #[test]
    fn root_mint_with_patterns_succeeds_and_verifies() {
        let key = test_key();
        let verifying = key.verifying_key();
        let patterns = vec![RatedPattern::new("rye.execute.tool.*", RiskTier::Safe)];
        let token = mint(
            &key,
            None,
            None,
            patterns,
            ThreadId::new("t-1"),
            DurationMs::from_secs(3600),
            1_000,
        )
        .unwrap();
        verify(&token, &verifying, 1_500).unwrap();
    }

    #[test]
    fn child_mint_rejects_pattern_not_covered_by_parent() {
        let key = test_key();
        let parent_patterns = vec![RatedPattern::new("rye.execute.tool.fetch", RiskTier::Safe)];
        let requested = vec![RatedPattern::new("rye.execute.tool.*", RiskTier::Safe)];
        let err = mint(
            &key,
            Some(TokenId::new("parent")),
            Some(&parent_patterns),
            requested,
            ThreadId::new("t-2"),
            DurationMs::from_secs(3600),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, CapabilityError::NotCovered(_)));
    }

    #[test]
    fn child_mint_accepts_narrower_pattern() {
        let key = test_key();
        let parent_patterns = vec![RatedPattern::new("rye.execute.tool.*", RiskTier::Safe)];
        let requested = vec![RatedPattern::new("rye.execute.tool.fetch", RiskTier::Safe)];
        let token = mint(
            &key,
            Some(TokenId::new("parent")),
            Some(&parent_patterns),
            requested,
            ThreadId::new("t-2"),
            DurationMs::from_secs(3600),
            0,
        )
        .unwrap();
        assert_eq!(token.patterns.len(), 1);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let key = test_key();
        let verifying = key.verifying_key();
        let patterns = vec![RatedPattern::new("rye.execute.tool.*", RiskTier::Safe)];
        let token = mint(
            &key,
            None,
            None,
            patterns,
            ThreadId::new("t-1"),
            DurationMs::from_millis(1000),
            0,
        )
        .unwrap();
        let err = verify(&token, &verifying, 5_000).unwrap_err();
        assert!(matches!(err, CapabilityError::Expired(_)));
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let key = test_key();
        let verifying = key.verifying_key();
        let patterns = vec![RatedPattern::new("rye.execute.tool.*", RiskTier::Safe)];
        let mut token = mint(
            &key,
            None,
            None,
            patterns,
            ThreadId::new("t-1"),
            DurationMs::from_secs(3600),
            0,
        )
        .unwrap();
        token.signature[0] ^= 0xFF;
        let err = verify(&token, &verifying, 100).unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidSignature(_)));
    }

    #[test]
    fn elevated_pattern_requires_acknowledgment() {
        let patterns = vec![RatedPattern::new("rye.execute.tool.danger", RiskTier::Elevated)];
        let err = check_acknowledgments(&patterns, &[]).unwrap_err();
        assert!(matches!(
            err,
            CapabilityError::MissingElevatedAcknowledgment(_)
        ));
        check_acknowledgments(&patterns, &[RiskTier::Elevated]).unwrap();
    }

    #[test]
    fn unrestricted_pattern_always_requires_acknowledgment() {
        let patterns = vec![RatedPattern::new(
            "rye.execute.tool.rm_rf",
            RiskTier::Unrestricted,
        )];
        assert!(check_acknowledgments(&patterns, &[RiskTier::Elevated]).is_err());
        check_acknowledgments(&patterns, &[RiskTier::Unrestricted]).unwrap();
    }
}
