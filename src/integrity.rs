// 🔏 Request Integrity Guard - HMAC-SHA256 over the exact body bytes
//
// The digest always covers the literal bytes on the wire (empty for bodiless
// requests), never a re-serialized form of the decoded payload.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Result, WalletError};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the digest on both requests and responses
pub const DIGEST_HEADER: &str = "x-digest";

const DIGEST_PREFIX: &str = "sha256=";

/// Stateless signer/verifier keyed with the process-wide secret
#[derive(Clone)]
pub struct IntegrityGuard {
    keyed: HmacSha256,
}

impl IntegrityGuard {
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            return Err(WalletError::Internal("integrity secret key is empty".into()));
        }

        let keyed = HmacSha256::new_from_slice(secret)
            .map_err(|e| WalletError::Internal(format!("invalid integrity key: {}", e)))?;

        Ok(IntegrityGuard { keyed })
    }

    /// `sha256=<lowercase hex>` digest of `body`
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.keyed.clone();
        mac.update(body);
        format!("{}{}", DIGEST_PREFIX, hex::encode(mac.finalize().into_bytes()))
    }

    /// True only if `digest` is present, canonical and matches `body`.
    /// The MAC comparison runs in constant time.
    pub fn verify(&self, digest: Option<&str>, body: &[u8]) -> bool {
        let Some(encoded) = digest.and_then(|d| d.strip_prefix(DIGEST_PREFIX)) else {
            return false;
        };

        // Uppercase hex would decode to the same bytes; only the signed form counts
        if !encoded.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return false;
        }

        let Ok(expected) = hex::decode(encoded) else {
            return false;
        };

        let mut mac = self.keyed.clone();
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}

impl std::fmt::Debug for IntegrityGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IntegrityGuard { .. }")
    }
}
