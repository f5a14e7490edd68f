//! Keyed password hashing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Fallback hashing secret used when no secret is configured.
///
/// Matches the behavior of earlier deployments, which started with a
/// compiled-in secret rather than refusing to boot. Running with the
/// default makes every digest forgeable by anyone who reads this
/// source; production deployments must set `PROPCALC_AUTH_SECRET`.
pub const DEFAULT_SECRET: &str = "propCalcSalt2024_v2";

/// One-way keyed password digest.
///
/// `hash` is deterministic: the same password and secret always yield
/// the same 64-hex-character HMAC-SHA256 digest, so digests can be
/// compared without storing per-user salts. The secret is server-side
/// configuration, never a per-user value.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    secret: String,
}

impl PasswordHasher {
    /// Creates a hasher with the given secret. An empty secret falls
    /// back to [`DEFAULT_SECRET`].
    pub fn new(secret: &str) -> Self {
        let secret = if secret.is_empty() {
            tracing::warn!("no hashing secret configured, using the compiled-in default");
            DEFAULT_SECRET.to_string()
        } else {
            secret.to_string()
        };
        Self { secret }
    }

    /// Computes the hex digest of `password`.
    pub fn hash(&self, password: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(password.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verifies `password` against a stored hex digest in constant
    /// time.
    pub fn verify(&self, password: &str, stored_digest: &str) -> bool {
        let Ok(expected) = hex::decode(stored_digest) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(password.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}
