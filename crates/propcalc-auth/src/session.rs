//! Session tokens: issuance and verification.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::account::{Account, Plan, Role};
use crate::error::{AuthError, Result};
use propcalc_store::KvStore;

/// How long a session stays valid after issuance: 30 days.
pub const SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 30;

/// Number of random bytes in a token (256 bits, hex-encoded to 64
/// characters).
const TOKEN_BYTES: usize = 32;

/// A session persisted at `token:<token>`.
///
/// The record is a frozen snapshot of the account at issuance time.
/// Role or plan changes made afterwards are not visible through an
/// outstanding session; the user must authenticate again to pick them
/// up. Multiple concurrent sessions per account are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Id of the account this session belongs to.
    pub user_id: String,
    /// Normalized account email.
    pub email: String,
    /// Display name at issuance time.
    pub name: String,
    /// Plan at issuance time.
    #[serde(default)]
    pub plan: Plan,
    /// Role at issuance time.
    #[serde(default)]
    pub role: Role,
    /// Unix timestamp (seconds) after which the session is invalid.
    #[serde(rename = "expires")]
    pub expires_at: u64,
}

/// A freshly issued credential: the bearer token together with the
/// session record it points at and the account it was minted for.
#[derive(Debug, Clone)]
pub struct SignedIn {
    /// The plaintext bearer token. Only ever returned to the caller
    /// who authenticated.
    pub token: String,
    /// The session record persisted under the token.
    pub session: Session,
    /// The account at issuance time.
    pub account: Account,
}

/// Current unix time in seconds.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Storage key for a session token.
pub(crate) fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

/// Generate an unguessable bearer token from the OS random source.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues session tokens and persists their records.
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn KvStore>,
}

impl TokenIssuer {
    /// Creates an issuer over the given store.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Issues a fresh session for `account`.
    ///
    /// The record is written with the store's native expiry in
    /// addition to the `expires` field checked at read time, so TTL
    /// enforcement does not depend on the application alone. No
    /// uniqueness check is made beyond the 256 bits of entropy.
    pub async fn issue(&self, account: &Account) -> Result<(String, Session)> {
        let token = generate_token();
        let session = Session {
            user_id: account.id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            plan: account.plan,
            role: account.role,
            expires_at: now_secs() + SESSION_TTL_SECS,
        };
        let payload = serde_json::to_string(&session)?;
        self.store
            .set_ex(&token_key(&token), &payload, SESSION_TTL_SECS)
            .await?;
        tracing::debug!(user_id = %account.id, "issued session");
        Ok((token, session))
    }

    /// Deletes a session token. Missing tokens are not an error.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        self.store.delete(&token_key(token)).await?;
        Ok(())
    }
}

/// Resolves bearer tokens to session records.
#[derive(Clone)]
pub struct SessionVerifier {
    store: Arc<dyn KvStore>,
}

impl SessionVerifier {
    /// Creates a verifier over the given store.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Verifies an `Authorization` header value.
    ///
    /// A missing header, a missing `Bearer ` prefix, or an empty token
    /// fails without touching the store.
    pub async fn verify_header(&self, header: Option<&str>) -> Result<Session> {
        let token = header
            .map(str::trim)
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Unauthorized("Unauthorized".to_string()))?;

        self.verify_token(token).await.map_err(|err| match err {
            AuthError::Unauthorized(_) => AuthError::Unauthorized("Unauthorized".to_string()),
            other => other,
        })
    }

    /// Verifies a raw token string.
    ///
    /// Expiry is enforced lazily: a record whose `expires` has passed
    /// is deleted on this read and reported invalid, so a second
    /// verification of the same token fails with the entry absent.
    pub async fn verify_token(&self, token: &str) -> Result<Session> {
        let key = token_key(token);
        let payload = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| AuthError::Unauthorized("Invalid or expired session".to_string()))?;

        let session: Session = serde_json::from_str(&payload)?;
        if now_secs() > session.expires_at {
            self.store.delete(&key).await?;
            return Err(AuthError::Unauthorized(
                "Invalid or expired session".to_string(),
            ));
        }
        Ok(session)
    }
}
