//! Account types and lifecycle operations.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::password::PasswordHasher;
use crate::profile::profile_key;
use crate::session::{now_secs, token_key, Session, SignedIn, TokenIssuer};
use propcalc_store::KvStore;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Account role. Admins may manage other accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account.
    #[default]
    User,
    /// Administrative account.
    Admin,
}

/// Subscription plan. Purely informational to this service; plan
/// gating happens in the consumers of the verified identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Default plan.
    #[default]
    Free,
    /// Paid plan.
    Pro,
    /// Adviser plan.
    Adviser,
}

/// An account record, persisted at `user:<normalized-email>`.
///
/// The store entry keyed by the normalized email is the single
/// writable copy; no other component may hold another.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Opaque account id.
    pub id: String,
    /// Normalized email (lowercase, trimmed). The only identity key.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Keyed digest of the password. Never serialized to clients.
    #[serde(rename = "hash")]
    pub password_hash: String,
    /// Role. Records written before roles existed decode as `user`.
    #[serde(default)]
    pub role: Role,
    /// Plan.
    #[serde(default)]
    pub plan: Plan,
    /// Unix timestamp (seconds) of signup.
    pub created_at: u64,
}

/// Normalizes an email for use as the account identity key.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Storage key for an account.
pub(crate) fn user_key(normalized_email: &str) -> String {
    format!("user:{}", normalized_email)
}

/// Loads the account stored under `normalized_email`, if any.
pub(crate) async fn fetch_account(
    store: &Arc<dyn KvStore>,
    normalized_email: &str,
) -> Result<Option<Account>> {
    match store.get(&user_key(normalized_email)).await? {
        Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
        None => Ok(None),
    }
}

/// Writes `account` back to its store entry.
pub(crate) async fn store_account(store: &Arc<dyn KvStore>, account: &Account) -> Result<()> {
    let payload = serde_json::to_string(account)?;
    store.set(&user_key(&account.email), &payload).await?;
    Ok(())
}

/// Request body for `signup`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    /// Email address. Required.
    #[serde(default)]
    pub email: Option<String>,
    /// Password. Required, at least eight characters.
    #[serde(default)]
    pub password: Option<String>,
    /// Display name. Defaults to the email local part.
    #[serde(default)]
    pub name: Option<String>,
    /// Plan. Defaults to `free`.
    #[serde(default)]
    pub plan: Option<Plan>,
}

/// Request body for `signin`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SigninRequest {
    /// Email address. Required.
    #[serde(default)]
    pub email: Option<String>,
    /// Password. Required.
    #[serde(default)]
    pub password: Option<String>,
}

/// Request body for `changePassword`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// The password currently on file. Required.
    #[serde(default)]
    pub current_password: Option<String>,
    /// Replacement password. Required, at least eight characters.
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Account lifecycle: signup, signin, change-password, delete.
///
/// Each account moves `NonExistent -> Active -> Deleted`; deletion is
/// terminal. Every successful signup and signin issues a fresh
/// session without invalidating any outstanding one.
#[derive(Clone)]
pub struct AccountManager {
    store: Arc<dyn KvStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
}

impl AccountManager {
    /// Creates a manager over the given store and hasher.
    pub fn new(store: Arc<dyn KvStore>, hasher: PasswordHasher, issuer: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            issuer,
        }
    }

    /// Creates an account and signs it in.
    pub async fn signup(&self, req: SignupRequest) -> Result<SignedIn> {
        let email = present(req.email.as_deref())
            .ok_or_else(|| AuthError::Validation("Email and password required".to_string()))?;
        let password = present(req.password.as_deref())
            .ok_or_else(|| AuthError::Validation("Email and password required".to_string()))?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let email = normalize_email(email);
        if self.store.get(&user_key(&email)).await?.is_some() {
            return Err(AuthError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let name = present(req.name.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

        let account = Account {
            id: Uuid::new_v4().simple().to_string(),
            email: email.clone(),
            name,
            password_hash: self.hasher.hash(password),
            role: Role::User,
            plan: req.plan.unwrap_or_default(),
            created_at: now_secs(),
        };
        store_account(&self.store, &account).await?;
        tracing::info!(user_id = %account.id, "account created");

        let (token, session) = self.issuer.issue(&account).await?;
        Ok(SignedIn {
            token,
            session,
            account,
        })
    }

    /// Authenticates an existing account and issues a fresh session
    /// carrying its current role and plan.
    pub async fn signin(&self, req: SigninRequest) -> Result<SignedIn> {
        let email = present(req.email.as_deref())
            .ok_or_else(|| AuthError::Validation("Email and password required".to_string()))?;
        let password = present(req.password.as_deref())
            .ok_or_else(|| AuthError::Validation("Email and password required".to_string()))?;

        let email = normalize_email(email);
        let account = fetch_account(&self.store, &email)
            .await?
            .ok_or_else(|| AuthError::NotFound("No account found for this email".to_string()))?;

        if !self.hasher.verify(password, &account.password_hash) {
            return Err(AuthError::Unauthorized("Incorrect password".to_string()));
        }

        let (token, session) = self.issuer.issue(&account).await?;
        Ok(SignedIn {
            token,
            session,
            account,
        })
    }

    /// Replaces the caller's password in place.
    ///
    /// Outstanding sessions, including the one making this call, stay
    /// valid: only the stored digest changes.
    pub async fn change_password(
        &self,
        session: &Session,
        req: ChangePasswordRequest,
    ) -> Result<()> {
        let current = present(req.current_password.as_deref()).ok_or_else(|| {
            AuthError::Validation("Current and new password required".to_string())
        })?;
        let new = present(req.new_password.as_deref()).ok_or_else(|| {
            AuthError::Validation("Current and new password required".to_string())
        })?;
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let mut account = fetch_account(&self.store, &session.email)
            .await?
            .ok_or_else(|| AuthError::NotFound("No account found for this email".to_string()))?;

        if !self.hasher.verify(current, &account.password_hash) {
            return Err(AuthError::Unauthorized("Incorrect password".to_string()));
        }

        account.password_hash = self.hasher.hash(new);
        store_account(&self.store, &account).await?;
        tracing::info!(user_id = %account.id, "password changed");
        Ok(())
    }

    /// Deletes the caller's account after password confirmation.
    ///
    /// Removes the account record, the profile record, and the
    /// caller's own token in one batched best-effort round trip.
    /// Other outstanding sessions for the account are not invalidated.
    pub async fn delete_account(
        &self,
        session: &Session,
        token: &str,
        password: Option<&str>,
    ) -> Result<()> {
        let password = present(password)
            .ok_or_else(|| AuthError::Validation("Password required".to_string()))?;

        let account = fetch_account(&self.store, &session.email)
            .await?
            .ok_or_else(|| AuthError::NotFound("No account found for this email".to_string()))?;

        if !self.hasher.verify(password, &account.password_hash) {
            return Err(AuthError::Unauthorized("Incorrect password".to_string()));
        }

        self.store
            .delete_many(&[
                user_key(&account.email),
                profile_key(&account.id),
                token_key(token),
            ])
            .await?;
        tracing::info!(user_id = %account.id, "account deleted");
        Ok(())
    }
}

/// Treats `None`, empty, and whitespace-only strings as absent.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
