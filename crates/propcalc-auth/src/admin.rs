//! Admin-gated user management and the bootstrap admin claim.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::account::{
    fetch_account, normalize_email, store_account, user_key, Account, Plan, Role,
    MIN_PASSWORD_LEN,
};
use crate::error::{AuthError, Result};
use crate::password::PasswordHasher;
use crate::profile::profile_key;
use crate::session::{Session, SignedIn, TokenIssuer};
use propcalc_store::KvStore;

/// An account's non-secret fields, as returned by the admin listing.
/// The password digest is never exposed here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Opaque account id.
    pub id: String,
    /// Normalized email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Current plan.
    pub plan: Plan,
    /// Current role.
    pub role: Role,
    /// Unix timestamp (seconds) of signup.
    pub created_at: u64,
}

impl From<Account> for UserSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            name: account.name,
            plan: account.plan,
            role: account.role,
            created_at: account.created_at,
        }
    }
}

/// Request body for `adminResetPassword`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// Email of the account to reset. Required.
    #[serde(default)]
    pub target_email: Option<String>,
    /// Replacement password. Required, at least eight characters.
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Request body for `adminDeleteUser`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    /// Email of the account to delete. Required.
    #[serde(default)]
    pub target_email: Option<String>,
}

/// Request body for `adminSetRole`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRoleRequest {
    /// Email of the account to change. Required.
    #[serde(default)]
    pub target_email: Option<String>,
    /// Role to assign.
    pub role: Role,
}

/// Request body for `adminSetPlan`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPlanRequest {
    /// Email of the account to change. Required.
    #[serde(default)]
    pub target_email: Option<String>,
    /// Plan to assign.
    pub plan: Plan,
}

/// Admin-gated account administration.
///
/// Every operation except [`claim_self_admin`](RoleAdmin::claim_self_admin)
/// requires the calling session to carry `role == admin` and fails
/// with 401 otherwise, never as a silent no-op. Mutations touch only
/// the targeted account record: tokens already issued to the target
/// keep their frozen role and plan until the target authenticates
/// again.
#[derive(Clone)]
pub struct RoleAdmin {
    store: Arc<dyn KvStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
}

impl RoleAdmin {
    /// Creates the service over the given store and hasher.
    pub fn new(store: Arc<dyn KvStore>, hasher: PasswordHasher, issuer: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            issuer,
        }
    }

    fn require_admin(session: &Session) -> Result<()> {
        if session.role != Role::Admin {
            return Err(AuthError::Unauthorized("Unauthorized".to_string()));
        }
        Ok(())
    }

    /// Loads every account record from the store.
    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let keys = self.store.scan_keys("user:*").await?;
        let mut accounts = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(payload) = self.store.get(&key).await? {
                accounts.push(serde_json::from_str(&payload)?);
            }
        }
        Ok(accounts)
    }

    async fn fetch_target(&self, target_email: Option<&str>) -> Result<Account> {
        let email = target_email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthError::Validation("Target email required".to_string()))?;
        fetch_account(&self.store, &normalize_email(email))
            .await?
            .ok_or_else(|| AuthError::NotFound("No account found for this email".to_string()))
    }

    /// Lists all accounts' non-secret fields, oldest first.
    pub async fn list_users(&self, session: &Session) -> Result<Vec<UserSummary>> {
        Self::require_admin(session)?;
        let mut accounts = self.all_accounts().await?;
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.email.cmp(&b.email)));
        Ok(accounts.into_iter().map(UserSummary::from).collect())
    }

    /// Overwrites the target account's password digest.
    pub async fn reset_password(&self, session: &Session, req: ResetPasswordRequest) -> Result<()> {
        Self::require_admin(session)?;
        let new = req
            .new_password
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AuthError::Validation("New password required".to_string()))?;
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let mut target = self.fetch_target(req.target_email.as_deref()).await?;
        target.password_hash = self.hasher.hash(new);
        store_account(&self.store, &target).await?;
        tracing::info!(user_id = %target.id, "password reset by admin");
        Ok(())
    }

    /// Deletes the target account and its profile.
    ///
    /// Tokens already issued to the target are not searched out or
    /// revoked; they lapse at their own TTL.
    pub async fn delete_user(&self, session: &Session, req: DeleteUserRequest) -> Result<()> {
        Self::require_admin(session)?;
        let target = self.fetch_target(req.target_email.as_deref()).await?;

        self.store
            .delete_many(&[user_key(&target.email), profile_key(&target.id)])
            .await?;
        tracing::info!(user_id = %target.id, "account deleted by admin");
        Ok(())
    }

    /// Assigns a role to the target account. Takes effect the next
    /// time the target authenticates.
    pub async fn set_role(&self, session: &Session, req: SetRoleRequest) -> Result<()> {
        Self::require_admin(session)?;
        let mut target = self.fetch_target(req.target_email.as_deref()).await?;
        target.role = req.role;
        store_account(&self.store, &target).await?;
        tracing::info!(user_id = %target.id, role = ?req.role, "role changed");
        Ok(())
    }

    /// Assigns a plan to the target account. Takes effect the next
    /// time the target authenticates.
    pub async fn set_plan(&self, session: &Session, req: SetPlanRequest) -> Result<Plan> {
        Self::require_admin(session)?;
        let mut target = self.fetch_target(req.target_email.as_deref()).await?;
        target.plan = req.plan;
        store_account(&self.store, &target).await?;
        tracing::info!(user_id = %target.id, plan = ?req.plan, "plan changed");
        Ok(req.plan)
    }

    /// One-time bootstrap escape hatch: promotes the caller to admin
    /// if and only if no admin account exists yet, then issues a
    /// brand-new session carrying the updated role.
    ///
    /// The existence check and the promotion are separate reads and
    /// writes with no compare-and-swap, so two first callers racing
    /// this can both pass the scan and both end up admin. The window
    /// only exists on an unclaimed deployment.
    pub async fn claim_self_admin(&self, session: &Session) -> Result<SignedIn> {
        let accounts = self.all_accounts().await?;
        if accounts.iter().any(|a| a.role == Role::Admin) {
            return Err(AuthError::Conflict("An admin already exists".to_string()));
        }

        let mut account = fetch_account(&self.store, &session.email)
            .await?
            .ok_or_else(|| AuthError::NotFound("No account found for this email".to_string()))?;
        account.role = Role::Admin;
        store_account(&self.store, &account).await?;
        tracing::info!(user_id = %account.id, "bootstrap admin claimed");

        let (token, new_session) = self.issuer.issue(&account).await?;
        Ok(SignedIn {
            token,
            session: new_session,
            account,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountManager, SignupRequest};
    use crate::session::SessionVerifier;
    use propcalc_store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        accounts: AccountManager,
        admin: RoleAdmin,
        verifier: SessionVerifier,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let kv: Arc<dyn KvStore> = store.clone();
        let hasher = PasswordHasher::new("test-secret");
        let issuer = TokenIssuer::new(kv.clone());
        Fixture {
            store,
            accounts: AccountManager::new(kv.clone(), hasher.clone(), issuer.clone()),
            admin: RoleAdmin::new(kv.clone(), hasher, issuer),
            verifier: SessionVerifier::new(kv),
        }
    }

    async fn signup(fx: &Fixture, email: &str) -> SignedIn {
        fx.accounts
            .signup(SignupRequest {
                email: Some(email.to_string()),
                password: Some("longenough1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    /// Signs up a user and promotes them through the bootstrap claim.
    async fn bootstrap_admin(fx: &Fixture, email: &str) -> SignedIn {
        let signed = signup(fx, email).await;
        fx.admin.claim_self_admin(&signed.session).await.unwrap()
    }

    #[tokio::test]
    async fn test_claim_self_admin_bootstrap() {
        let fx = fixture();
        let signed = signup(&fx, "first@example.com").await;
        assert_eq!(signed.account.role, Role::User);

        let claimed = fx.admin.claim_self_admin(&signed.session).await.unwrap();
        assert_eq!(claimed.account.role, Role::Admin);

        // The new token carries the promoted role.
        let session = fx.verifier.verify_token(&claimed.token).await.unwrap();
        assert_eq!(session.role, Role::Admin);

        // The pre-claim session still reports the frozen role.
        let old = fx.verifier.verify_token(&signed.token).await.unwrap();
        assert_eq!(old.role, Role::User);
    }

    #[tokio::test]
    async fn test_claim_self_admin_conflicts_once_claimed() {
        let fx = fixture();
        bootstrap_admin(&fx, "first@example.com").await;

        let second = signup(&fx, "second@example.com").await;
        let err = fx.admin.claim_self_admin(&second.session).await.unwrap_err();
        assert_eq!(err.to_string(), "An admin already exists");
    }

    #[tokio::test]
    async fn test_concurrent_claims_race() {
        // The scan-then-promote sequence has no compare-and-swap, so
        // two racing first callers can both pass the admin scan. The
        // contract is only that at least one claim succeeds; this
        // documents that both may.
        let fx = fixture();
        let a = signup(&fx, "a@example.com").await;
        let b = signup(&fx, "b@example.com").await;

        let (ra, rb) = tokio::join!(
            fx.admin.claim_self_admin(&a.session),
            fx.admin.claim_self_admin(&b.session)
        );
        assert!(ra.is_ok() || rb.is_ok());
    }

    #[tokio::test]
    async fn test_non_admin_is_rejected() {
        let fx = fixture();
        bootstrap_admin(&fx, "admin@example.com").await;
        let user = signup(&fx, "user@example.com").await;

        let err = fx.admin.list_users(&user.session).await.unwrap_err();
        assert_eq!(err.status_code(), 401);

        let err = fx
            .admin
            .set_role(
                &user.session,
                SetRoleRequest {
                    target_email: Some("admin@example.com".to_string()),
                    role: Role::User,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_list_users_hides_hashes() {
        let fx = fixture();
        let admin = bootstrap_admin(&fx, "admin@example.com").await;
        signup(&fx, "user@example.com").await;

        let users = fx.admin.list_users(&admin.session).await.unwrap();
        assert_eq!(users.len(), 2);

        let json = serde_json::to_string(&users).unwrap();
        assert!(!json.contains("hash"));
        assert!(json.contains("user@example.com"));
    }

    #[tokio::test]
    async fn test_set_role_and_plan_touch_only_target() {
        let fx = fixture();
        let admin = bootstrap_admin(&fx, "admin@example.com").await;
        let target = signup(&fx, "target@example.com").await;
        signup(&fx, "bystander@example.com").await;

        fx.admin
            .set_plan(
                &admin.session,
                SetPlanRequest {
                    target_email: Some("target@example.com".to_string()),
                    plan: Plan::Adviser,
                },
            )
            .await
            .unwrap();

        let users = fx.admin.list_users(&admin.session).await.unwrap();
        let find = |email: &str| users.iter().find(|u| u.email == email).unwrap();
        assert_eq!(find("target@example.com").plan, Plan::Adviser);
        assert_eq!(find("bystander@example.com").plan, Plan::Free);

        // Sessions issued before the change still report the old plan.
        let session = fx.verifier.verify_token(&target.token).await.unwrap();
        assert_eq!(session.plan, Plan::Free);
    }

    #[tokio::test]
    async fn test_set_role_unknown_target() {
        let fx = fixture();
        let admin = bootstrap_admin(&fx, "admin@example.com").await;

        let err = fx
            .admin
            .set_role(
                &admin.session,
                SetRoleRequest {
                    target_email: Some("ghost@example.com".to_string()),
                    role: Role::Admin,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No account found for this email");
    }

    #[tokio::test]
    async fn test_reset_password() {
        let fx = fixture();
        let admin = bootstrap_admin(&fx, "admin@example.com").await;
        signup(&fx, "user@example.com").await;

        fx.admin
            .reset_password(
                &admin.session,
                ResetPasswordRequest {
                    target_email: Some("user@example.com".to_string()),
                    new_password: Some("resetpass9".to_string()),
                },
            )
            .await
            .unwrap();

        let signin = fx
            .accounts
            .signin(crate::account::SigninRequest {
                email: Some("user@example.com".to_string()),
                password: Some("resetpass9".to_string()),
            })
            .await;
        assert!(signin.is_ok());

        let err = fx
            .admin
            .reset_password(
                &admin.session,
                ResetPasswordRequest {
                    target_email: Some("user@example.com".to_string()),
                    new_password: Some("short".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 8 characters");
    }

    #[tokio::test]
    async fn test_delete_user_removes_account_and_profile() {
        let fx = fixture();
        let admin = bootstrap_admin(&fx, "admin@example.com").await;
        let target = signup(&fx, "user@example.com").await;
        fx.store
            .set(&profile_key(&target.account.id), r#"{"color":"green"}"#)
            .await
            .unwrap();

        fx.admin
            .delete_user(
                &admin.session,
                DeleteUserRequest {
                    target_email: Some("user@example.com".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(fx.store.get("user:user@example.com").await.unwrap().is_none());
        assert!(fx
            .store
            .get(&profile_key(&target.account.id))
            .await
            .unwrap()
            .is_none());

        // The target's outstanding token is deliberately untouched.
        assert!(fx.verifier.verify_token(&target.token).await.is_ok());
    }
}
