//! # PropCalc Account Core
//!
//! Account, session, and role administration core for the PropCalc
//! account service.
//!
//! This crate provides:
//! - **Password Hashing**: keyed HMAC-SHA256 digests with
//!   constant-time verification
//! - **Sessions**: opaque 256-bit bearer tokens with a 30-day TTL,
//!   issued on signup/signin and verified lazily
//! - **Account Lifecycle**: signup, signin, change-password,
//!   delete-account
//! - **Role Administration**: admin-gated user management plus the
//!   one-time bootstrap admin claim
//! - **Profiles**: shallow-merged per-user settings with photo data
//!   stripped out
//!
//! All state lives in a [`propcalc_store::KvStore`]; nothing is held
//! in process between requests.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use propcalc_auth::{AccountManager, PasswordHasher, SignupRequest, TokenIssuer};
//! use propcalc_store::{KvStore, MemoryStore};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
//! let hasher = PasswordHasher::new("server-secret");
//! let issuer = TokenIssuer::new(store.clone());
//! let accounts = AccountManager::new(store, hasher, issuer);
//!
//! let signed = accounts
//!     .signup(SignupRequest {
//!         email: Some("a@b.com".into()),
//!         password: Some("longenough1".into()),
//!         ..Default::default()
//!     })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(signed.token.len(), 64);
//! # });
//! ```
//!
//! # Sessions are frozen snapshots
//!
//! A session records the account's role and plan at issuance time and
//! is never re-derived from the account record. Privilege changes
//! made by an admin become visible only when the affected user
//! authenticates again. This is deliberate, not an oversight.

mod account;
mod admin;
mod error;
mod password;
mod profile;
mod session;

pub use account::{
    normalize_email, Account, AccountManager, ChangePasswordRequest, Plan, Role, SigninRequest,
    SignupRequest, MIN_PASSWORD_LEN,
};
pub use admin::{
    DeleteUserRequest, ResetPasswordRequest, RoleAdmin, SetPlanRequest, SetRoleRequest,
    UserSummary,
};
pub use error::{AuthError, Result};
pub use password::{PasswordHasher, DEFAULT_SECRET};
pub use profile::ProfileManager;
pub use session::{Session, SessionVerifier, SignedIn, TokenIssuer, SESSION_TTL_SECS};
