//! HTTP API for the account service.
//!
//! POST requests carry a JSON body dispatched on an `action` field.
//! The action set is a closed enum, so every action has a handler
//! checked at compile time; an unrecognized action is a 400, not a
//! silent fallthrough. GET with a bearer token returns the verified
//! identity. All failures share the `{ok:false, error}` body shape
//! the original clients parse, with standardized status codes.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

use propcalc_auth::{
    AccountManager, AuthError, ChangePasswordRequest, DeleteUserRequest, PasswordHasher,
    ProfileManager, ResetPasswordRequest, RoleAdmin, Session, SessionVerifier, SetPlanRequest,
    SetRoleRequest, SigninRequest, SignupRequest, TokenIssuer,
};
use propcalc_store::KvStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Account lifecycle operations.
    pub accounts: AccountManager,
    /// Admin-gated user management.
    pub admin: RoleAdmin,
    /// Per-user settings.
    pub profiles: ProfileManager,
    /// Bearer token verification.
    pub verifier: SessionVerifier,
    /// Session issuance (used directly for signout).
    pub issuer: TokenIssuer,
}

impl AppState {
    /// Wires up every service over one store and hasher.
    pub fn new(store: Arc<dyn KvStore>, hasher: PasswordHasher) -> Self {
        let issuer = TokenIssuer::new(store.clone());
        Self {
            accounts: AccountManager::new(store.clone(), hasher.clone(), issuer.clone()),
            admin: RoleAdmin::new(store.clone(), hasher, issuer.clone()),
            profiles: ProfileManager::new(store.clone()),
            verifier: SessionVerifier::new(store),
            issuer,
        }
    }
}

/// The closed set of POST actions.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum AuthAction {
    Signup(SignupRequest),
    Signin(SigninRequest),
    Verify {
        #[serde(default)]
        token: Option<String>,
    },
    Signout {
        #[serde(default)]
        token: Option<String>,
    },
    GetProfile,
    SetProfile {
        #[serde(default)]
        profile: Option<Map<String, Value>>,
    },
    ChangePassword(ChangePasswordRequest),
    DeleteAccount {
        #[serde(default)]
        password: Option<String>,
    },
    AdminListUsers,
    AdminResetPassword(ResetPasswordRequest),
    AdminDeleteUser(DeleteUserRequest),
    AdminSetRole(SetRoleRequest),
    AdminSetPlan(SetPlanRequest),
    SetSelfAdmin,
}

/// Wrapper rendering [`AuthError`] as `{ok:false, error}`.
struct ApiError(AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(json!({ "ok": false, "error": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(get_identity).post(dispatch))
        .route("/api/auth", get(get_identity).post(dispatch))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn bearer_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// Merges `ok:true` into a session's wire representation.
fn identity_body(session: &Session) -> Result<Value, ApiError> {
    let mut body = serde_json::to_value(session).map_err(AuthError::from)?;
    if let Value::Object(map) = &mut body {
        map.insert("ok".to_string(), Value::Bool(true));
    }
    Ok(body)
}

/// GET with a bearer token returns the verified identity, equivalent
/// to the `verify` action.
async fn get_identity(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.verifier.verify_header(bearer_header(&headers)).await?;
    Ok(Json(identity_body(&session)?))
}

/// POST dispatcher for every action.
async fn dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|_| AuthError::Validation("Bad request".to_string()))?;
    let action: AuthAction = serde_json::from_value(value)
        .map_err(|err| AuthError::Validation(err.to_string()))?;

    let response = match action {
        AuthAction::Signup(req) => {
            let signed = state.accounts.signup(req).await?;
            Json(json!({
                "ok": true,
                "token": signed.token,
                "id": signed.account.id,
                "name": signed.account.name,
                "email": signed.account.email,
                "plan": signed.account.plan,
            }))
            .into_response()
        }
        AuthAction::Signin(req) => {
            let signed = state.accounts.signin(req).await?;
            Json(json!({
                "ok": true,
                "token": signed.token,
                "id": signed.account.id,
                "name": signed.account.name,
                "email": signed.account.email,
                "plan": signed.account.plan,
                "role": signed.account.role,
            }))
            .into_response()
        }
        AuthAction::Verify { token } => {
            let token = token
                .ok_or_else(|| AuthError::Validation("Token required".to_string()))?;
            let session = state.verifier.verify_token(&token).await?;
            Json(identity_body(&session)?).into_response()
        }
        AuthAction::Signout { token } => {
            if let Some(token) = token {
                state.issuer.revoke(&token).await?;
            }
            Json(json!({ "ok": true })).into_response()
        }
        AuthAction::GetProfile => {
            let session = state.verifier.verify_header(bearer_header(&headers)).await?;
            let profile = state.profiles.get(&session.user_id).await?;
            Json(json!({ "ok": true, "profile": profile })).into_response()
        }
        AuthAction::SetProfile { profile } => {
            let session = state.verifier.verify_header(bearer_header(&headers)).await?;
            state
                .profiles
                .set(&session.user_id, profile.unwrap_or_default())
                .await?;
            Json(json!({ "ok": true })).into_response()
        }
        AuthAction::ChangePassword(req) => {
            let session = state.verifier.verify_header(bearer_header(&headers)).await?;
            state.accounts.change_password(&session, req).await?;
            Json(json!({ "ok": true })).into_response()
        }
        AuthAction::DeleteAccount { password } => {
            let token = own_token(&headers)?;
            let session = state.verifier.verify_header(bearer_header(&headers)).await?;
            state
                .accounts
                .delete_account(&session, token, password.as_deref())
                .await?;
            Json(json!({ "ok": true })).into_response()
        }
        AuthAction::AdminListUsers => {
            let session = state.verifier.verify_header(bearer_header(&headers)).await?;
            let users = state.admin.list_users(&session).await?;
            Json(json!({ "ok": true, "users": users })).into_response()
        }
        AuthAction::AdminResetPassword(req) => {
            let session = state.verifier.verify_header(bearer_header(&headers)).await?;
            state.admin.reset_password(&session, req).await?;
            Json(json!({ "ok": true })).into_response()
        }
        AuthAction::AdminDeleteUser(req) => {
            let session = state.verifier.verify_header(bearer_header(&headers)).await?;
            state.admin.delete_user(&session, req).await?;
            Json(json!({ "ok": true })).into_response()
        }
        AuthAction::AdminSetRole(req) => {
            let session = state.verifier.verify_header(bearer_header(&headers)).await?;
            state.admin.set_role(&session, req).await?;
            Json(json!({ "ok": true })).into_response()
        }
        AuthAction::AdminSetPlan(req) => {
            let session = state.verifier.verify_header(bearer_header(&headers)).await?;
            let plan = state.admin.set_plan(&session, req).await?;
            Json(json!({ "ok": true, "plan": plan })).into_response()
        }
        AuthAction::SetSelfAdmin => {
            let session = state.verifier.verify_header(bearer_header(&headers)).await?;
            let claimed = state.admin.claim_self_admin(&session).await?;
            Json(json!({
                "ok": true,
                "token": claimed.token,
                "role": claimed.account.role,
            }))
            .into_response()
        }
    };
    Ok(response)
}

/// Extracts the caller's own raw token for operations that delete it.
fn own_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    bearer_header(headers)
        .map(str::trim)
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError(AuthError::Unauthorized("Unauthorized".to_string())))
}
