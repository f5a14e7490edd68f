//! # PropCalc Node
//!
//! HTTP account service for PropCalc.
//!
//! Every privileged request passes through the session verifier; the
//! account, admin, and profile services sit behind a single JSON
//! endpoint dispatched on an `action` field. All state lives in the
//! backing key-value store, so any number of service instances can
//! run against the same store with no coordination.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/` or `/api/auth` | Action-dispatched JSON API |
//! | GET | `/` or `/api/auth` | Verify the bearer token |
//! | GET | `/health` | Liveness check |
//!
//! ## Modules
//!
//! - [`api`] - Router, application state, and action dispatch
//! - [`config`] - Startup configuration

pub mod api;
pub mod config;
