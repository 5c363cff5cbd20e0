// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! hookgate HTTP server.
//!
//! A thin axum surface over `hookgate-server-auth`: login and session
//! management, first-admin setup, and routes guarded by the enforcement chain.

pub mod api;
pub mod auth_middleware;
pub mod authz_middleware;
pub mod error;
pub mod routes;

pub use api::{create_app_state, create_router, create_store, AppState};
pub use error::{ApiError, ErrorResponse, ServerError};
pub use hookgate_server_config::ServerConfig;
