// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each has a resolved `XxxConfig` and a partial
//! `XxxConfigLayer` used for merging sources.

mod auth;
mod hashing;
mod http;
mod logging;
mod store;

pub use auth::{AuthConfig, AuthConfigLayer, MAX_SESSION_TTL_SECS};
pub use hashing::{HashingConfig, HashingConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use store::{StoreBackend, StoreConfig, StoreConfigLayer};
