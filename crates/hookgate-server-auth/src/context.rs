// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-request context carrying an optional deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::AuthError;

/// Request-scoped context passed to every store-touching operation.
///
/// When a deadline is set, operations bounded by [`RequestContext::run`] fail
/// with [`AuthError::DeadlineExceeded`] once it passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
	deadline: Option<Instant>,
}

impl RequestContext {
	/// A context with no deadline.
	pub fn background() -> Self {
		Self::default()
	}

	pub fn with_deadline(deadline: Instant) -> Self {
		Self {
			deadline: Some(deadline),
		}
	}

	pub fn with_timeout(timeout: Duration) -> Self {
		Self::with_deadline(Instant::now() + timeout)
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	pub fn is_expired(&self) -> bool {
		self.deadline.is_some_and(|d| Instant::now() >= d)
	}

	/// Run `fut` bounded by the deadline.
	///
	/// An already elapsed deadline fails without polling `fut`.
	pub async fn run<F, T, E>(&self, fut: F) -> Result<T, AuthError>
	where
		F: Future<Output = Result<T, E>>,
		E: Into<AuthError>,
	{
		if self.is_expired() {
			return Err(AuthError::DeadlineExceeded);
		}
		match self.deadline {
			Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
				Ok(result) => result.map_err(Into::into),
				Err(_) => Err(AuthError::DeadlineExceeded),
			},
			None => fut.await.map_err(Into::into),
		}
	}
}
