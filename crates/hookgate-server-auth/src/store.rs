// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Expiring key-value stores backing the session authority.
//!
//! The session authority needs four operations, each atomic per key: `set`
//! with a TTL, `replace` (set only if the key is still present), `get`, and
//! `delete`. Two backends are provided:
//!
//! - [`MemoryStore`]: in-process map with per-key expiry, for development and tests
//! - [`RedisStore`]: Redis via `SET EX` / `SET EX XX` / `GET` / `DEL` (feature `redis`)

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from a key-value store backend.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("failed to connect to store: {0}")]
	Connection(String),

	#[error("store operation failed: {0}")]
	Backend(String),
}

/// An expiring key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
	/// Short backend name for logs.
	fn backend_name(&self) -> &'static str;

	/// Write `value` under `key`, replacing any existing value. The entry
	/// disappears after `ttl`.
	async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

	/// Like [`set`](Self::set), but only if `key` currently holds a live
	/// value. Returns `false` and writes nothing otherwise.
	async fn replace(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

	/// Read the value under `key`, or `None` if absent or evicted.
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Remove `key`. Removing an absent key succeeds.
	async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
	value: String,
	expires_at: Instant,
}

/// In-process store with per-key expiry.
///
/// Expired entries are invisible to `get` and are purged on the next write.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of live entries.
	pub async fn len(&self) -> usize {
		let now = Instant::now();
		self
			.entries
			.read()
			.await
			.values()
			.filter(|entry| entry.expires_at > now)
			.count()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}

	fn entry(value: &str, now: Instant, ttl: Duration) -> Result<MemoryEntry, StoreError> {
		let expires_at = now
			.checked_add(ttl)
			.ok_or_else(|| StoreError::Backend(format!("ttl of {}s is out of range", ttl.as_secs())))?;
		Ok(MemoryEntry {
			value: value.to_string(),
			expires_at,
		})
	}
}

#[async_trait]
impl KeyValueStore for MemoryStore {
	fn backend_name(&self) -> &'static str {
		"memory"
	}

	async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
		let now = Instant::now();
		let entry = Self::entry(value, now, ttl)?;
		let mut entries = self.entries.write().await;
		entries.retain(|_, entry| entry.expires_at > now);
		entries.insert(key.to_string(), entry);
		Ok(())
	}

	async fn replace(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
		let now = Instant::now();
		let entry = Self::entry(value, now, ttl)?;
		let mut entries = self.entries.write().await;
		match entries.get_mut(key) {
			Some(existing) if existing.expires_at > now => {
				*existing = entry;
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		let entries = self.entries.read().await;
		Ok(entries
			.get(key)
			.filter(|entry| entry.expires_at > Instant::now())
			.map(|entry| entry.value.clone()))
	}

	async fn delete(&self, key: &str) -> Result<(), StoreError> {
		self.entries.write().await.remove(key);
		Ok(())
	}
}

#[cfg(feature = "redis")]
pub use self::redis_store::RedisStore;

#[cfg(feature = "redis")]
mod redis_store {
	use std::time::Duration;

	use async_trait::async_trait;
	use redis::aio::MultiplexedConnection;
	use redis::{AsyncCommands, Client};

	use super::{KeyValueStore, StoreError};

	/// Redis-backed store using a multiplexed async connection per call.
	#[derive(Clone)]
	pub struct RedisStore {
		client: Client,
	}

	impl std::fmt::Debug for RedisStore {
		fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
			// The connection info may carry a password.
			f.debug_struct("RedisStore").finish_non_exhaustive()
		}
	}

	impl RedisStore {
		/// Create a client for `url` (e.g. `redis://localhost:6379`).
		///
		/// No connection is made until the first operation.
		pub fn new(url: &str) -> Result<Self, StoreError> {
			let client = Client::open(url)
				.map_err(|e| StoreError::Connection(format!("invalid redis url: {e}")))?;
			Ok(Self { client })
		}

		async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
			self
				.client
				.get_multiplexed_async_connection()
				.await
				.map_err(|e| StoreError::Connection(e.to_string()))
		}

		/// Round-trip a `PING` to check the server is reachable.
		pub async fn ping(&self) -> Result<(), StoreError> {
			let mut conn = self.connection().await?;
			let _: String = redis::cmd("PING")
				.query_async(&mut conn)
				.await
				.map_err(|e| StoreError::Backend(format!("redis PING failed: {e}")))?;
			Ok(())
		}
	}

	#[async_trait]
	impl KeyValueStore for RedisStore {
		fn backend_name(&self) -> &'static str {
			"redis"
		}

		async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
			let mut conn = self.connection().await?;
			// SET EX rejects 0; sub-second TTLs round up to one second.
			let seconds = ttl.as_secs().max(1);
			let result: redis::RedisResult<()> = conn.set_ex(key, value, seconds).await;
			result.map_err(|e| StoreError::Backend(format!("redis SET failed: {e}")))
		}

		async fn replace(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
			let mut conn = self.connection().await?;
			let seconds = ttl.as_secs().max(1);
			// XX: only overwrite an existing key. Replies nil when absent.
			let reply: Option<String> = redis::cmd("SET")
				.arg(key)
				.arg(value)
				.arg("EX")
				.arg(seconds)
				.arg("XX")
				.query_async(&mut conn)
				.await
				.map_err(|e| StoreError::Backend(format!("redis SET XX failed: {e}")))?;
			Ok(reply.is_some())
		}

		async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
			let mut conn = self.connection().await?;
			conn
				.get::<_, Option<String>>(key)
				.await
				.map_err(|e| StoreError::Backend(format!("redis GET failed: {e}")))
		}

		async fn delete(&self, key: &str) -> Result<(), StoreError> {
			let mut conn = self.connection().await?;
			let result: redis::RedisResult<i64> = conn.del(key).await;
			result
				.map(|_| ())
				.map_err(|e| StoreError::Backend(format!("redis DEL failed: {e}")))
		}
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn set_then_get() {
		let store = MemoryStore::new();
		store.set("k", "v", Duration::from_secs(60)).await.unwrap();
		assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
	}

	#[tokio::test]
	async fn get_missing_is_none() {
		let store = MemoryStore::new();
		assert!(store.get("missing").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn set_replaces_existing_value() {
		let store = MemoryStore::new();
		store.set("k", "a", Duration::from_secs(60)).await.unwrap();
		store.set("k", "b", Duration::from_secs(60)).await.unwrap();
		assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
		assert_eq!(store.len().await, 1);
	}

	#[tokio::test]
	async fn expired_entries_are_invisible() {
		let store = MemoryStore::new();
		store.set("k", "v", Duration::ZERO).await.unwrap();
		assert!(store.get("k").await.unwrap().is_none());
		assert!(store.is_empty().await);
	}

	#[tokio::test]
	async fn replace_overwrites_live_key() {
		let store = MemoryStore::new();
		store.set("k", "a", Duration::from_secs(60)).await.unwrap();
		assert!(store.replace("k", "b", Duration::from_secs(60)).await.unwrap());
		assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
	}

	#[tokio::test]
	async fn replace_never_creates_a_key() {
		let store = MemoryStore::new();
		assert!(!store.replace("k", "v", Duration::from_secs(60)).await.unwrap());
		assert!(store.get("k").await.unwrap().is_none());

		store.set("k", "v", Duration::from_secs(60)).await.unwrap();
		store.delete("k").await.unwrap();
		assert!(!store.replace("k", "v", Duration::from_secs(60)).await.unwrap());
		assert!(store.is_empty().await);
	}

	#[tokio::test]
	async fn replace_ignores_expired_key() {
		let store = MemoryStore::new();
		store.set("k", "old", Duration::ZERO).await.unwrap();
		assert!(!store.replace("k", "new", Duration::from_secs(60)).await.unwrap());
		assert!(store.get("k").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn huge_ttl_is_an_error_not_a_panic() {
		let store = MemoryStore::new();
		let err = store.set("k", "v", Duration::MAX).await.unwrap_err();
		assert!(matches!(err, StoreError::Backend(_)));
		assert!(store.get("k").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn delete_is_idempotent() {
		let store = MemoryStore::new();
		store.set("k", "v", Duration::from_secs(60)).await.unwrap();
		store.delete("k").await.unwrap();
		store.delete("k").await.unwrap();
		assert!(store.get("k").await.unwrap().is_none());
	}
}
