// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the hookgate server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with cross-field validation
//! - Consistent environment variable naming (`HOOKGATE_SERVER_<SECTION>_<FIELD>`)
//! - `*_FILE` support for secrets such as the Redis URL
//!
//! # Usage
//!
//! ```ignore
//! use hookgate_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}", config.socket_addr());
//! ```

mod env;
pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub auth: AuthConfig,
	pub hashing: HashingConfig,
	pub store: StoreConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`HOOKGATE_SERVER_*`)
/// 2. Config file (`/etc/hookgate/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::new()),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::new()),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer into a validated configuration.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		auth: layer.auth.unwrap_or_default().finalize(),
		hashing: layer.hashing.unwrap_or_default().finalize(),
		store: layer.store.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		request_timeout_secs = config.http.request_timeout_secs,
		session_ttl_secs = config.auth.session_ttl_secs,
		session_header = %config.auth.session_header,
		sliding_sessions = config.auth.sliding_sessions,
		hash_memory_kib = config.hashing.memory_kib,
		hash_iterations = config.hashing.iterations,
		store_backend = %config.store.backend,
		"Server configuration loaded"
	);

	Ok(config)
}

fn is_header_token_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if config.auth.session_ttl_secs == 0 {
		return Err(ConfigError::Validation(
			"auth.session_ttl_secs must be greater than 0".to_string(),
		));
	}
	if config.auth.session_ttl_secs > MAX_SESSION_TTL_SECS {
		return Err(ConfigError::Validation(format!(
			"auth.session_ttl_secs must be at most {MAX_SESSION_TTL_SECS} (365 days), got {}",
			config.auth.session_ttl_secs
		)));
	}

	let header = &config.auth.session_header;
	if header.is_empty() || !header.chars().all(is_header_token_char) {
		return Err(ConfigError::Validation(format!(
			"auth.session_header '{header}' is not a valid HTTP header name"
		)));
	}

	config
		.hashing
		.validate()
		.map_err(ConfigError::Validation)?;

	if config.store.backend == StoreBackend::Redis
		&& config.store.redis_url.as_ref().map_or(true, |url| url.is_blank())
	{
		return Err(ConfigError::Validation(
			"store.backend = \"redis\" requires HOOKGATE_SERVER_STORE_REDIS_URL (or store.redis_url)"
				.to_string(),
		));
	}

	Ok(())
}
