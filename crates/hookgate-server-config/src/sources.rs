// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files and environment variables.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::env::load_secret;
use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuthConfigLayer, HashingConfigLayer, HttpConfigLayer, LogFormat, LoggingConfigLayer,
	StoreBackend, StoreConfigLayer,
};

/// Default location of the server config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/hookgate/server.toml";

/// Where a source sits in the merge order. Later (greater) wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// A producer of one partial configuration layer.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Contributes nothing; section defaults are applied at finalize time.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer::default())
	}
}

/// A TOML config file. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-file"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(e) if e.kind() == ErrorKind::NotFound => {
				debug!(path = %self.path.display(), "no config file");
				return Ok(ServerConfigLayer::default());
			}
			Err(source) => {
				return Err(ConfigError::FileRead {
					path: self.path.clone(),
					source,
				})
			}
		};

		let layer = toml::from_str::<ServerConfigLayer>(&content).map_err(|source| {
			ConfigError::TomlParse {
				path: self.path.clone(),
				source,
			}
		})?;
		trace!(path = %self.path.display(), "config file parsed");
		Ok(layer)
	}
}

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variables named `HOOKGATE_SERVER_<SECTION>_<FIELD>`.
///
/// Empty values count as unset. The Redis URL also honours `*_FILE`.
#[derive(Clone)]
pub struct EnvSource {
	lookup: Lookup,
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl EnvSource {
	/// Read the process environment.
	pub fn new() -> Self {
		Self {
			lookup: Arc::new(|name| std::env::var(name).ok()),
		}
	}

	/// Read from a fixed set of variables instead of the process environment.
	pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		let vars: HashMap<String, String> = vars
			.into_iter()
			.map(|(k, v)| (k.into(), v.into()))
			.collect();
		Self {
			lookup: Arc::new(move |name| vars.get(name).cloned()),
		}
	}

	fn key(section: &str, field: &str) -> String {
		format!("HOOKGATE_SERVER_{section}_{field}")
	}

	fn string(&self, section: &str, field: &str) -> Option<String> {
		(self.lookup)(&Self::key(section, field)).filter(|v| !v.is_empty())
	}

	fn flag(&self, section: &str, field: &str) -> Option<bool> {
		self
			.string(section, field)
			.map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
	}

	fn parsed<T>(&self, section: &str, field: &str) -> Result<Option<T>, ConfigError>
	where
		T: FromStr,
		T::Err: std::fmt::Display,
	{
		let Some(raw) = self.string(section, field) else {
			return Ok(None);
		};
		raw.parse().map(Some).map_err(|e| ConfigError::InvalidValue {
			key: Self::key(section, field),
			message: format!("cannot parse '{raw}': {e}"),
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		let http = HttpConfigLayer {
			host: self.string("HTTP", "HOST"),
			port: self.parsed("HTTP", "PORT")?,
			request_timeout_secs: self.parsed("HTTP", "REQUEST_TIMEOUT_SECS")?,
		};
		let auth = AuthConfigLayer {
			session_ttl_secs: self.parsed("AUTH", "SESSION_TTL_SECS")?,
			session_header: self.string("AUTH", "SESSION_HEADER"),
			sliding_sessions: self.flag("AUTH", "SLIDING_SESSIONS"),
		};
		let hashing = HashingConfigLayer {
			memory_kib: self.parsed("HASHING", "MEMORY_KIB")?,
			iterations: self.parsed("HASHING", "ITERATIONS")?,
			parallelism: self.parsed("HASHING", "PARALLELISM")?,
			output_len: self.parsed("HASHING", "OUTPUT_LEN")?,
		};
		let lookup = self.lookup.clone();
		let store = StoreConfigLayer {
			backend: self.parsed::<StoreBackend>("STORE", "BACKEND")?,
			redis_url: load_secret(&Self::key("STORE", "REDIS_URL"), |name| lookup(name))
				.map_err(|e| ConfigError::Secret(e.to_string()))?,
		};
		let logging = LoggingConfigLayer {
			level: self.string("LOGGING", "LEVEL"),
			format: self.parsed::<LogFormat>("LOGGING", "FORMAT")?,
		};

		Ok(ServerConfigLayer {
			http: Some(http),
			auth: Some(auth),
			hashing: Some(hashing),
			store: Some(store),
			logging: Some(logging),
		})
	}
}
