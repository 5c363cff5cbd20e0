// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validation of inbound webhook-source authentication configuration.
//!
//! A source declares how senders authenticate to it with an `auth_type` and
//! a free-form `auth_config` object. [`validate`] checks the object against
//! the rules for its type and produces a typed [`SourceAuthConfig`], whose
//! canonical JSON form is what gets persisted.
//!
//! | auth_type | required fields                       |
//! |-----------|---------------------------------------|
//! | none      | (none; any input becomes `{}`)        |
//! | basic     | username, password                    |
//! | bearer    | token                                 |
//! | apikey    | location, value                       |
//! | signature | secret, header, algorithm, encoding   |
//!
//! All failures are collected into one [`ValidationErrors`] map keyed by field
//! name. Fields not belonging to the type are dropped from the canonical form.

use std::fmt;
use std::str::FromStr;

use hookgate_common_secret::REDACTED;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{AuthError, ValidationErrors};

const UNSUPPORTED_AUTH_TYPE: &str = "unsupported auth_type";

/// How senders authenticate to a webhook source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
	None,
	Basic,
	Bearer,
	ApiKey,
	Signature,
}

impl AuthType {
	pub fn all() -> &'static [AuthType] {
		&[
			AuthType::None,
			AuthType::Basic,
			AuthType::Bearer,
			AuthType::ApiKey,
			AuthType::Signature,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AuthType::None => "none",
			AuthType::Basic => "basic",
			AuthType::Bearer => "bearer",
			AuthType::ApiKey => "apikey",
			AuthType::Signature => "signature",
		}
	}
}

impl fmt::Display for AuthType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuthType {
	type Err = ValidationErrors;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AuthType::all()
			.iter()
			.copied()
			.find(|t| t.as_str() == s)
			.ok_or_else(|| ValidationErrors::single("auth_type", UNSUPPORTED_AUTH_TYPE))
	}
}

/// Digest used for signature verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
	#[serde(rename = "sha-1")]
	Sha1,
	#[serde(rename = "sha-256")]
	Sha256,
	#[serde(rename = "sha-512")]
	Sha512,
	#[serde(rename = "md5")]
	Md5,
}

impl SignatureAlgorithm {
	const ALLOWED: &'static str = "must be one of: sha-1 sha-256 sha-512 md5";

	pub fn as_str(&self) -> &'static str {
		match self {
			SignatureAlgorithm::Sha1 => "sha-1",
			SignatureAlgorithm::Sha256 => "sha-256",
			SignatureAlgorithm::Sha512 => "sha-512",
			SignatureAlgorithm::Md5 => "md5",
		}
	}
}

impl FromStr for SignatureAlgorithm {
	type Err = &'static str;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"sha-1" => Ok(SignatureAlgorithm::Sha1),
			"sha-256" => Ok(SignatureAlgorithm::Sha256),
			"sha-512" => Ok(SignatureAlgorithm::Sha512),
			"md5" => Ok(SignatureAlgorithm::Md5),
			_ => Err(Self::ALLOWED),
		}
	}
}

/// Encoding of the signature value in the request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureEncoding {
	Base64,
	Base64Url,
	Hex,
}

impl SignatureEncoding {
	const ALLOWED: &'static str = "must be one of: base64 base64url hex";

	pub fn as_str(&self) -> &'static str {
		match self {
			SignatureEncoding::Base64 => "base64",
			SignatureEncoding::Base64Url => "base64url",
			SignatureEncoding::Hex => "hex",
		}
	}
}

impl FromStr for SignatureEncoding {
	type Err = &'static str;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"base64" => Ok(SignatureEncoding::Base64),
			"base64url" => Ok(SignatureEncoding::Base64Url),
			"hex" => Ok(SignatureEncoding::Hex),
			_ => Err(Self::ALLOWED),
		}
	}
}

/// A validated source auth configuration. The variant is the `auth_type`.
#[derive(Clone, PartialEq, Eq)]
pub enum SourceAuthConfig {
	None,
	Basic {
		username: String,
		password: String,
	},
	Bearer {
		token: String,
	},
	ApiKey {
		location: String,
		value: String,
	},
	Signature {
		secret: String,
		header: String,
		algorithm: SignatureAlgorithm,
		encoding: SignatureEncoding,
	},
}

impl SourceAuthConfig {
	pub fn auth_type(&self) -> AuthType {
		match self {
			SourceAuthConfig::None => AuthType::None,
			SourceAuthConfig::Basic { .. } => AuthType::Basic,
			SourceAuthConfig::Bearer { .. } => AuthType::Bearer,
			SourceAuthConfig::ApiKey { .. } => AuthType::ApiKey,
			SourceAuthConfig::Signature { .. } => AuthType::Signature,
		}
	}

	/// The config as a JSON object holding exactly this type's fields.
	pub fn to_value(&self) -> Value {
		let mut map = Map::new();
		match self {
			SourceAuthConfig::None => {}
			SourceAuthConfig::Basic { username, password } => {
				map.insert("username".into(), username.clone().into());
				map.insert("password".into(), password.clone().into());
			}
			SourceAuthConfig::Bearer { token } => {
				map.insert("token".into(), token.clone().into());
			}
			SourceAuthConfig::ApiKey { location, value } => {
				map.insert("location".into(), location.clone().into());
				map.insert("value".into(), value.clone().into());
			}
			SourceAuthConfig::Signature {
				secret,
				header,
				algorithm,
				encoding,
			} => {
				map.insert("secret".into(), secret.clone().into());
				map.insert("header".into(), header.clone().into());
				map.insert("algorithm".into(), algorithm.as_str().into());
				map.insert("encoding".into(), encoding.as_str().into());
			}
		}
		Value::Object(map)
	}

	/// Canonical JSON text with sorted keys, as persisted.
	pub fn to_canonical_json(&self) -> String {
		self.to_value().to_string()
	}

	/// The stored form of this config.
	pub fn to_stored(&self) -> StoredAuthConfig {
		StoredAuthConfig {
			auth_type: self.auth_type(),
			auth_config: self.to_canonical_json(),
		}
	}
}

impl fmt::Debug for SourceAuthConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SourceAuthConfig::None => f.write_str("None"),
			SourceAuthConfig::Basic { username, .. } => f
				.debug_struct("Basic")
				.field("username", username)
				.field("password", &REDACTED)
				.finish(),
			SourceAuthConfig::Bearer { .. } => {
				f.debug_struct("Bearer").field("token", &REDACTED).finish()
			}
			SourceAuthConfig::ApiKey { location, .. } => f
				.debug_struct("ApiKey")
				.field("location", location)
				.field("value", &REDACTED)
				.finish(),
			SourceAuthConfig::Signature {
				header,
				algorithm,
				encoding,
				..
			} => f
				.debug_struct("Signature")
				.field("secret", &REDACTED)
				.field("header", header)
				.field("algorithm", algorithm)
				.field("encoding", encoding)
				.finish(),
		}
	}
}

/// A source's persisted auth settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAuthConfig {
	pub auth_type: AuthType,
	/// Canonical JSON text.
	pub auth_config: String,
}

impl fmt::Debug for StoredAuthConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StoredAuthConfig")
			.field("auth_type", &self.auth_type)
			.field("auth_config", &REDACTED)
			.finish()
	}
}

/// Collects per-field failures while reading a raw config object.
struct FieldReader<'a> {
	raw: &'a Map<String, Value>,
	errors: ValidationErrors,
}

impl<'a> FieldReader<'a> {
	fn new(raw: &'a Map<String, Value>) -> Self {
		Self {
			raw,
			errors: ValidationErrors::new(),
		}
	}

	fn required(&mut self, field: &str) -> Option<String> {
		match self.raw.get(field) {
			None | Some(Value::Null) => {
				self.errors.add(field, "is required");
				None
			}
			Some(Value::String(s)) if s.trim().is_empty() => {
				self.errors.add(field, "cannot be empty");
				None
			}
			Some(Value::String(s)) => Some(s.clone()),
			Some(_) => {
				self.errors.add(field, "must be a string");
				None
			}
		}
	}

	fn one_of<T>(&mut self, field: &str) -> Option<T>
	where
		T: FromStr<Err = &'static str>,
	{
		let value = self.required(field)?;
		match value.parse() {
			Ok(parsed) => Some(parsed),
			Err(message) => {
				self.errors.add(field, message);
				None
			}
		}
	}

	fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
		let built = build();
		self.errors.into_result()?;
		built.ok_or_else(|| ValidationErrors::single("auth_config", "is invalid"))
	}
}

/// Validate a raw config for `auth_type`.
///
/// `raw` may be `null` (treated as `{}`); any other non-object is rejected.
///
/// # Errors
/// Every failing field, or a single `auth_type` error for an unknown type.
#[instrument(level = "debug", skip_all, fields(auth_type = %auth_type))]
pub fn validate(auth_type: &str, raw: &Value) -> Result<SourceAuthConfig, ValidationErrors> {
	let auth_type: AuthType = auth_type.parse()?;

	let empty = Map::new();
	let map = match raw {
		Value::Null => &empty,
		Value::Object(map) => map,
		_ => return Err(ValidationErrors::single("auth_config", "must be an object")),
	};

	let mut reader = FieldReader::new(map);
	let result = match auth_type {
		AuthType::None => Ok(SourceAuthConfig::None),
		AuthType::Basic => {
			let username = reader.required("username");
			let password = reader.required("password");
			reader.finish(|| {
				Some(SourceAuthConfig::Basic {
					username: username?,
					password: password?,
				})
			})
		}
		AuthType::Bearer => {
			let token = reader.required("token");
			reader.finish(|| Some(SourceAuthConfig::Bearer { token: token? }))
		}
		AuthType::ApiKey => {
			let location = reader.required("location");
			let value = reader.required("value");
			reader.finish(|| {
				Some(SourceAuthConfig::ApiKey {
					location: location?,
					value: value?,
				})
			})
		}
		AuthType::Signature => {
			let secret = reader.required("secret");
			let header = reader.required("header");
			let algorithm = reader.one_of::<SignatureAlgorithm>("algorithm");
			let encoding = reader.one_of::<SignatureEncoding>("encoding");
			reader.finish(|| {
				Some(SourceAuthConfig::Signature {
					secret: secret?,
					header: header?,
					algorithm: algorithm?,
					encoding: encoding?,
				})
			})
		}
	};

	if let Err(errors) = &result {
		debug!(fields = ?errors.fields().keys().collect::<Vec<_>>(), "auth config rejected");
	}
	result
}

/// Decide the auth settings after an update request.
///
/// - a new config is validated against the final type (the requested type,
///   or the existing one when none is requested)
/// - a type change without a config fails with [`AuthError::AuthConfigRequired`]
/// - otherwise the existing settings are kept
pub fn resolve_auth_config_update(
	existing: &StoredAuthConfig,
	requested_type: Option<&str>,
	requested_config: Option<&Value>,
) -> Result<StoredAuthConfig, AuthError> {
	let final_type = requested_type.unwrap_or(existing.auth_type.as_str());

	if let Some(config) = requested_config {
		return Ok(validate(final_type, config)?.to_stored());
	}

	let final_type: AuthType = final_type.parse()?;
	if final_type != existing.auth_type {
		return Err(AuthError::AuthConfigRequired);
	}
	Ok(existing.clone())
}
