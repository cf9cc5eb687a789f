//! Session engine configuration
//!
//! [`RedisSessionConfig`] fixes every tunable of the engine at construction:
//! the storage mode, the key derivations, the serialization format, the
//! compression policy, the expiry age and the create-retry bound. Instances
//! are built once at startup and shared; nothing consults the configuration
//! dynamically afterwards.
//!
//! ## Example
//!
//! ```rust
//! use reinhardt_redisession::config::{RedisSessionConfig, StorageMode};
//! use reinhardt_redisession::key::HexPrefixKey;
//!
//! let config = RedisSessionConfig::default()
//!     .with_mode(StorageMode::Hash)
//!     .with_bucket_key(HexPrefixKey::new(2))
//!     .with_compress_min_length(1024)
//!     .with_expiry_age(3600);
//!
//! assert_eq!(config.mode, StorageMode::Hash);
//! assert_eq!(config.expiry_age, 3600);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::compression::{Compressor, GzipCompressor};
use crate::key::{HashKeyMapper, HexKey, HexPrefixKey, KeyDerivation, PlainKeyMapper};
use crate::serialization::SerializationFormat;

/// Storage addressing mode
///
/// Selected once at backend construction; the two modes never mix for the
/// same record population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageMode {
	/// Sessions grouped into Redis hashes by a derived bucket key, expiry
	/// embedded in each field value
	#[default]
	Hash,
	/// One Redis key per session, expiry via the native key TTL
	Plain,
}

/// Configuration for the Redis session engine
///
/// All fields are public for inspection; the `with_*` builders cover the
/// usual construction path.
#[derive(Clone)]
pub struct RedisSessionConfig {
	/// Storage addressing mode
	pub mode: StorageMode,
	/// Bucket-key derivation, hash mode only
	pub bucket_key: Arc<dyn KeyDerivation>,
	/// Item-key derivation: the hash field in hash mode, the whole storage
	/// key in plain mode
	pub item_key: Arc<dyn KeyDerivation>,
	/// Payload serialization format
	pub serialization: SerializationFormat,
	/// Compressor handle, `None` to disable compression entirely
	pub compressor: Option<Arc<dyn Compressor>>,
	/// Minimum serialized length before compression is attempted
	pub compress_min_length: usize,
	/// Emit a warning for session keys the derivations reject
	pub log_key_errors: bool,
	/// Session lifetime in seconds
	pub expiry_age: u64,
	/// Upper bound on create-loop attempts before giving up
	pub create_retry_limit: usize,
}

impl RedisSessionConfig {
	/// Create a configuration with the default settings
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the storage addressing mode
	pub fn with_mode(mut self, mode: StorageMode) -> Self {
		self.mode = mode;
		self
	}

	/// Set the bucket-key derivation used in hash mode
	pub fn with_bucket_key<D: KeyDerivation + 'static>(mut self, derivation: D) -> Self {
		self.bucket_key = Arc::new(derivation);
		self
	}

	/// Set the item-key derivation
	pub fn with_item_key<D: KeyDerivation + 'static>(mut self, derivation: D) -> Self {
		self.item_key = Arc::new(derivation);
		self
	}

	/// Set the payload serialization format
	pub fn with_serialization(mut self, format: SerializationFormat) -> Self {
		self.serialization = format;
		self
	}

	/// Set the compressor
	pub fn with_compressor<C: Compressor + 'static>(mut self, compressor: C) -> Self {
		self.compressor = Some(Arc::new(compressor));
		self
	}

	/// Disable compression entirely
	pub fn without_compression(mut self) -> Self {
		self.compressor = None;
		self
	}

	/// Set the minimum serialized length before compression is attempted
	pub fn with_compress_min_length(mut self, min_length: usize) -> Self {
		self.compress_min_length = min_length;
		self
	}

	/// Log a warning whenever a session key fails derivation
	pub fn with_log_key_errors(mut self, log: bool) -> Self {
		self.log_key_errors = log;
		self
	}

	/// Set the session lifetime in seconds
	pub fn with_expiry_age(mut self, seconds: u64) -> Self {
		self.expiry_age = seconds;
		self
	}

	/// Set the upper bound on create-loop attempts
	pub fn with_create_retry_limit(mut self, limit: usize) -> Self {
		self.create_retry_limit = limit;
		self
	}

	/// Build the hash-mode key mapper from the configured derivations
	pub fn hash_mapper(&self) -> HashKeyMapper {
		HashKeyMapper::new(
			self.bucket_key.clone(),
			self.item_key.clone(),
			self.log_key_errors,
		)
	}

	/// Build the plain-mode key mapper from the configured derivation
	pub fn plain_mapper(&self) -> PlainKeyMapper {
		PlainKeyMapper::new(self.item_key.clone(), self.log_key_errors)
	}
}

impl Default for RedisSessionConfig {
	/// Hash mode, hex derivations, JSON payloads, gzip compression from 400
	/// bytes, two-week expiry, 10 000 create attempts
	fn default() -> Self {
		Self {
			mode: StorageMode::default(),
			bucket_key: Arc::new(HexPrefixKey::default()),
			item_key: Arc::new(HexKey),
			serialization: SerializationFormat::default(),
			compressor: Some(Arc::new(GzipCompressor::new())),
			compress_min_length: 400,
			log_key_errors: false,
			expiry_age: 1_209_600,
			create_retry_limit: 10_000,
		}
	}
}

impl fmt::Debug for RedisSessionConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RedisSessionConfig")
			.field("mode", &self.mode)
			.field("serialization", &self.serialization.name())
			.field("compressor", &self.compressor.as_ref().map(|c| c.name()))
			.field("compress_min_length", &self.compress_min_length)
			.field("log_key_errors", &self.log_key_errors)
			.field("expiry_age", &self.expiry_age)
			.field("create_retry_limit", &self.create_retry_limit)
			.finish_non_exhaustive()
	}
}
