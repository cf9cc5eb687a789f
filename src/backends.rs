//! Session storage backends
//!
//! A backend persists encoded session envelopes under derived storage keys
//! and enforces the create-if-absent contract with the store's native
//! conditional-write primitives. Two Redis layouts are provided, selected
//! once at construction:
//!
//! - [`HashSessionBackend`]: sessions grouped into Redis hashes by a derived
//!   bucket key, with the expiry timestamp embedded in each field value
//! - [`PlainSessionBackend`]: one Redis key per session with a native TTL
//!
//! [`MemorySessionBackend`] implements the same contract in process memory
//! for development and tests, and [`RedisSessionBackend`] dispatches between
//! the two Redis layouts based on the configured storage mode.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reinhardt_redisession::backends::{RedisSessionBackend, SessionBackend};
//! use reinhardt_redisession::config::RedisSessionConfig;
//! use deadpool_redis::{Config as PoolConfig, Runtime};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PoolConfig::from_url("redis://127.0.0.1:6379")
//!     .create_pool(Some(Runtime::Tokio1))?;
//! let config = RedisSessionConfig::default();
//! let backend = RedisSessionBackend::from_config(pool, &config);
//!
//! let key = backend.new_session_key();
//! backend.store(&key, b"\x00{}", 3600, true).await?;
//! assert!(backend.exists(&key).await?);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::compression::CompressionError;
use crate::config::{RedisSessionConfig, StorageMode};
use crate::envelope::DecodeError;
use crate::key::generate_session_key;
use crate::serialization::SerializationError;

// Submodules
mod hash;
pub(crate) use hash::decode_record;
pub use hash::HashSessionBackend;

mod plain;
pub use plain::PlainSessionBackend;

mod memory;
pub use memory::MemorySessionBackend;

/// Session storage errors
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
	/// A must-create write found the storage slot occupied, or the session
	/// key could not be mapped to a storage key
	#[error("session create conflict: storage key already occupied")]
	CreateConflict,

	/// The create loop exhausted its configured attempt bound
	#[error("unable to allocate a new session key after {0} attempts")]
	CreateRetriesExhausted(usize),

	/// A stored record could not be decoded
	#[error("Decode error: {0}")]
	Decode(#[from] DecodeError),

	/// Payload serialization failed
	#[error("Serialization error: {0}")]
	Serialization(#[from] SerializationError),

	/// Payload compression failed
	#[error("Compression error: {0}")]
	Compression(#[from] CompressionError),

	/// Redis command failure
	#[error("Redis error: {0}")]
	Redis(#[from] redis::RedisError),

	/// Connection pool failure
	#[error("Connection pool error: {0}")]
	Pool(String),
}

/// Session backend trait
///
/// Backends deal in opaque envelope bytes; payload encoding and the create
/// retry loop live in [`Session`](crate::session::Session). Key derivation
/// failures never surface from a backend: `store` reports them as
/// [`SessionError::CreateConflict`], `fetch` as an absent record, `exists`
/// as `false` and `delete` as a no-op.
#[async_trait]
pub trait SessionBackend: Send + Sync + Clone {
	/// Fetch the stored envelope for a session key
	///
	/// Returns `None` for absent records and for records whose expiry has
	/// passed, where the backend tracks expiry itself.
	async fn fetch(&self, session_key: &str) -> Result<Option<Vec<u8>>, SessionError>;

	/// Persist an envelope under a session key
	///
	/// `expiry_secs` is the relative age after which the record expires.
	/// With `must_create` the write only succeeds on an unoccupied storage
	/// slot, using a conditional-write primitive so that exactly one of any
	/// number of concurrent creators wins.
	async fn store(
		&self,
		session_key: &str,
		envelope: &[u8],
		expiry_secs: u64,
		must_create: bool,
	) -> Result<(), SessionError>;

	/// Check whether a record exists for a session key
	async fn exists(&self, session_key: &str) -> Result<bool, SessionError>;

	/// Delete the record for a session key
	async fn delete(&self, session_key: &str) -> Result<(), SessionError>;

	/// Generate a fresh candidate session key
	///
	/// The default emits 32 lowercase hex characters, which the default key
	/// derivations always accept.
	fn new_session_key(&self) -> String {
		generate_session_key()
	}
}

/// Redis session backend dispatching on the configured storage mode
///
/// The mode is resolved once here, at construction; the per-operation code
/// paths in the two layouts stay branch-free.
#[derive(Clone)]
pub enum RedisSessionBackend {
	/// Hash-bucketed layout
	Hash(HashSessionBackend),
	/// One-key-per-session layout
	Plain(PlainSessionBackend),
}

impl RedisSessionBackend {
	/// Create a backend for the storage mode carried by the configuration
	pub fn from_config(pool: deadpool_redis::Pool, config: &RedisSessionConfig) -> Self {
		match config.mode {
			StorageMode::Hash => Self::Hash(HashSessionBackend::new(pool, config)),
			StorageMode::Plain => Self::Plain(PlainSessionBackend::new(pool, config)),
		}
	}
}

#[async_trait]
impl SessionBackend for RedisSessionBackend {
	async fn fetch(&self, session_key: &str) -> Result<Option<Vec<u8>>, SessionError> {
		match self {
			Self::Hash(backend) => backend.fetch(session_key).await,
			Self::Plain(backend) => backend.fetch(session_key).await,
		}
	}

	async fn store(
		&self,
		session_key: &str,
		envelope: &[u8],
		expiry_secs: u64,
		must_create: bool,
	) -> Result<(), SessionError> {
		match self {
			Self::Hash(backend) => {
				backend
					.store(session_key, envelope, expiry_secs, must_create)
					.await
			}
			Self::Plain(backend) => {
				backend
					.store(session_key, envelope, expiry_secs, must_create)
					.await
			}
		}
	}

	async fn exists(&self, session_key: &str) -> Result<bool, SessionError> {
		match self {
			Self::Hash(backend) => backend.exists(session_key).await,
			Self::Plain(backend) => backend.exists(session_key).await,
		}
	}

	async fn delete(&self, session_key: &str) -> Result<(), SessionError> {
		match self {
			Self::Hash(backend) => backend.delete(session_key).await,
			Self::Plain(backend) => backend.delete(session_key).await,
		}
	}
}
