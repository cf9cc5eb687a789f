//! # Reinhardt RediSession
//!
//! A Redis-backed session engine for Reinhardt, in the style of Django's
//! session framework.
//!
//! Session payloads are serialized, optionally compressed, wrapped in a
//! small flag-byte envelope and written to Redis under keys derived from the
//! cookie-borne session identifier. Creation is atomic against concurrent
//! requests, lookups are expiry-aware, and a session that cannot be found is
//! transparently replaced by a fresh empty one.
//!
//! ## Features
//!
//! - **Two storage modes**: hash-bucketed (sessions grouped into Redis
//!   hashes, expiry embedded per field) or one key per session (native TTL)
//! - **Pluggable key derivations**: session keys are hex-decoded to compact
//!   binary storage keys by default, replaceable per deployment
//! - **Envelope compression**: gzip by default, applied only when it pays
//!   off, recorded per stored value
//! - **Atomic creation**: `HSETNX`/`SETNX` with a bounded collision-retry
//!   loop
//! - **Named connection pools**: an explicit process-wide registry over
//!   `deadpool_redis`
//! - **Hygiene scavenging**: advisory eviction of lazily expired bucket
//!   fields
//! - **In-memory backend**: the same contract in process memory for
//!   development and tests
//!
//! Optional cargo features: `messagepack` (rmp-serde payloads) and
//! `compression-brotli`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reinhardt_redisession::config::RedisSessionConfig;
//! use reinhardt_redisession::connection;
//! use reinhardt_redisession::session::Session;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! connection::register_pool_url("sessions", "redis://127.0.0.1:6379")?;
//!
//! let config = RedisSessionConfig::default();
//! let mut session = Session::from_pool(connection::pool("sessions")?, &config);
//!
//! session.set("user_id", json!(42));
//! session.save(false).await?;
//!
//! let key = session.session_key().unwrap();
//! println!("Set-Cookie: sessionid={key}");
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod cleanup;
pub mod compression;
pub mod config;
pub mod connection;
pub mod envelope;
pub mod key;
pub mod serialization;
pub mod session;

// Re-export common types
pub use backends::{
	HashSessionBackend, MemorySessionBackend, PlainSessionBackend, RedisSessionBackend,
	SessionBackend, SessionError,
};
pub use cleanup::{ScavengeConfig, SessionScavenger};
pub use compression::{CompressionError, Compressor, GzipCompressor};
pub use config::{RedisSessionConfig, StorageMode};
pub use envelope::{DecodeError, FLAG_COMPRESSED, SessionCodec};
pub use key::{HexKey, HexPrefixKey, KeyDerivation, KeyError, generate_session_key};
pub use serialization::{JsonSerializer, SerializationError, SerializationFormat, Serializer};
pub use session::{Session, SessionData};

#[cfg(feature = "compression-brotli")]
pub use compression::BrotliCompressor;

#[cfg(feature = "messagepack")]
pub use serialization::MessagePackSerializer;
