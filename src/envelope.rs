//! Storage envelope for session records
//!
//! Every stored session value starts with a one-byte flag followed by the
//! serialized payload. Bit 0 of the flag marks a compressed payload; the
//! remaining bits are reserved and ignored on decode. Because the flag
//! travels with each record, the compression settings can change at any time
//! without invalidating sessions already in the store.
//!
//! The hash-bucketed layout additionally prefixes the stored value with a
//! 4-byte big-endian expiry timestamp; that prefix belongs to the backend,
//! not to this codec.
//!
//! ## Example
//!
//! ```rust
//! use reinhardt_redisession::envelope::SessionCodec;
//! use reinhardt_redisession::session::SessionData;
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = SessionCodec::default();
//!
//! let mut data = SessionData::new();
//! data.insert("user".to_string(), json!(7));
//!
//! let envelope = codec.encode(&data)?;
//! let decoded = codec.decode(&envelope)?;
//! assert_eq!(decoded, data);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use thiserror::Error;

use crate::backends::SessionError;
use crate::compression::Compressor;
use crate::config::RedisSessionConfig;
use crate::serialization::SerializationFormat;
use crate::session::SessionData;

/// Flag bit marking a compressed payload
pub const FLAG_COMPRESSED: u8 = 1;

/// Envelope decoding errors
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DecodeError {
	/// The stored record is too short to carry an envelope
	#[error("stored session record is truncated")]
	Truncated,

	/// The record is marked compressed but no compressor is configured
	#[error("found compressed session data without a configured compressor")]
	MissingCompressor,
}

/// Encoder/decoder for the session storage envelope
///
/// Compression is applied only when a compressor is configured, the
/// serialized payload reaches the configured minimum length, and the
/// compressed form is strictly smaller than the serialized one. The flag
/// byte records the decision per stored value, making `decode` an exact
/// inverse of `encode` regardless of when either setting changed.
#[derive(Clone)]
pub struct SessionCodec {
	format: SerializationFormat,
	compressor: Option<Arc<dyn Compressor>>,
	compress_min_length: usize,
}

impl SessionCodec {
	/// Create a codec
	pub fn new(
		format: SerializationFormat,
		compressor: Option<Arc<dyn Compressor>>,
		compress_min_length: usize,
	) -> Self {
		Self {
			format,
			compressor,
			compress_min_length,
		}
	}

	/// Create a codec from the session configuration
	pub fn from_config(config: &RedisSessionConfig) -> Self {
		Self::new(
			config.serialization,
			config.compressor.clone(),
			config.compress_min_length,
		)
	}

	/// Encode a session payload into envelope bytes
	pub fn encode(&self, data: &SessionData) -> Result<Vec<u8>, SessionError> {
		let mut payload = self.format.serialize(data)?;
		let mut flag = 0u8;

		if let Some(compressor) = &self.compressor {
			if payload.len() >= self.compress_min_length {
				let compressed = compressor.compress(&payload)?;
				// Keep the compressed form only when it actually wins
				if compressed.len() < payload.len() {
					flag |= FLAG_COMPRESSED;
					payload = compressed;
				}
			}
		}

		let mut envelope = Vec::with_capacity(payload.len() + 1);
		envelope.push(flag);
		envelope.extend_from_slice(&payload);
		Ok(envelope)
	}

	/// Decode envelope bytes back into a session payload
	///
	/// An empty envelope is a decode error, not an absent session; absence
	/// is decided by the backend before the bytes reach this codec. A
	/// compressed record without a configured compressor is surfaced as
	/// [`DecodeError::MissingCompressor`] so the misconfiguration is visible
	/// instead of silently discarding live sessions.
	pub fn decode(&self, envelope: &[u8]) -> Result<SessionData, SessionError> {
		let (flag, payload) = match envelope.split_first() {
			Some((flag, payload)) => (*flag, payload),
			None => return Err(DecodeError::Truncated.into()),
		};

		if flag & FLAG_COMPRESSED != 0 {
			let compressor = self
				.compressor
				.as_ref()
				.ok_or(DecodeError::MissingCompressor)?;
			let decompressed = compressor.decompress(payload)?;
			Ok(self.format.deserialize(&decompressed)?)
		} else {
			Ok(self.format.deserialize(payload)?)
		}
	}
}

impl Default for SessionCodec {
	/// JSON serialization, gzip compression for payloads of 400 bytes and up
	fn default() -> Self {
		Self::from_config(&RedisSessionConfig::default())
	}
}
