//! Session key derivation
//!
//! Cookie-borne session keys never reach Redis verbatim: a key derivation
//! turns them into the raw byte keys used for storage. The defaults assume
//! hex session keys (as produced by [`generate_session_key`]) and hex-decode
//! them, halving the key bytes stored on every record.
//!
//! Derivations are failable on purpose. A session key arrives from the
//! client, so a malformed one must map to "no such session" rather than an
//! error page; the per-operation handling of [`KeyError`] lives in the
//! storage backends.
//!
//! ## Example
//!
//! ```rust
//! use reinhardt_redisession::key::{HexKey, HexPrefixKey, KeyDerivation};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session_key = "deadbeef00112233445566778899aabb";
//!
//! // Whole-key derivation: 32 hex chars become 16 bytes
//! let item = HexKey.derive(session_key)?;
//! assert_eq!(item.len(), 16);
//!
//! // Prefix derivation: the first 4 hex chars become a 2-byte bucket key
//! let bucket = HexPrefixKey::default().derive(session_key)?;
//! assert_eq!(bucket, vec![0xde, 0xad]);
//! # Ok(())
//! # }
//! ```

use rand::RngCore;
use std::sync::Arc;
use thiserror::Error;

/// Key derivation errors
///
/// A `KeyError` never crosses the public session API: `save` promotes it to a
/// create conflict, `load` falls back to creating a fresh session, `exists`
/// reports `false` and `delete` becomes a no-op.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum KeyError {
	/// The session key is empty, or the derived prefix is empty
	#[error("session key is empty")]
	Empty,

	/// The session key is not valid hex
	#[error("session key is not valid hex: {0}")]
	InvalidHex(#[from] hex::FromHexError),

	/// A custom derivation rejected the session key
	#[error("session key rejected: {0}")]
	Rejected(String),
}

/// Derivation from a session key to a raw storage key
///
/// Implementations must be deterministic: the same input always derives the
/// same bytes, with no dependency on time or stored state.
pub trait KeyDerivation: Send + Sync {
	/// Derive the storage key bytes for a session key
	fn derive(&self, session_key: &str) -> Result<Vec<u8>, KeyError>;
}

/// Hex-decodes the whole session key
///
/// The default item/flat derivation. Rejects empty, odd-length and non-hex
/// input.
///
/// # Example
///
/// ```rust
/// use reinhardt_redisession::key::{HexKey, KeyDerivation};
///
/// assert_eq!(HexKey.derive("c0ffee").unwrap(), vec![0xc0, 0xff, 0xee]);
/// assert!(HexKey.derive("not-hex!").is_err());
/// assert!(HexKey.derive("abc").is_err()); // odd length
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HexKey;

impl KeyDerivation for HexKey {
	fn derive(&self, session_key: &str) -> Result<Vec<u8>, KeyError> {
		if session_key.is_empty() {
			return Err(KeyError::Empty);
		}
		Ok(hex::decode(session_key)?)
	}
}

/// Hex-decodes a fixed-length prefix of the session key
///
/// The default bucket derivation: with the default length of 4 hex chars,
/// sessions spread across at most 65 536 buckets. A session key shorter than
/// the prefix length is derived from whatever prefix exists; an empty or
/// odd-length prefix is a derivation failure.
///
/// # Example
///
/// ```rust
/// use reinhardt_redisession::key::{HexPrefixKey, KeyDerivation};
///
/// let bucket = HexPrefixKey::new(4);
/// assert_eq!(
///     bucket.derive("deadbeef00112233445566778899aabb").unwrap(),
///     vec![0xde, 0xad],
/// );
/// // Shorter keys derive from the available prefix
/// assert_eq!(bucket.derive("be").unwrap(), vec![0xbe]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HexPrefixKey {
	chars: usize,
}

impl HexPrefixKey {
	/// Create a prefix derivation over the first `chars` characters
	pub fn new(chars: usize) -> Self {
		Self { chars }
	}

	/// Get the prefix length in characters
	pub fn chars(&self) -> usize {
		self.chars
	}
}

impl Default for HexPrefixKey {
	/// Default prefix length is 4 hex characters (a 2-byte bucket key)
	fn default() -> Self {
		Self::new(4)
	}
}

impl KeyDerivation for HexPrefixKey {
	fn derive(&self, session_key: &str) -> Result<Vec<u8>, KeyError> {
		// Byte slicing keeps a key containing multi-byte characters from
		// panicking; the stray bytes then fail hex decoding like any other
		// non-hex input.
		let bytes = session_key.as_bytes();
		let prefix = &bytes[..self.chars.min(bytes.len())];
		if prefix.is_empty() {
			return Err(KeyError::Empty);
		}
		Ok(hex::decode(prefix)?)
	}
}

/// Maps session keys to `(bucket, field)` addresses for hash-bucketed storage
#[derive(Clone)]
pub struct HashKeyMapper {
	bucket: Arc<dyn KeyDerivation>,
	field: Arc<dyn KeyDerivation>,
	log_key_errors: bool,
}

/// A two-level storage address: the bucket hash key and the field within it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketAddress {
	/// Redis hash key shared by all sessions with the same derived prefix
	pub bucket: Vec<u8>,
	/// Field within the bucket, unique per session
	pub field: Vec<u8>,
}

impl HashKeyMapper {
	/// Create a mapper from bucket and field derivations
	pub fn new(
		bucket: Arc<dyn KeyDerivation>,
		field: Arc<dyn KeyDerivation>,
		log_key_errors: bool,
	) -> Self {
		Self {
			bucket,
			field,
			log_key_errors,
		}
	}

	/// Derive the bucket address for a session key
	///
	/// Emits a warning naming the offending key when key error logging is
	/// enabled in the configuration.
	pub fn map_key(&self, session_key: &str) -> Result<BucketAddress, KeyError> {
		match self.derive_pair(session_key) {
			Ok(address) => Ok(address),
			Err(err) => {
				if self.log_key_errors {
					tracing::warn!(session_key = %session_key, error = %err, "invalid session key");
				}
				Err(err)
			}
		}
	}

	fn derive_pair(&self, session_key: &str) -> Result<BucketAddress, KeyError> {
		Ok(BucketAddress {
			bucket: self.bucket.derive(session_key)?,
			field: self.field.derive(session_key)?,
		})
	}
}

/// Maps session keys to single storage keys for one-key-per-session storage
#[derive(Clone)]
pub struct PlainKeyMapper {
	key: Arc<dyn KeyDerivation>,
	log_key_errors: bool,
}

impl PlainKeyMapper {
	/// Create a mapper from a key derivation
	pub fn new(key: Arc<dyn KeyDerivation>, log_key_errors: bool) -> Self {
		Self {
			key,
			log_key_errors,
		}
	}

	/// Derive the storage key for a session key
	///
	/// Emits a warning naming the offending key when key error logging is
	/// enabled in the configuration.
	pub fn map_key(&self, session_key: &str) -> Result<Vec<u8>, KeyError> {
		match self.key.derive(session_key) {
			Ok(key) => Ok(key),
			Err(err) => {
				if self.log_key_errors {
					tracing::warn!(session_key = %session_key, error = %err, "invalid session key");
				}
				Err(err)
			}
		}
	}
}

/// Generate a fresh candidate session key
///
/// Produces 32 lowercase hex characters from 16 random bytes, so the default
/// hex derivations always accept generated keys. Uniqueness is not checked
/// here; the conditional-write create path is what guards against collisions.
///
/// # Example
///
/// ```rust
/// use reinhardt_redisession::key::generate_session_key;
///
/// let key = generate_session_key();
/// assert_eq!(key.len(), 32);
/// assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
pub fn generate_session_key() -> String {
	let mut bytes = [0u8; 16];
	rand::thread_rng().fill_bytes(&mut bytes);
	hex::encode(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn hash_mapper(log: bool) -> HashKeyMapper {
		HashKeyMapper::new(
			Arc::new(HexPrefixKey::default()),
			Arc::new(HexKey),
			log,
		)
	}

	#[rstest]
	fn test_hex_key_decodes_whole_key() {
		let derived = HexKey.derive("deadbeef").unwrap();
		assert_eq!(derived, vec![0xde, 0xad, 0xbe, 0xef]);
	}

	#[rstest]
	#[case("")]
	#[case("abc")]
	#[case("zz")]
	#[case("dead-beef")]
	fn test_hex_key_rejects_malformed_input(#[case] session_key: &str) {
		assert!(HexKey.derive(session_key).is_err());
	}

	#[rstest]
	fn test_hex_prefix_key_takes_first_chars() {
		let derived = HexPrefixKey::new(4).derive("deadbeef").unwrap();
		assert_eq!(derived, vec![0xde, 0xad]);
	}

	#[rstest]
	fn test_hex_prefix_key_short_input() {
		// Shorter than the prefix: derive from what exists
		assert_eq!(HexPrefixKey::new(4).derive("be").unwrap(), vec![0xbe]);
		// Odd-length prefix fails
		assert!(HexPrefixKey::new(4).derive("bee").is_err());
		// Empty input fails rather than deriving an empty key
		assert!(HexPrefixKey::new(4).derive("").is_err());
	}

	#[rstest]
	fn test_hex_prefix_key_multibyte_input_does_not_panic() {
		// A prefix boundary inside a multi-byte character must fail cleanly
		assert!(HexPrefixKey::new(4).derive("日本語のキー").is_err());
	}

	#[rstest]
	fn test_hash_mapper_splits_bucket_and_field() {
		let mapper = hash_mapper(false);
		let address = mapper.map_key("deadbeef00112233445566778899aabb").unwrap();

		assert_eq!(address.bucket, vec![0xde, 0xad]);
		assert_eq!(address.bucket.len(), 2);
		assert_eq!(address.field.len(), 16);
		assert_eq!(&address.field[..2], &[0xde, 0xad]);
	}

	#[rstest]
	fn test_hash_mapper_is_deterministic() {
		let mapper = hash_mapper(false);
		let first = mapper.map_key("deadbeef00112233445566778899aabb").unwrap();
		let second = mapper.map_key("deadbeef00112233445566778899aabb").unwrap();
		assert_eq!(first, second);
	}

	#[rstest]
	fn test_hash_mapper_rejects_non_hex() {
		let mapper = hash_mapper(true);
		assert!(mapper.map_key("../../etc/passwd").is_err());
	}

	#[rstest]
	fn test_plain_mapper_uses_whole_key() {
		let mapper = PlainKeyMapper::new(Arc::new(HexKey), false);
		let key = mapper.map_key("c0ffee").unwrap();
		assert_eq!(key, vec![0xc0, 0xff, 0xee]);
	}

	#[rstest]
	fn test_plain_mapper_rejects_odd_length() {
		let mapper = PlainKeyMapper::new(Arc::new(HexKey), false);
		assert!(mapper.map_key("abc").is_err());
	}

	#[rstest]
	fn test_generate_session_key_is_hex() {
		let key = generate_session_key();
		assert_eq!(key.len(), 32);
		assert!(hex::decode(&key).is_ok());
	}

	#[rstest]
	fn test_generate_session_key_is_unique() {
		let first = generate_session_key();
		let second = generate_session_key();
		assert_ne!(first, second);
	}

	#[rstest]
	fn test_generated_keys_satisfy_default_derivations() {
		let mapper = hash_mapper(false);
		for _ in 0..32 {
			let key = generate_session_key();
			let address = mapper.map_key(&key).unwrap();
			assert_eq!(address.bucket.len(), 2);
			assert_eq!(address.field.len(), 16);
		}
	}

	#[rstest]
	fn test_custom_derivation_rejection() {
		struct DenyAll;
		impl KeyDerivation for DenyAll {
			fn derive(&self, _session_key: &str) -> Result<Vec<u8>, KeyError> {
				Err(KeyError::Rejected("denied".to_string()))
			}
		}

		let mapper = PlainKeyMapper::new(Arc::new(DenyAll), false);
		assert!(matches!(
			mapper.map_key("deadbeef"),
			Err(KeyError::Rejected(_))
		));
	}
}
