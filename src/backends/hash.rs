//! Hash-bucketed Redis storage
//!
//! Sessions share Redis hashes: the derived bucket key names the hash, the
//! derived item key names the field. Redis cannot expire single hash fields,
//! so each stored field value carries its own absolute expiry as a 4-byte
//! big-endian prefix, checked lazily on fetch. Stale fields linger until the
//! scavenger or an overwrite removes them.

use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::Pool;
use redis::AsyncCommands;

use super::{SessionBackend, SessionError};
use crate::config::RedisSessionConfig;
use crate::envelope::DecodeError;
use crate::key::HashKeyMapper;

/// Offset of the envelope within a stored field value
///
/// Field layout: `[4-byte big-endian expiry][envelope]`.
const ENVELOPE_OFFSET: usize = 4;

/// Prefix an envelope with its absolute expiry timestamp
fn encode_record(envelope: &[u8], expire_at: u32) -> Vec<u8> {
	let mut record = Vec::with_capacity(ENVELOPE_OFFSET + envelope.len());
	record.extend_from_slice(&expire_at.to_be_bytes());
	record.extend_from_slice(envelope);
	record
}

/// Split a stored field value into its expiry timestamp and envelope
pub(crate) fn decode_record(record: &[u8]) -> Result<(u32, &[u8]), SessionError> {
	if record.len() < ENVELOPE_OFFSET {
		return Err(DecodeError::Truncated.into());
	}
	let expire_at = u32::from_be_bytes([record[0], record[1], record[2], record[3]]);
	Ok((expire_at, &record[ENVELOPE_OFFSET..]))
}

/// Session backend over hash-bucketed Redis storage
///
/// Grouping sessions into buckets keeps the keyspace small and lets related
/// sessions share one Redis allocation, at the price of application-level
/// expiry. Atomic creation maps to `HSETNX` on the bucket field.
#[derive(Clone)]
pub struct HashSessionBackend {
	pool: Pool,
	mapper: HashKeyMapper,
}

impl HashSessionBackend {
	/// Create a backend over a connection pool
	pub fn new(pool: Pool, config: &RedisSessionConfig) -> Self {
		Self {
			pool,
			mapper: config.hash_mapper(),
		}
	}
}

#[async_trait]
impl SessionBackend for HashSessionBackend {
	async fn fetch(&self, session_key: &str) -> Result<Option<Vec<u8>>, SessionError> {
		let Ok(address) = self.mapper.map_key(session_key) else {
			return Ok(None);
		};

		let mut conn = self
			.pool
			.get()
			.await
			.map_err(|e| SessionError::Pool(e.to_string()))?;
		let record: Option<Vec<u8>> = conn
			.hget(address.bucket.as_slice(), address.field.as_slice())
			.await?;
		let Some(record) = record else {
			return Ok(None);
		};

		let (expire_at, envelope) = decode_record(&record)?;
		if i64::from(expire_at) <= Utc::now().timestamp() {
			// Lazy expiry: the stale field stays in the bucket until the
			// scavenger or an overwrite removes it
			return Ok(None);
		}
		Ok(Some(envelope.to_vec()))
	}

	async fn store(
		&self,
		session_key: &str,
		envelope: &[u8],
		expiry_secs: u64,
		must_create: bool,
	) -> Result<(), SessionError> {
		// An unmappable key has no storage slot to write to; both write
		// paths surface that as a create conflict
		let address = self
			.mapper
			.map_key(session_key)
			.map_err(|_| SessionError::CreateConflict)?;

		let age = i64::try_from(expiry_secs).unwrap_or(i64::MAX);
		// The 4-byte prefix caps embedded expiries in 2106
		let expire_at = Utc::now()
			.timestamp()
			.saturating_add(age)
			.min(i64::from(u32::MAX)) as u32;
		let record = encode_record(envelope, expire_at);

		let mut conn = self
			.pool
			.get()
			.await
			.map_err(|e| SessionError::Pool(e.to_string()))?;
		if must_create {
			let created: bool = conn
				.hset_nx(
					address.bucket.as_slice(),
					address.field.as_slice(),
					record.as_slice(),
				)
				.await?;
			if !created {
				return Err(SessionError::CreateConflict);
			}
		} else {
			let _: i64 = conn
				.hset(
					address.bucket.as_slice(),
					address.field.as_slice(),
					record.as_slice(),
				)
				.await?;
		}
		Ok(())
	}

	async fn exists(&self, session_key: &str) -> Result<bool, SessionError> {
		let Ok(address) = self.mapper.map_key(session_key) else {
			return Ok(false);
		};

		let mut conn = self
			.pool
			.get()
			.await
			.map_err(|e| SessionError::Pool(e.to_string()))?;
		// Presence only: the embedded expiry is not consulted, so a lazily
		// expired record reports as existing until it is evicted
		Ok(conn
			.hexists(address.bucket.as_slice(), address.field.as_slice())
			.await?)
	}

	async fn delete(&self, session_key: &str) -> Result<(), SessionError> {
		let Ok(address) = self.mapper.map_key(session_key) else {
			return Ok(());
		};

		let mut conn = self
			.pool
			.get()
			.await
			.map_err(|e| SessionError::Pool(e.to_string()))?;
		let _: i64 = conn
			.hdel(address.bucket.as_slice(), address.field.as_slice())
			.await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use deadpool_redis::{Config as PoolConfig, Runtime};
	use rstest::rstest;

	// Pool creation is lazy, so a backend over an unreachable address still
	// exercises every path that short-circuits before touching Redis.
	fn unreachable_backend() -> HashSessionBackend {
		let pool = PoolConfig::from_url("redis://127.0.0.1:1")
			.create_pool(Some(Runtime::Tokio1))
			.unwrap();
		HashSessionBackend::new(pool, &RedisSessionConfig::default())
	}

	#[rstest]
	fn test_record_round_trip() {
		let record = encode_record(b"\x00{\"user\":7}", 1_700_000_000);
		let (expire_at, envelope) = decode_record(&record).unwrap();
		assert_eq!(expire_at, 1_700_000_000);
		assert_eq!(envelope, b"\x00{\"user\":7}");
	}

	#[rstest]
	fn test_record_layout_is_expiry_prefix_then_envelope() {
		let record = encode_record(b"\x00{}", 0x0102_0304);
		assert_eq!(&record[..4], &[0x01, 0x02, 0x03, 0x04]);
		assert_eq!(&record[4..], b"\x00{}");
	}

	#[rstest]
	#[case(&[])]
	#[case(&[0x01])]
	#[case(&[0x01, 0x02, 0x03])]
	fn test_truncated_record_is_rejected(#[case] record: &[u8]) {
		let err = decode_record(record).unwrap_err();
		assert!(matches!(err, SessionError::Decode(DecodeError::Truncated)));
	}

	#[rstest]
	fn test_record_with_empty_envelope_splits() {
		// Prefix-only records split cleanly; rejecting the empty envelope
		// is the codec's call
		let (expire_at, envelope) = decode_record(&[0, 0, 0, 1]).unwrap();
		assert_eq!(expire_at, 1);
		assert!(envelope.is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_fetch_with_unmappable_key_is_absent() {
		let backend = unreachable_backend();
		let fetched = backend.fetch("not-hex!").await.unwrap();
		assert!(fetched.is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_store_with_unmappable_key_conflicts() {
		let backend = unreachable_backend();
		let err = backend.store("not-hex!", b"\x00{}", 3600, false).await.unwrap_err();
		assert!(matches!(err, SessionError::CreateConflict));

		let err = backend.store("not-hex!", b"\x00{}", 3600, true).await.unwrap_err();
		assert!(matches!(err, SessionError::CreateConflict));
	}

	#[rstest]
	#[tokio::test]
	async fn test_exists_with_unmappable_key_is_false() {
		let backend = unreachable_backend();
		assert!(!backend.exists("not-hex!").await.unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_with_unmappable_key_is_noop() {
		let backend = unreachable_backend();
		backend.delete("not-hex!").await.unwrap();
	}
}
