//! One-key-per-session Redis storage
//!
//! Each session occupies its own Redis key holding the bare envelope, with
//! the expiry delegated to the native key TTL. Unlike the hash-bucketed
//! layout there is no embedded timestamp: an absent fetch already means
//! missing or expired, and no scavenging is ever needed.

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;

use super::{SessionBackend, SessionError};
use crate::config::RedisSessionConfig;
use crate::key::PlainKeyMapper;

/// Session backend storing one Redis key per session
///
/// Atomic creation maps to `SETNX`; the accompanying `EXPIRE` runs in the
/// same `MULTI`/`EXEC` transaction so no session key ever exists without a
/// TTL, not even across a crash between the two commands.
#[derive(Clone)]
pub struct PlainSessionBackend {
	pool: Pool,
	mapper: PlainKeyMapper,
}

impl PlainSessionBackend {
	/// Create a backend over a connection pool
	pub fn new(pool: Pool, config: &RedisSessionConfig) -> Self {
		Self {
			pool,
			mapper: config.plain_mapper(),
		}
	}
}

#[async_trait]
impl SessionBackend for PlainSessionBackend {
	async fn fetch(&self, session_key: &str) -> Result<Option<Vec<u8>>, SessionError> {
		let Ok(key) = self.mapper.map_key(session_key) else {
			return Ok(None);
		};

		let mut conn = self
			.pool
			.get()
			.await
			.map_err(|e| SessionError::Pool(e.to_string()))?;
		// The native TTL already removed expired records, so whatever comes
		// back is live
		let envelope: Option<Vec<u8>> = conn.get(key.as_slice()).await?;
		Ok(envelope)
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
		let key = self
			.mapper
			.map_key(session_key)
			.map_err(|_| SessionError::CreateConflict)?;
		let age = i64::try_from(expiry_secs).unwrap_or(i64::MAX);

		let mut conn = self
			.pool
			.get()
			.await
			.map_err(|e| SessionError::Pool(e.to_string()))?;
		if must_create {
			let (created, expire_set): (bool, bool) = redis::pipe()
				.atomic()
				.set_nx(key.as_slice(), envelope)
				.expire(key.as_slice(), age)
				.query_async(&mut *conn)
				.await?;
			// A lost SETNX race still refreshes the holder's TTL here
			if !(created && expire_set) {
				return Err(SessionError::CreateConflict);
			}
		} else {
			let _: ((), bool) = redis::pipe()
				.atomic()
				.set(key.as_slice(), envelope)
				.expire(key.as_slice(), age)
				.query_async(&mut *conn)
				.await?;
		}
		Ok(())
	}

	async fn exists(&self, session_key: &str) -> Result<bool, SessionError> {
		let Ok(key) = self.mapper.map_key(session_key) else {
			return Ok(false);
		};

		let mut conn = self
			.pool
			.get()
			.await
			.map_err(|e| SessionError::Pool(e.to_string()))?;
		Ok(conn.exists(key.as_slice()).await?)
	}

	async fn delete(&self, session_key: &str) -> Result<(), SessionError> {
		let Ok(key) = self.mapper.map_key(session_key) else {
			return Ok(());
		};

		let mut conn = self
			.pool
			.get()
			.await
			.map_err(|e| SessionError::Pool(e.to_string()))?;
		let _: i64 = conn.del(key.as_slice()).await?;
		Ok(())
	}
}
