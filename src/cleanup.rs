//! Hash-bucket hygiene scavenging
//!
//! Hash-bucketed storage expires sessions lazily: a stale field stays in its
//! bucket until a fetch notices the embedded timestamp or an overwrite lands
//! on it. [`SessionScavenger`] reclaims that memory out of band by sampling
//! random keys and evicting expired fields from the buckets it happens to
//! hit.
//!
//! Scavenging is advisory housekeeping. Correctness never depends on it:
//! every read checks the embedded expiry itself, and one-key-per-session
//! storage expires natively and needs no scavenging at all. Run it from a
//! periodic job sized to taste; each pass touches at most the configured
//! sample.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reinhardt_redisession::cleanup::SessionScavenger;
//! use deadpool_redis::{Config as PoolConfig, Runtime};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PoolConfig::from_url("redis://127.0.0.1:6379")
//!     .create_pool(Some(Runtime::Tokio1))?;
//!
//! let scavenger = SessionScavenger::new(pool);
//! let evicted = scavenger.run().await?;
//! println!("evicted {} expired sessions", evicted);
//! # Ok(())
//! # }
//! ```

use chrono::Utc;
use deadpool_redis::Pool;
use std::collections::HashSet;

use crate::backends::{SessionError, decode_record};

/// Scavenger tuning knobs
///
/// # Example
///
/// ```rust
/// use reinhardt_redisession::cleanup::ScavengeConfig;
///
/// let config = ScavengeConfig::default();
/// assert_eq!(config.sample_size, 100);
/// assert_eq!(config.scan_batch, 100);
/// ```
#[derive(Debug, Clone)]
pub struct ScavengeConfig {
	/// Random keys drawn per pass
	pub sample_size: usize,
	/// Fields requested per `HSCAN` iteration
	pub scan_batch: usize,
}

impl Default for ScavengeConfig {
	fn default() -> Self {
		Self {
			sample_size: 100,
			scan_batch: 100,
		}
	}
}

/// Evicts lazily expired fields from randomly sampled session buckets
///
/// Sampling uses `RANDOMKEY`, so the scavenger assumes the database is
/// dedicated to session storage: it cannot tell a session bucket from any
/// other hash beyond checking the key type and skipping fields too short to
/// carry an expiry prefix.
pub struct SessionScavenger {
	pool: Pool,
	config: ScavengeConfig,
}

impl SessionScavenger {
	/// Create a scavenger with the default tuning
	pub fn new(pool: Pool) -> Self {
		Self::with_config(pool, ScavengeConfig::default())
	}

	/// Create a scavenger with explicit tuning
	pub fn with_config(pool: Pool, config: ScavengeConfig) -> Self {
		Self { pool, config }
	}

	/// Run one scavenge pass
	///
	/// Returns the number of evicted fields. A pass over an empty database
	/// or one that only samples live sessions evicts nothing.
	pub async fn run(&self) -> Result<usize, SessionError> {
		let mut conn = self
			.pool
			.get()
			.await
			.map_err(|e| SessionError::Pool(e.to_string()))?;

		let mut pipe = redis::pipe();
		pipe.atomic();
		for _ in 0..self.config.sample_size {
			pipe.cmd("RANDOMKEY");
		}
		let sampled: Vec<Option<Vec<u8>>> = pipe.query_async(&mut *conn).await?;

		// Random draws repeat; visit each candidate bucket once
		let candidates: HashSet<Vec<u8>> = sampled.into_iter().flatten().collect();

		let now = Utc::now().timestamp();
		let mut evicted = 0usize;
		for bucket in &candidates {
			let key_type: String = redis::cmd("TYPE")
				.arg(bucket.as_slice())
				.query_async(&mut *conn)
				.await?;
			if key_type != "hash" {
				continue;
			}
			evicted += self.scavenge_bucket(&mut conn, bucket, now).await?;
		}

		tracing::debug!(
			sampled = candidates.len(),
			evicted,
			"session scavenge pass complete"
		);
		Ok(evicted)
	}

	async fn scavenge_bucket(
		&self,
		conn: &mut deadpool_redis::Connection,
		bucket: &[u8],
		now: i64,
	) -> Result<usize, SessionError> {
		let mut evicted = 0usize;
		let mut cursor: u64 = 0;
		loop {
			let (next, entries): (u64, Vec<Vec<u8>>) = redis::cmd("HSCAN")
				.arg(bucket)
				.arg(cursor)
				.arg("COUNT")
				.arg(self.config.scan_batch)
				.query_async(&mut **conn)
				.await?;

			// HSCAN replies alternate field and value
			let mut expired: Vec<&[u8]> = Vec::new();
			for pair in entries.chunks_exact(2) {
				let (field, value) = (&pair[0], &pair[1]);
				// Fields without a readable expiry prefix are not ours to
				// touch
				let Ok((expire_at, _)) = decode_record(value) else {
					continue;
				};
				if i64::from(expire_at) <= now {
					expired.push(field.as_slice());
				}
			}

			if !expired.is_empty() {
				let mut del = redis::cmd("HDEL");
				del.arg(bucket);
				for field in &expired {
					del.arg(*field);
				}
				let removed: i64 = del.query_async(&mut **conn).await?;
				evicted += removed as usize;
			}

			cursor = next;
			if cursor == 0 {
				break;
			}
		}
		Ok(evicted)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use deadpool_redis::{Config as PoolConfig, Runtime};
	use rstest::rstest;

	#[rstest]
	fn test_scavenge_config_default() {
		let config = ScavengeConfig::default();
		assert_eq!(config.sample_size, 100);
		assert_eq!(config.scan_batch, 100);
	}

	#[rstest]
	fn test_scavenger_construction() {
		let pool = PoolConfig::from_url("redis://127.0.0.1:6379")
			.create_pool(Some(Runtime::Tokio1))
			.unwrap();
		let _scavenger = SessionScavenger::with_config(
			pool,
			ScavengeConfig {
				sample_size: 10,
				scan_batch: 50,
			},
		);
	}
}
