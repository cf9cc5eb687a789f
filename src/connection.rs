//! Named Redis connection pools
//!
//! A process-wide registry of `deadpool_redis` pools keyed by configuration
//! name. Pools are registered explicitly at startup and looked up by the
//! code paths that need them; fetching an unregistered name is an error,
//! never a silent reconstruction. Call [`close_all`] at shutdown.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reinhardt_redisession::connection;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! connection::register_pool_url("sessions", "redis://127.0.0.1:6379")?;
//!
//! let pool = connection::pool("sessions")?;
//! # Ok(())
//! # }
//! ```

use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::backends::SessionError;

/// Name conventionally used for the primary pool
pub const DEFAULT_POOL: &str = "default";

struct PoolRegistry {
	pools: RwLock<HashMap<String, Pool>>,
}

impl PoolRegistry {
	fn new() -> Self {
		Self {
			pools: RwLock::new(HashMap::new()),
		}
	}

	fn register(&self, name: String, pool: Pool) {
		self.pools.write().insert(name, pool);
	}

	fn register_url(&self, name: String, url: &str) -> Result<(), SessionError> {
		let pool = PoolConfig::from_url(url)
			.create_pool(Some(Runtime::Tokio1))
			.map_err(|e| SessionError::Pool(e.to_string()))?;
		self.register(name, pool);
		Ok(())
	}

	fn get(&self, name: &str) -> Result<Pool, SessionError> {
		self.pools.read().get(name).cloned().ok_or_else(|| {
			SessionError::Pool(format!("no connection pool registered under \"{name}\""))
		})
	}

	fn close_all(&self) {
		let mut pools = self.pools.write();
		for (name, pool) in pools.drain() {
			tracing::debug!(pool = %name, "closing redis pool");
			pool.close();
		}
	}
}

static POOLS: Lazy<PoolRegistry> = Lazy::new(PoolRegistry::new);

/// Register a pool under a name
///
/// Replaces any previous registration under the same name; handles already
/// cloned out of the registry keep working until dropped.
pub fn register_pool(name: impl Into<String>, pool: Pool) {
	POOLS.register(name.into(), pool);
}

/// Build a pool from a Redis URL and register it under a name
///
/// Pool creation is lazy: no connection is attempted until the pool is
/// first used, so a registration succeeding says nothing about the server
/// being reachable.
pub fn register_pool_url(name: impl Into<String>, url: &str) -> Result<(), SessionError> {
	POOLS.register_url(name.into(), url)
}

/// Look up a registered pool by name
///
/// Errors when nothing is registered under the name. Missing registrations
/// are configuration mistakes; they are never papered over by constructing
/// a pool on the fly.
pub fn pool(name: &str) -> Result<Pool, SessionError> {
	POOLS.get(name)
}

/// Close every registered pool and empty the registry
pub fn close_all() {
	POOLS.close_all();
}
