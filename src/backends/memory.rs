//! In-memory session storage
//!
//! A process-local twin of the Redis backends for development and tests.
//! Sessions are lost when the process exits.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{SessionBackend, SessionError};

struct MemoryRecord {
	expires_at: i64,
	envelope: Vec<u8>,
}

/// Session backend storing records in process memory
///
/// Follows the one-key-per-session expiry model: an expired record behaves
/// exactly like an absent one, including for must-create writes. The write
/// lock spans the occupancy check and the insert, so concurrent creators of
/// the same key race exactly as they do against `SETNX`.
///
/// ## Example
///
/// ```rust
/// use reinhardt_redisession::backends::{MemorySessionBackend, SessionBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemorySessionBackend::new();
///
/// backend.store("dev-session", b"\x00{}", 3600, true).await?;
/// assert!(backend.exists("dev-session").await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MemorySessionBackend {
	store: Arc<RwLock<HashMap<String, MemoryRecord>>>,
}

impl MemorySessionBackend {
	/// Create an empty in-memory backend
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemorySessionBackend {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
	async fn fetch(&self, session_key: &str) -> Result<Option<Vec<u8>>, SessionError> {
		let store = self.store.read().await;
		match store.get(session_key) {
			Some(record) if record.expires_at > Utc::now().timestamp() => {
				Ok(Some(record.envelope.clone()))
			}
			_ => Ok(None),
		}
	}

	async fn store(
		&self,
		session_key: &str,
		envelope: &[u8],
		expiry_secs: u64,
		must_create: bool,
	) -> Result<(), SessionError> {
		let now = Utc::now().timestamp();
		let age = i64::try_from(expiry_secs).unwrap_or(i64::MAX);
		let expires_at = now.saturating_add(age);

		let mut store = self.store.write().await;
		if must_create {
			if let Some(existing) = store.get(session_key) {
				if existing.expires_at > now {
					return Err(SessionError::CreateConflict);
				}
			}
		}
		store.insert(
			session_key.to_string(),
			MemoryRecord {
				expires_at,
				envelope: envelope.to_vec(),
			},
		);
		Ok(())
	}

	async fn exists(&self, session_key: &str) -> Result<bool, SessionError> {
		let store = self.store.read().await;
		Ok(store
			.get(session_key)
			.is_some_and(|record| record.expires_at > Utc::now().timestamp()))
	}

	async fn delete(&self, session_key: &str) -> Result<(), SessionError> {
		self.store.write().await.remove(session_key);
		Ok(())
	}
}
