//! Session object and lifecycle
//!
//! [`Session`] pairs an in-memory key-value map with a storage backend and
//! drives the whole lifecycle: loading, saving, atomic creation with bounded
//! retry, deletion and key cycling. The payload is held in memory between
//! operations; nothing reads the store implicitly.
//!
//! ## Example
//!
//! ```rust
//! use reinhardt_redisession::backends::MemorySessionBackend;
//! use reinhardt_redisession::config::RedisSessionConfig;
//! use reinhardt_redisession::session::Session;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let config = RedisSessionConfig::default();
//! let backend = MemorySessionBackend::new();
//!
//! let mut session = Session::new(backend.clone(), &config);
//! session.set("user_id", json!(123));
//! session.save(false).await?;
//! let key = session.session_key().map(str::to_string);
//!
//! // A later request binds the cookie key and loads the same data
//! let mut session = Session::new(backend, &config)
//!     .with_session_key(key.as_deref().unwrap());
//! let data = session.load().await?;
//! assert_eq!(data.get("user_id"), Some(&json!(123)));
//! # Ok::<(), reinhardt_redisession::backends::SessionError>(())
//! # }).unwrap();
//! ```

use std::collections::HashMap;

use crate::backends::{RedisSessionBackend, SessionBackend, SessionError};
use crate::config::RedisSessionConfig;
use crate::envelope::SessionCodec;

/// Session payload: string keys to JSON values
pub type SessionData = HashMap<String, serde_json::Value>;

/// A session bound to a storage backend
///
/// Carries the payload map, the optional cookie-borne session key and a
/// `modified` flag tracking in-memory mutations. Generic over the backend so
/// the same lifecycle runs against Redis in either storage mode or against
/// process memory in tests.
pub struct Session<B: SessionBackend> {
	backend: B,
	codec: SessionCodec,
	expiry_age: u64,
	create_retry_limit: usize,
	session_key: Option<String>,
	data: SessionData,
	modified: bool,
}

impl<B: SessionBackend> Session<B> {
	/// Create an unbound session over a backend
	///
	/// The session starts with no key and an empty payload; bind a
	/// cookie-borne key with [`with_session_key`](Self::with_session_key)
	/// or let [`load`](Self::load) / [`save`](Self::save) mint one.
	pub fn new(backend: B, config: &RedisSessionConfig) -> Self {
		Self {
			backend,
			codec: SessionCodec::from_config(config),
			expiry_age: config.expiry_age,
			create_retry_limit: config.create_retry_limit,
			session_key: None,
			data: SessionData::new(),
			modified: false,
		}
	}

	/// Bind the session key from an incoming request
	///
	/// # Examples
	///
	/// ```rust
	/// use reinhardt_redisession::backends::MemorySessionBackend;
	/// use reinhardt_redisession::config::RedisSessionConfig;
	/// use reinhardt_redisession::session::Session;
	///
	/// let config = RedisSessionConfig::default();
	/// let session = Session::new(MemorySessionBackend::new(), &config)
	///     .with_session_key("deadbeef00112233445566778899aabb");
	/// assert_eq!(
	///     session.session_key(),
	///     Some("deadbeef00112233445566778899aabb"),
	/// );
	/// ```
	pub fn with_session_key(mut self, session_key: impl Into<String>) -> Self {
		self.session_key = Some(session_key.into());
		self
	}

	/// Get the current session key, if any
	pub fn session_key(&self) -> Option<&str> {
		self.session_key.as_deref()
	}

	/// Whether the payload was mutated since construction
	///
	/// Set by [`set`](Self::set), [`remove`](Self::remove),
	/// [`clear`](Self::clear) and a successful [`create`](Self::create).
	pub fn is_modified(&self) -> bool {
		self.modified
	}

	/// Get the current payload
	pub fn data(&self) -> &SessionData {
		&self.data
	}

	/// Set a value in the payload
	///
	/// # Examples
	///
	/// ```rust
	/// use reinhardt_redisession::backends::MemorySessionBackend;
	/// use reinhardt_redisession::config::RedisSessionConfig;
	/// use reinhardt_redisession::session::Session;
	/// use serde_json::json;
	///
	/// let config = RedisSessionConfig::default();
	/// let mut session = Session::new(MemorySessionBackend::new(), &config);
	/// session.set("user_id", json!(123));
	/// assert_eq!(session.get("user_id"), Some(&json!(123)));
	/// assert!(session.is_modified());
	/// ```
	pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
		self.data.insert(key.into(), value);
		self.modified = true;
	}

	/// Get a value from the payload
	pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
		self.data.get(key)
	}

	/// Remove a value from the payload
	///
	/// Marks the session modified only when the key was present.
	pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
		let removed = self.data.remove(key);
		if removed.is_some() {
			self.modified = true;
		}
		removed
	}

	/// Whether the payload is empty
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Clear the payload
	pub fn clear(&mut self) {
		self.data.clear();
		self.modified = true;
	}

	/// Get the bound session key, minting a fresh candidate if unbound
	///
	/// Minting only generates the key string; nothing is persisted until
	/// [`save`](Self::save) or [`create`](Self::create) runs.
	pub fn get_or_create_session_key(&mut self) -> String {
		match &self.session_key {
			Some(key) => key.clone(),
			None => {
				let key = self.backend.new_session_key();
				self.session_key = Some(key.clone());
				key
			}
		}
	}

	/// Load the session payload from the store
	///
	/// When a live record exists under the bound key, its payload replaces
	/// the in-memory map and is returned. On any miss the session self-heals:
	/// the payload is emptied and [`create`](Self::create) persists a fresh
	/// session under a brand-new key.
	///
	/// This means `load` never reports "no session" to the caller. A missing
	/// record, an expired record and a session key the derivations reject
	/// are indistinguishable from here on: all three come back as an empty
	/// payload under a fresh key. Callers needing to distinguish presence
	/// must ask [`exists`](Self::exists) first.
	///
	/// Decode failures are surfaced, not healed: a corrupt record or a
	/// compressed record without a configured compressor is an error.
	pub async fn load(&mut self) -> Result<SessionData, SessionError> {
		let session_key = self.get_or_create_session_key();

		if let Some(envelope) = self.backend.fetch(&session_key).await? {
			let data = self.codec.decode(&envelope)?;
			self.data = data.clone();
			return Ok(data);
		}

		self.data.clear();
		self.create().await?;
		Ok(SessionData::new())
	}

	/// Persist the current payload
	///
	/// With `must_create` the write succeeds only on an unoccupied storage
	/// slot; a lost race or an unmappable session key surfaces as
	/// [`SessionError::CreateConflict`]. Without it the write is an
	/// unconditional upsert. Either way the record's expiry restarts at the
	/// configured age.
	pub async fn save(&mut self, must_create: bool) -> Result<(), SessionError> {
		let session_key = self.get_or_create_session_key();
		let envelope = self.codec.encode(&self.data)?;
		self.backend
			.store(&session_key, &envelope, self.expiry_age, must_create)
			.await
	}

	/// Persist the current payload under a brand-new session key
	///
	/// Generates candidate keys and attempts a must-create save for each,
	/// retrying on conflict up to the configured bound. Exhausting the bound
	/// means the key generator or the store is in a pathological state and
	/// fails with [`SessionError::CreateRetriesExhausted`].
	pub async fn create(&mut self) -> Result<(), SessionError> {
		for attempt in 1..=self.create_retry_limit {
			let candidate = self.backend.new_session_key();
			self.session_key = Some(candidate.clone());

			match self
				.backend
				.store(
					&candidate,
					&self.codec.encode(&self.data)?,
					self.expiry_age,
					true,
				)
				.await
			{
				Ok(()) => {
					self.modified = true;
					return Ok(());
				}
				Err(SessionError::CreateConflict) => {
					tracing::debug!(attempt, "session key collision, retrying");
					continue;
				}
				Err(err) => return Err(err),
			}
		}
		Err(SessionError::CreateRetriesExhausted(self.create_retry_limit))
	}

	/// Check whether a record exists for a session key
	///
	/// Presence only: in hash mode a lazily expired record still reports as
	/// existing until it is evicted.
	pub async fn exists(&self, session_key: &str) -> Result<bool, SessionError> {
		self.backend.exists(session_key).await
	}

	/// Delete a session record
	///
	/// Deletes the given key, or the bound key when `None`; a no-op when
	/// neither exists. The in-memory payload is left untouched.
	pub async fn delete(&mut self, session_key: Option<&str>) -> Result<(), SessionError> {
		let target = match session_key {
			Some(key) => key.to_string(),
			None => match &self.session_key {
				Some(key) => key.clone(),
				None => return Ok(()),
			},
		};
		self.backend.delete(&target).await
	}

	/// Move the session to a brand-new key, keeping the payload
	///
	/// The usual privilege-boundary step: call after login so the
	/// pre-authentication cookie stops addressing the authenticated record.
	/// The old record is deleted once the payload is saved under the new key.
	///
	/// # Examples
	///
	/// ```rust
	/// use reinhardt_redisession::backends::MemorySessionBackend;
	/// use reinhardt_redisession::config::RedisSessionConfig;
	/// use reinhardt_redisession::session::Session;
	/// use serde_json::json;
	///
	/// # tokio_test::block_on(async {
	/// let config = RedisSessionConfig::default();
	/// let mut session = Session::new(MemorySessionBackend::new(), &config);
	/// session.set("user_id", json!(123));
	/// session.save(false).await?;
	///
	/// let old_key = session.session_key().map(str::to_string);
	/// session.cycle_key().await?;
	/// assert_ne!(session.session_key(), old_key.as_deref());
	/// assert_eq!(session.get("user_id"), Some(&json!(123)));
	/// # Ok::<(), reinhardt_redisession::backends::SessionError>(())
	/// # }).unwrap();
	/// ```
	pub async fn cycle_key(&mut self) -> Result<(), SessionError> {
		let old_key = self.session_key.take();
		self.create().await?;
		if let Some(old_key) = old_key {
			self.backend.delete(&old_key).await?;
		}
		Ok(())
	}
}

impl Session<RedisSessionBackend> {
	/// Create an unbound session over a Redis pool
	///
	/// Builds the backend for the storage mode carried by the configuration.
	pub fn from_pool(pool: deadpool_redis::Pool, config: &RedisSessionConfig) -> Self {
		Self::new(RedisSessionBackend::from_config(pool, config), config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backends::MemorySessionBackend;
	use async_trait::async_trait;
	use rstest::rstest;
	use serde_json::json;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn config() -> RedisSessionConfig {
		RedisSessionConfig::default()
	}

	// Conflicts on the first `conflicts` must-create stores, then delegates.
	#[derive(Clone)]
	struct ConflictingBackend {
		inner: MemorySessionBackend,
		conflicts: Arc<AtomicUsize>,
		attempts: Arc<AtomicUsize>,
	}

	impl ConflictingBackend {
		fn new(conflicts: usize) -> Self {
			Self {
				inner: MemorySessionBackend::new(),
				conflicts: Arc::new(AtomicUsize::new(conflicts)),
				attempts: Arc::new(AtomicUsize::new(0)),
			}
		}

		fn attempts(&self) -> usize {
			self.attempts.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl SessionBackend for ConflictingBackend {
		async fn fetch(&self, session_key: &str) -> Result<Option<Vec<u8>>, SessionError> {
			self.inner.fetch(session_key).await
		}

		async fn store(
			&self,
			session_key: &str,
			envelope: &[u8],
			expiry_secs: u64,
			must_create: bool,
		) -> Result<(), SessionError> {
			if must_create {
				self.attempts.fetch_add(1, Ordering::SeqCst);
				if self
					.conflicts
					.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
					.is_ok()
				{
					return Err(SessionError::CreateConflict);
				}
			}
			self.inner
				.store(session_key, envelope, expiry_secs, must_create)
				.await
		}

		async fn exists(&self, session_key: &str) -> Result<bool, SessionError> {
			self.inner.exists(session_key).await
		}

		async fn delete(&self, session_key: &str) -> Result<(), SessionError> {
			self.inner.delete(session_key).await
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_load_auto_creates_when_unbound() {
		let backend = MemorySessionBackend::new();
		let mut session = Session::new(backend.clone(), &config());

		let data = session.load().await.unwrap();
		assert!(data.is_empty());
		assert!(session.is_modified());

		// The fresh session really is persisted
		let key = session.session_key().unwrap().to_string();
		assert!(backend.exists(&key).await.unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_load_auto_creates_on_absent_key() {
		let backend = MemorySessionBackend::new();
		let stale = "deadbeef00112233445566778899aabb";
		let mut session = Session::new(backend, &config()).with_session_key(stale);

		let data = session.load().await.unwrap();
		assert!(data.is_empty());
		// The stale cookie key was replaced by a fresh one
		assert_ne!(session.session_key(), Some(stale));
	}

	#[rstest]
	#[tokio::test]
	async fn test_load_returns_saved_payload() {
		let backend = MemorySessionBackend::new();
		let mut session = Session::new(backend.clone(), &config());
		session.set("user", json!(7));
		session.save(false).await.unwrap();
		let key = session.session_key().unwrap().to_string();

		let mut reloaded = Session::new(backend, &config()).with_session_key(&key);
		let data = reloaded.load().await.unwrap();
		assert_eq!(data.get("user"), Some(&json!(7)));
		// A hit keeps the bound key
		assert_eq!(reloaded.session_key(), Some(key.as_str()));
	}

	#[rstest]
	#[tokio::test]
	async fn test_load_after_expiry_returns_fresh_empty_session() {
		let backend = MemorySessionBackend::new();
		let expiring = config().with_expiry_age(0);

		let mut session = Session::new(backend.clone(), &expiring);
		session.set("user", json!(7));
		session.save(false).await.unwrap();
		let old_key = session.session_key().unwrap().to_string();

		let mut reloaded = Session::new(backend, &config()).with_session_key(&old_key);
		let data = reloaded.load().await.unwrap();
		assert!(data.is_empty());
		assert_ne!(reloaded.session_key(), Some(old_key.as_str()));
	}

	#[rstest]
	#[tokio::test]
	async fn test_load_is_idempotent() {
		let backend = MemorySessionBackend::new();
		let mut session = Session::new(backend.clone(), &config());
		session.set("user", json!(7));
		session.save(false).await.unwrap();
		let key = session.session_key().unwrap().to_string();

		let mut reloaded = Session::new(backend, &config()).with_session_key(&key);
		let first = reloaded.load().await.unwrap();
		let second = reloaded.load().await.unwrap();
		assert_eq!(first, second);
		assert_eq!(reloaded.session_key(), Some(key.as_str()));
	}

	#[rstest]
	#[tokio::test]
	async fn test_create_retries_through_conflicts() {
		let backend = ConflictingBackend::new(3);
		let mut session = Session::new(backend.clone(), &config());

		session.create().await.unwrap();
		assert!(session.is_modified());
		assert_eq!(backend.attempts(), 4);
	}

	#[rstest]
	#[tokio::test]
	async fn test_create_exhausts_at_configured_bound() {
		let backend = ConflictingBackend::new(usize::MAX);
		let limited = config().with_create_retry_limit(5);
		let mut session = Session::new(backend.clone(), &limited);

		let err = session.create().await.unwrap_err();
		assert!(matches!(err, SessionError::CreateRetriesExhausted(5)));
		assert_eq!(backend.attempts(), 5);
	}

	#[rstest]
	#[tokio::test]
	async fn test_save_must_create_conflicts_on_occupied_key() {
		let backend = MemorySessionBackend::new();
		let mut session = Session::new(backend.clone(), &config());
		session.save(true).await.unwrap();
		let key = session.session_key().unwrap().to_string();

		let mut rival = Session::new(backend, &config()).with_session_key(&key);
		let err = rival.save(true).await.unwrap_err();
		assert!(matches!(err, SessionError::CreateConflict));
	}

	#[rstest]
	#[tokio::test]
	async fn test_save_updates_in_place() {
		let backend = MemorySessionBackend::new();
		let mut session = Session::new(backend.clone(), &config());
		session.set("n", json!(1));
		session.save(false).await.unwrap();
		let key = session.session_key().unwrap().to_string();

		session.set("n", json!(2));
		session.save(false).await.unwrap();
		assert_eq!(session.session_key(), Some(key.as_str()));

		let mut reloaded = Session::new(backend, &config()).with_session_key(&key);
		assert_eq!(reloaded.load().await.unwrap().get("n"), Some(&json!(2)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_cycle_key_preserves_data_and_drops_old_record() {
		let backend = MemorySessionBackend::new();
		let mut session = Session::new(backend.clone(), &config());
		session.set("user", json!(7));
		session.save(false).await.unwrap();
		let old_key = session.session_key().unwrap().to_string();

		session.cycle_key().await.unwrap();
		let new_key = session.session_key().unwrap().to_string();
		assert_ne!(new_key, old_key);
		assert_eq!(session.get("user"), Some(&json!(7)));

		assert!(!backend.exists(&old_key).await.unwrap());
		let mut reloaded = Session::new(backend, &config()).with_session_key(&new_key);
		assert_eq!(reloaded.load().await.unwrap().get("user"), Some(&json!(7)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_bound_key() {
		let backend = MemorySessionBackend::new();
		let mut session = Session::new(backend.clone(), &config());
		session.save(false).await.unwrap();
		let key = session.session_key().unwrap().to_string();

		session.delete(None).await.unwrap();
		assert!(!backend.exists(&key).await.unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_explicit_key() {
		let backend = MemorySessionBackend::new();
		let mut victim = Session::new(backend.clone(), &config());
		victim.save(false).await.unwrap();
		let key = victim.session_key().unwrap().to_string();

		let mut other = Session::new(backend.clone(), &config());
		other.delete(Some(&key)).await.unwrap();
		assert!(!backend.exists(&key).await.unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_unbound_is_noop() {
		let mut session = Session::new(MemorySessionBackend::new(), &config());
		session.delete(None).await.unwrap();
		assert!(session.session_key().is_none());
	}

	#[rstest]
	fn test_modified_flag_tracks_mutations() {
		let mut session = Session::new(MemorySessionBackend::new(), &config());
		assert!(!session.is_modified());

		session.remove("absent");
		assert!(!session.is_modified());

		session.set("k", json!(1));
		assert!(session.is_modified());
	}

	#[rstest]
	fn test_clear_empties_payload() {
		let mut session = Session::new(MemorySessionBackend::new(), &config());
		session.set("a", json!(1));
		session.set("b", json!(2));
		session.clear();
		assert!(session.is_empty());
		assert!(session.is_modified());
	}

	#[rstest]
	fn test_get_or_create_session_key_is_stable() {
		let mut session = Session::new(MemorySessionBackend::new(), &config());
		let first = session.get_or_create_session_key();
		let second = session.get_or_create_session_key();
		assert_eq!(first, second);
		assert_eq!(session.session_key(), Some(first.as_str()));
	}
}
