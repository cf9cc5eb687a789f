//! MessagePack serialization support for session payloads (requires "messagepack" feature)
//!
//! MessagePack produces a compact binary encoding, useful when session
//! payloads are large and the store is shared across MessagePack-aware
//! runtimes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reinhardt_redisession::serialization::{MessagePackSerializer, Serializer};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct UserSession {
//!     user_id: u64,
//!     authenticated: bool,
//! }
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let serializer = MessagePackSerializer;
//! let session = UserSession { user_id: 42, authenticated: true };
//!
//! let bytes = serializer.serialize(&session)?;
//! let restored: UserSession = serializer.deserialize(&bytes)?;
//!
//! assert_eq!(session, restored);
//! # Ok(())
//! # }
//! ```

use super::{SerializationError, Serializer};
use serde::{Deserialize, Serialize};

/// MessagePack serializer (requires "messagepack" feature)
///
/// Uses named struct field encoding so that payloads survive field reordering,
/// at a small size cost over the positional encoding.
#[derive(Debug, Clone, Copy)]
pub struct MessagePackSerializer;

impl Serializer for MessagePackSerializer {
	fn serialize<T: Serialize>(&self, data: &T) -> Result<Vec<u8>, SerializationError> {
		Ok(rmp_serde::to_vec_named(data)?)
	}

	fn deserialize<T: for<'de> Deserialize<'de>>(
		&self,
		bytes: &[u8],
	) -> Result<T, SerializationError> {
		Ok(rmp_serde::from_slice(bytes)?)
	}
}
