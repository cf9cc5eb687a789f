//! Serialization formats for session payloads
//!
//! Session payloads are serialized to bytes before they enter the storage
//! envelope. JSON is always available; MessagePack can be enabled with the
//! `messagepack` feature for a more compact binary encoding.
//!
//! ## Example
//!
//! ```rust
//! use reinhardt_redisession::serialization::{JsonSerializer, Serializer};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let serializer = JsonSerializer;
//!
//! let data = json!({
//!     "user_id": 42,
//!     "username": "alice",
//! });
//!
//! let bytes = serializer.serialize(&data)?;
//! let restored: serde_json::Value = serializer.deserialize(&bytes)?;
//! assert_eq!(restored["user_id"], 42);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Submodules
mod json;
pub use json::JsonSerializer;

#[cfg(feature = "messagepack")]
mod messagepack;
#[cfg(feature = "messagepack")]
pub use messagepack::MessagePackSerializer;

/// Serialization errors
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SerializationError {
	/// JSON serialization error
	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),

	/// MessagePack serialization error
	#[cfg(feature = "messagepack")]
	#[error("MessagePack error: {0}")]
	MessagePackError(#[from] rmp_serde::encode::Error),

	/// MessagePack deserialization error
	#[cfg(feature = "messagepack")]
	#[error("MessagePack decode error: {0}")]
	MessagePackDecodeError(#[from] rmp_serde::decode::Error),

	/// Generic serialization failure
	#[error("Serialization failed: {0}")]
	SerializationFailed(String),

	/// Generic deserialization failure
	#[error("Deserialization failed: {0}")]
	DeserializationFailed(String),
}

/// Serializer trait for session payload formats
///
/// # Example
///
/// ```rust
/// use reinhardt_redisession::serialization::{JsonSerializer, Serializer};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct UserData {
///     id: i32,
///     name: String,
/// }
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = JsonSerializer;
/// let user = UserData { id: 1, name: "Alice".to_string() };
///
/// let bytes = serializer.serialize(&user)?;
/// let restored: UserData = serializer.deserialize(&bytes)?;
///
/// assert_eq!(user, restored);
/// # Ok(())
/// # }
/// ```
pub trait Serializer: Send + Sync {
	/// Serialize data to bytes
	fn serialize<T: Serialize>(&self, data: &T) -> Result<Vec<u8>, SerializationError>;

	/// Deserialize bytes to data
	fn deserialize<T: for<'de> Deserialize<'de>>(
		&self,
		bytes: &[u8],
	) -> Result<T, SerializationError>;
}

/// Serialization format enum
///
/// The format is carried by the session configuration and applied inside the
/// storage envelope, so a store can only read records written with the same
/// format.
///
/// # Example
///
/// ```rust
/// use reinhardt_redisession::serialization::SerializationFormat;
///
/// let format = SerializationFormat::Json;
/// assert_eq!(format.name(), "json");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationFormat {
	/// JSON format (always available)
	Json,
	/// MessagePack format (requires "messagepack" feature)
	#[cfg(feature = "messagepack")]
	MessagePack,
}

impl SerializationFormat {
	/// Get format name as string
	pub fn name(&self) -> &'static str {
		match self {
			SerializationFormat::Json => "json",
			#[cfg(feature = "messagepack")]
			SerializationFormat::MessagePack => "messagepack",
		}
	}

	/// Serialize data using this format
	///
	/// # Example
	///
	/// ```rust
	/// use reinhardt_redisession::serialization::SerializationFormat;
	/// use serde_json::json;
	///
	/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
	/// let format = SerializationFormat::Json;
	///
	/// let data = json!({"test": true});
	/// let bytes = format.serialize(&data)?;
	/// let restored: serde_json::Value = format.deserialize(&bytes)?;
	///
	/// assert_eq!(restored["test"], true);
	/// # Ok(())
	/// # }
	/// ```
	pub fn serialize<T: Serialize>(&self, data: &T) -> Result<Vec<u8>, SerializationError> {
		match self {
			SerializationFormat::Json => JsonSerializer.serialize(data),
			#[cfg(feature = "messagepack")]
			SerializationFormat::MessagePack => MessagePackSerializer.serialize(data),
		}
	}

	/// Deserialize data using this format
	pub fn deserialize<T: for<'de> Deserialize<'de>>(
		&self,
		bytes: &[u8],
	) -> Result<T, SerializationError> {
		match self {
			SerializationFormat::Json => JsonSerializer.deserialize(bytes),
			#[cfg(feature = "messagepack")]
			SerializationFormat::MessagePack => MessagePackSerializer.deserialize(bytes),
		}
	}
}

impl Default for SerializationFormat {
	/// Default serialization format is JSON
	fn default() -> Self {
		Self::Json
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_serialization_format_name() {
		assert_eq!(SerializationFormat::Json.name(), "json");

		#[cfg(feature = "messagepack")]
		assert_eq!(SerializationFormat::MessagePack.name(), "messagepack");
	}

	#[test]
	fn test_serialization_format_default() {
		let format = SerializationFormat::default();
		assert_eq!(format, SerializationFormat::Json);
	}

	#[test]
	fn test_serialization_format_serialize_deserialize() {
		let format = SerializationFormat::Json;

		let data = serde_json::json!({"test": "value"});
		let bytes = format.serialize(&data).unwrap();
		let restored: serde_json::Value = format.deserialize(&bytes).unwrap();

		assert_eq!(restored["test"], "value");
	}
}
