//! JSON serialization support for session payloads
//!
//! JSON is the default payload format: human-readable, debuggable with
//! `redis-cli`, and interoperable with stores written by other runtimes.

use super::{SerializationError, Serializer};
use serde::{Deserialize, Serialize};

/// JSON serializer
///
/// # Example
///
/// ```rust
/// use reinhardt_redisession::serialization::{JsonSerializer, Serializer};
/// use serde_json::json;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = JsonSerializer;
/// let data = json!({"cart": ["a", "b"], "total": 3});
///
/// let bytes = serializer.serialize(&data)?;
/// let restored: serde_json::Value = serializer.deserialize(&bytes)?;
///
/// assert_eq!(data, restored);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
	fn serialize<T: Serialize>(&self, data: &T) -> Result<Vec<u8>, SerializationError> {
		Ok(serde_json::to_vec(data)?)
	}

	fn deserialize<T: for<'de> Deserialize<'de>>(
		&self,
		bytes: &[u8],
	) -> Result<T, SerializationError> {
		Ok(serde_json::from_slice(bytes)?)
	}
}
