//! Gzip compression support
//!
//! Gzip (DEFLATE) offers wide compatibility and a good compression ratio for
//! the JSON-shaped payloads sessions typically carry. It is the default
//! algorithm configured by [`RedisSessionConfig`](crate::config::RedisSessionConfig).
//!
//! ## Example
//!
//! ```rust
//! use reinhardt_redisession::compression::{Compressor, GzipCompressor};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let compressor = GzipCompressor::new();
//!
//! let data = b"Session payloads with repeated structure compress well.";
//! let compressed = compressor.compress(data)?;
//! let decompressed = compressor.decompress(&compressed)?;
//!
//! assert_eq!(data, decompressed.as_slice());
//! # Ok(())
//! # }
//! ```

use super::{CompressionError, Compressor};
use flate2::Compression;
use flate2::read::{GzDecoder, GzEncoder};
use std::io::Read;

/// Gzip compressor
///
/// # Compression Levels
///
/// - Level 0: No compression
/// - Level 1-3: Fast compression, lower compression ratio
/// - Level 4-6: Balanced (recommended: 6)
/// - Level 7-9: Better compression, slower
///
/// # Example
///
/// ```rust
/// use reinhardt_redisession::compression::{Compressor, GzipCompressor};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Default level (6)
/// let compressor = GzipCompressor::new();
///
/// // Custom level
/// let fast_compression = GzipCompressor::with_level(3);
///
/// let data = b"Test data";
/// let compressed = compressor.compress(data)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GzipCompressor {
	level: u32,
}

impl GzipCompressor {
	/// Create a new Gzip compressor with default level (6)
	pub fn new() -> Self {
		Self { level: 6 }
	}

	/// Create a new Gzip compressor with custom level (0-9)
	pub fn with_level(level: u32) -> Self {
		Self { level }
	}

	/// Get the compression level
	pub fn level(&self) -> u32 {
		self.level
	}
}

impl Default for GzipCompressor {
	fn default() -> Self {
		Self::new()
	}
}

impl Compressor for GzipCompressor {
	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		let mut encoder = GzEncoder::new(data, Compression::new(self.level));
		let mut compressed = Vec::new();
		encoder
			.read_to_end(&mut compressed)
			.map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;
		Ok(compressed)
	}

	fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, CompressionError> {
		let mut decoder = GzDecoder::new(compressed);
		let mut decompressed = Vec::new();
		decoder
			.read_to_end(&mut decompressed)
			.map_err(|e| CompressionError::DecompressionFailed(e.to_string()))?;
		Ok(decompressed)
	}

	fn name(&self) -> &'static str {
		"gzip"
	}
}
