//! Brotli compression support (requires "compression-brotli" feature)
//!
//! Brotli usually beats Gzip on ratio for text-like payloads at comparable
//! quality settings, at the cost of slower compression at high qualities.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reinhardt_redisession::compression::{BrotliCompressor, Compressor};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let compressor = BrotliCompressor::new();
//!
//! let data = b"Test data for Brotli compression.";
//! let compressed = compressor.compress(data)?;
//! let decompressed = compressor.decompress(&compressed)?;
//!
//! assert_eq!(data, decompressed.as_slice());
//! # Ok(())
//! # }
//! ```

use super::{CompressionError, Compressor};
use std::io::Read;

const BUFFER_SIZE: usize = 4096;
const LG_WINDOW_SIZE: u32 = 22;

/// Brotli compressor (requires "compression-brotli" feature)
///
/// # Quality Levels
///
/// - Quality 0-4: Fast compression
/// - Quality 5-9: Balanced (recommended: 5)
/// - Quality 10-11: Best ratio, slow
#[derive(Debug, Clone)]
pub struct BrotliCompressor {
	quality: u32,
}

impl BrotliCompressor {
	/// Create a new Brotli compressor with default quality (5)
	pub fn new() -> Self {
		Self { quality: 5 }
	}

	/// Create a new Brotli compressor with custom quality (0-11)
	pub fn with_quality(quality: u32) -> Self {
		Self { quality }
	}

	/// Get the compression quality
	pub fn quality(&self) -> u32 {
		self.quality
	}
}

impl Default for BrotliCompressor {
	fn default() -> Self {
		Self::new()
	}
}

impl Compressor for BrotliCompressor {
	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		let mut encoder =
			brotli::CompressorReader::new(data, BUFFER_SIZE, self.quality, LG_WINDOW_SIZE);
		let mut compressed = Vec::new();
		encoder
			.read_to_end(&mut compressed)
			.map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;
		Ok(compressed)
	}

	fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, CompressionError> {
		let mut decoder = brotli::Decompressor::new(compressed, BUFFER_SIZE);
		let mut decompressed = Vec::new();
		decoder
			.read_to_end(&mut decompressed)
			.map_err(|e| CompressionError::DecompressionFailed(e.to_string()))?;
		Ok(decompressed)
	}

	fn name(&self) -> &'static str {
		"brotli"
	}
}
