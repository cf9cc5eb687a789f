//! Compression algorithms for session payloads
//!
//! Large session payloads can be compressed before they are written to the
//! store. Whether a given record is compressed is tracked per record by the
//! envelope flag byte, so the threshold can change without invalidating
//! existing sessions. Gzip is always available; Brotli can be enabled with
//! the `compression-brotli` feature.
//!
//! ## Example
//!
//! ```rust
//! use reinhardt_redisession::compression::{Compressor, GzipCompressor};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let compressor = GzipCompressor::new();
//!
//! let data = b"Hello, World! This is test data for compression.";
//! let compressed = compressor.compress(data)?;
//! let decompressed = compressor.decompress(&compressed)?;
//!
//! assert_eq!(data, decompressed.as_slice());
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

// Submodules
mod gzip;
pub use gzip::GzipCompressor;

#[cfg(feature = "compression-brotli")]
mod brotli;
#[cfg(feature = "compression-brotli")]
pub use self::brotli::BrotliCompressor;

/// Compression errors
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CompressionError {
	/// Compression failed
	#[error("Compression failed: {0}")]
	CompressionFailed(String),

	/// Decompression failed
	#[error("Decompression failed: {0}")]
	DecompressionFailed(String),
}

/// Compressor trait for session payload compression
///
/// Implementations must be usable through `Arc<dyn Compressor>` because the
/// session configuration carries the compressor as a runtime capability.
/// Decompression must accept any output previously produced by `compress` on
/// the same implementation.
pub trait Compressor: Send + Sync {
	/// Compress data
	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;

	/// Decompress data
	fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, CompressionError>;

	/// Get the algorithm name
	fn name(&self) -> &'static str;
}
