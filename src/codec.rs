//! Codec Module
//!
//! Serializes cache values to bytes and back, with optional gzip compression
//! for payloads above a configured size threshold.
//!
//! Decode failures are surfaced as [`CacheError::Decode`] rather than panics:
//! cached bytes are a secondary source of truth, so a corrupt or incompatible
//! entry must be recoverable as a miss by the caller.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Codec ==
/// Encodes and decodes cache values, compressing large payloads.
#[derive(Debug, Clone)]
pub struct Codec {
    /// Compress all qualifying payloads regardless of per-write options
    compression_enabled: bool,
    /// Encoded payloads at or below this size are never compressed
    compression_threshold: usize,
}

impl Codec {
    // == Constructor ==
    /// Creates a new Codec.
    ///
    /// # Arguments
    /// * `compression_enabled` - Compress qualifying payloads unconditionally
    /// * `compression_threshold` - Minimum encoded size in bytes before compressing
    pub fn new(compression_enabled: bool, compression_threshold: usize) -> Self {
        Self {
            compression_enabled,
            compression_threshold,
        }
    }

    /// Creates a Codec from the cache configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.compression_enabled, config.compression_threshold)
    }

    // == Encode ==
    /// Serializes a value to bytes, compressing when the encoded payload
    /// exceeds the threshold and compression is enabled globally or for
    /// this write.
    ///
    /// Returns the payload and whether it was compressed; the flag must be
    /// stored alongside the bytes so [`Codec::decode`] knows to inflate.
    pub fn encode<T: Serialize>(&self, value: &T, compress_hint: bool) -> Result<(Vec<u8>, bool)> {
        let plain = serde_json::to_vec(value).map_err(|e| CacheError::Encode(e.to_string()))?;

        let should_compress =
            (self.compression_enabled || compress_hint) && plain.len() > self.compression_threshold;
        if !should_compress {
            return Ok((plain, false));
        }

        let mut encoder = GzEncoder::new(Vec::with_capacity(plain.len() / 2), Compression::default());
        encoder
            .write_all(&plain)
            .map_err(|e| CacheError::Encode(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| CacheError::Encode(e.to_string()))?;

        Ok((compressed, true))
    }

    // == Decode ==
    /// Deserializes stored bytes back into a value, inflating first when the
    /// entry was written compressed.
    ///
    /// Any failure (gzip corruption, schema drift, type mismatch) is returned
    /// as [`CacheError::Decode`] so the service can treat it as a miss.
    pub fn decode<T: DeserializeOwned>(&self, key: &str, bytes: &[u8], compressed: bool) -> Result<T> {
        let decode_err = |reason: String| CacheError::Decode {
            key: key.to_string(),
            reason,
        };

        let plain = if compressed {
            let mut decoder = GzDecoder::new(bytes);
            let mut inflated = Vec::with_capacity(bytes.len() * 2);
            decoder
                .read_to_end(&mut inflated)
                .map_err(|e| decode_err(e.to_string()))?;
            inflated
        } else {
            bytes.to_vec()
        };

        serde_json::from_slice(&plain).map_err(|e| decode_err(e.to_string()))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        score: u32,
    }

    fn sample() -> Payload {
        Payload {
            name: "Ana".to_string(),
            score: 42,
        }
    }

    #[test]
    fn test_encode_small_payload_stays_plain() {
        let codec = Codec::new(true, 1024);

        let (bytes, compressed) = codec.encode(&sample(), true).unwrap();
        assert!(!compressed);

        let decoded: Payload = codec.decode("k", &bytes, compressed).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_encode_large_payload_compresses() {
        let codec = Codec::new(true, 64);
        let value = "x".repeat(4096);

        let (bytes, compressed) = codec.encode(&value, false).unwrap();
        assert!(compressed);
        assert!(bytes.len() < 4096, "repetitive payload should shrink");

        let decoded: String = codec.decode("k", &bytes, compressed).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_compress_hint_overrides_disabled_config() {
        let codec = Codec::new(false, 64);
        let value = "y".repeat(4096);

        let (_, without_hint) = codec.encode(&value, false).unwrap();
        assert!(!without_hint);

        let (bytes, with_hint) = codec.encode(&value, true).unwrap();
        assert!(with_hint);

        let decoded: String = codec.decode("k", &bytes, true).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_decode_garbage_is_recoverable() {
        let codec = Codec::new(false, 1024);

        let result: Result<Payload> = codec.decode("bad", b"not json at all", false);
        assert!(matches!(result, Err(CacheError::Decode { .. })));
    }

    #[test]
    fn test_decode_corrupt_gzip_is_recoverable() {
        let codec = Codec::new(false, 1024);

        // Valid JSON bytes, but flagged compressed
        let result: Result<String> = codec.decode("bad", b"\"hello\"", true);
        assert!(matches!(result, Err(CacheError::Decode { .. })));
    }

    #[test]
    fn test_decode_type_mismatch_is_recoverable() {
        let codec = Codec::new(false, 1024);
        let (bytes, compressed) = codec.encode(&vec![1u32, 2, 3], false).unwrap();

        let result: Result<Payload> = codec.decode("k", &bytes, compressed);
        assert!(matches!(result, Err(CacheError::Decode { .. })));
    }
}
