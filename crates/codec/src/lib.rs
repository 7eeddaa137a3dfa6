//! pubsub-codec: gzip and base64 helpers for message bodies
//!
//! Pure, stateless functions shared by producers and consumers. Oversized
//! or binary payloads are gzip-compressed and carried as base64 text.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

/// Default gzip compression level (maximum, matches producer defaults)
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("compress failed: {0}")]
    Compress(std::io::Error),
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Gzip-compress `data`. Levels above 9 are clamped to 9.
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>, CodecError> {
    let level = Compression::new(level.min(9));
    let mut encoder = GzEncoder::new(Vec::new(), level);
    encoder.write_all(data).map_err(CodecError::Compress)?;
    encoder.finish().map_err(CodecError::Compress)
}

/// Decompress gzip bytes. Non-gzip input fails with a decode error.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok(out)
}

/// Base64-encode bytes (standard alphabet, padded).
pub fn encode_text(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a base64 string to bytes.
pub fn decode_text(s: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD
        .decode(s)
        .map_err(|e| CodecError::Decode(e.to_string()))
}

/// Gzip then base64: the wire form for compressed text payloads.
pub fn compress_and_encode(data: &[u8], level: u32) -> Result<String, CodecError> {
    let compressed = compress(data, level)?;
    Ok(encode_text(&compressed))
}

/// Base64-decode, then gunzip only when `compressed` is set.
/// With `compressed == false` the decoded bytes are returned verbatim and
/// the decompressor is never invoked.
pub fn decode_and_decompress_if(s: &str, compressed: bool) -> Result<Vec<u8>, CodecError> {
    let decoded = decode_text(s)?;
    if compressed {
        decompress(&decoded)
    } else {
        Ok(decoded)
    }
}
