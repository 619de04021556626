//! State file framing: `[length:4][compression:1][payload:N]`.
//!
//! `length` is big-endian and counts the compression byte plus the payload,
//! the same layout region files use for a single chunk.

use std::io::{Read, Write};

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;

pub const COMPRESSION_GZIP: u8 = 1;
pub const COMPRESSION_ZLIB: u8 = 2;
pub const COMPRESSION_NONE: u8 = 3;

/// Compresses `raw` with zlib and frames it.
pub fn wrap(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).context("Failed to compress state")?;
    let compressed = encoder.finish().context("Failed to finish compression")?;

    let mut result = Vec::with_capacity(5 + compressed.len());
    let total_len = (compressed.len() + 1) as u32;
    result.extend_from_slice(&total_len.to_be_bytes());
    result.push(COMPRESSION_ZLIB);
    result.extend_from_slice(&compressed);
    Ok(result)
}

/// Reads one frame back into raw bytes. Gzip and uncompressed payloads are
/// accepted as well.
pub fn unwrap(framed: &[u8]) -> Result<Vec<u8>> {
    if framed.len() < 5 {
        bail!("State frame too short ({} bytes)", framed.len());
    }
    let total_len = u32::from_be_bytes([framed[0], framed[1], framed[2], framed[3]]) as usize;
    if total_len == 0 || framed.len() < 4 + total_len {
        bail!("State frame truncated: header says {} bytes, have {}", total_len, framed.len() - 4);
    }
    let compression = framed[4];
    let payload = &framed[5..4 + total_len];

    let mut raw = Vec::new();
    match compression {
        COMPRESSION_GZIP => {
            GzDecoder::new(payload)
                .read_to_end(&mut raw)
                .context("Failed to inflate gzip state")?;
        }
        COMPRESSION_ZLIB => {
            ZlibDecoder::new(payload)
                .read_to_end(&mut raw)
                .context("Failed to inflate zlib state")?;
        }
        COMPRESSION_NONE => raw.extend_from_slice(payload),
        other => bail!("Unknown compression type {}", other),
    }
    Ok(raw)
}
