//! Compressed record payload handling.
//!
//! A compressed record stores `{uncompressed_size: u32, zlib_stream}`. The
//! size prefix is big-endian on the Xbox side and little-endian on PC.

use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

const COMPRESSION_LEVEL: u32 = 6;

/// Inflates a compressed record payload (size prefix included in `payload`).
/// Returns the declared uncompressed size alongside the inflated bytes;
/// callers treat a mismatch between the two as corruption.
pub fn decompress_record_data(payload: &[u8]) -> io::Result<(u32, Vec<u8>)> {
    if payload.len() < 4 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "compressed payload shorter than its size prefix",
        ));
    }
    let declared = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let mut inflated = Vec::with_capacity(declared as usize);
    let mut decoder = ZlibDecoder::new(&payload[4..]);
    decoder.read_to_end(&mut inflated)?;
    Ok((declared, inflated))
}

/// Deflates converted record data and prefixes the little-endian
/// uncompressed size, producing a complete PC compressed payload.
pub fn compress_record_data(plain: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(plain.len() / 2 + 4);
    out.extend_from_slice(&(plain.len() as u32).to_le_bytes());
    let mut encoder = ZlibEncoder::new(out, Compression::new(COMPRESSION_LEVEL));
    encoder.write_all(plain)?;
    encoder.finish()
}

/// Degraded path for a payload that failed to inflate: the zlib stream is
/// kept verbatim and only the size prefix is re-serialized little-endian,
/// so the record survives in the output instead of being dropped.
pub fn passthrough_record_data(payload: &[u8]) -> Vec<u8> {
    if payload.len() < 4 {
        return payload.to_vec();
    }
    let declared = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let mut out = Vec::with_capacity(payload.len());
    out.extend_from_slice(&declared.to_le_bytes());
    out.extend_from_slice(&payload[4..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let plain = b"the quick brown molerat jumps over the lazy gecko".repeat(8);
        let compressed = compress_record_data(&plain).unwrap();
        assert_eq!(
            u32::from_le_bytes([compressed[0], compressed[1], compressed[2], compressed[3]]),
            plain.len() as u32
        );
        // Re-read through the big-endian entry point after flipping the
        // prefix, as a converted payload from a PC file would look.
        let mut as_be = compressed.clone();
        as_be[0..4].copy_from_slice(&(plain.len() as u32).to_be_bytes());
        let (declared, inflated) = decompress_record_data(&as_be).unwrap();
        assert_eq!(declared, plain.len() as u32);
        assert_eq!(inflated, plain);
    }

    #[test]
    fn garbage_fails_to_inflate() {
        let payload = [0x00, 0x00, 0x00, 0x10, 0xDE, 0xAD, 0xBE, 0xEF];
        assert!(decompress_record_data(&payload).is_err());
    }

    #[test]
    fn passthrough_flips_prefix_only() {
        let payload = [0x00, 0x00, 0x00, 0x10, 0xDE, 0xAD, 0xBE, 0xEF];
        let out = passthrough_record_data(&payload);
        assert_eq!(&out[0..4], &0x10u32.to_le_bytes());
        assert_eq!(&out[4..], &payload[4..]);
    }
}
