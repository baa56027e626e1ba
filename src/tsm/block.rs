//! Block trailer handling and timestamp decoding.
//!
//! A stored block is its payload followed by a one byte compression tag and
//! the CRC32 of the stored payload:
//!
//! ```text
//! [payload...][compression_type: 1 byte][checksum: 4 bytes]
//! ```
//!
//! Once decompressed the payload starts with the block's timestamps:
//!
//! ```text
//! [count: u32]
//! [timestamp 1: i64]
//! ...
//! [timestamp N: i64]
//! [values...]            // opaque
//! ```

use crate::accumulator::TimestampArray;
use crate::error::{Error, Result};
use crate::tsm::{CompressionType, BLOCK_TRAILER_SIZE};
use bytes::{Buf, Bytes};

/// Strip the trailer of a stored block, verify its checksum and return the
/// decompressed payload.
pub fn unwrap_block(raw: &[u8], verify_checksum: bool) -> Result<Bytes> {
    if raw.len() < BLOCK_TRAILER_SIZE {
        return Err(Error::corruption("Block size too small"));
    }

    let data_size = raw.len() - BLOCK_TRAILER_SIZE;
    let data = &raw[..data_size];
    let compression_type = raw[data_size];
    let stored_checksum = (&raw[data_size + 1..]).get_u32_le();

    if verify_checksum {
        let computed_checksum = crc32fast::hash(data);
        if computed_checksum != stored_checksum {
            return Err(Error::ChecksumMismatch {
                expected: stored_checksum,
                actual: computed_checksum,
            });
        }
    }

    let compression = CompressionType::from_u8(compression_type)
        .ok_or_else(|| Error::corruption(format!("Invalid compression type {}", compression_type)))?;

    let decompressed = match compression {
        CompressionType::None => Bytes::copy_from_slice(data),
        #[cfg(feature = "snappy")]
        CompressionType::Snappy => snap::raw::Decoder::new()
            .decompress_vec(data)
            .map(Bytes::from)
            .map_err(|e| Error::corruption(format!("Decompression failed: {}", e)))?,
    };

    Ok(decompressed)
}

/// Decode the timestamps at the front of a block payload into `dst`.
///
/// `dst` is cleared first, so on return it holds only this block's
/// timestamps. On error its contents are unspecified.
pub fn decode_timestamps(payload: &[u8], dst: &mut TimestampArray) -> Result<()> {
    dst.clear();

    let mut buf = payload;
    if buf.remaining() < 4 {
        return Err(Error::corruption("Block payload missing timestamp count"));
    }
    let count = buf.get_u32_le() as usize;

    let needed = count
        .checked_mul(8)
        .ok_or_else(|| Error::corruption("Block timestamp count overflows"))?;
    if buf.remaining() < needed {
        return Err(Error::corruption(format!(
            "Block holds {} timestamps but only {} bytes follow",
            count,
            buf.remaining()
        )));
    }

    let mut last = i64::MIN;
    for i in 0..count {
        let ts = buf.get_i64_le();
        if i > 0 && ts < last {
            return Err(Error::corruption(format!(
                "Block timestamps out of order at position {}",
                i
            )));
        }
        dst.push(ts);
        last = ts;
    }

    Ok(())
}
