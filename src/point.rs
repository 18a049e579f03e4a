//! Fixed 36-byte point encoding.
//!
//! ```text
//!  hash         index
//!   /            /
//! |............|....|
//!  32 bytes     4 bytes LE
//! ```

use bitcoin::OutPoint;
use bitcoin::consensus::encode::{deserialize, serialize};
use bitcoin::hashes::Hash;
use byteorder::{ByteOrder, LittleEndian};
use error::{ErrorKind, Result};

pub const POINT_SIZE: usize = 36;

pub fn encode(point: &OutPoint) -> [u8; POINT_SIZE] {
	let mut result = [0u8; POINT_SIZE];
	result.copy_from_slice(&serialize(point));
	result
}

pub fn decode(data: &[u8]) -> Result<OutPoint> {
	if data.len() < POINT_SIZE {
		return Err(ErrorKind::Corrupted(format!("point needs {} bytes, got {}", POINT_SIZE, data.len())).into());
	}

	Ok(deserialize(&data[..POINT_SIZE])?)
}

/// Compact fingerprint of a point.
///
/// The index overwrites the first 4 bytes of the hash and the low 63 bits
/// of the first 8 bytes are kept.
pub fn checksum(point: &OutPoint) -> u64 {
	let mut hash = point.txid.to_byte_array();
	LittleEndian::write_u32(&mut hash[..4], point.vout);
	LittleEndian::read_u64(&hash[..8]) & ((1u64 << 63) - 1)
}
