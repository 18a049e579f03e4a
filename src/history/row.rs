//! History row payload.
//!
//! ```text
//!  marker  point      height  value or checksum
//!   /       /          /       /
//! |.|...............|....|........|
//!  1B      36B        4B LE   8B LE
//! ```

use bitcoin::OutPoint;
use byteorder::{ByteOrder, LittleEndian};
use error::{ErrorKind, Result};
use point::{self, POINT_SIZE};

pub const ROW_SIZE: usize = 1 + POINT_SIZE + 4 + 8;

const HEIGHT_POSITION: usize = 1 + POINT_SIZE;
const VALUE_POSITION: usize = HEIGHT_POSITION + 4;

/// Whether a row records a received output or a spend.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum PointKind {
	Output = 0,
	Spend = 1,
}

impl PointKind {
	pub fn as_u8(&self) -> u8 {
		*self as u8
	}

	pub fn from_u8(byte: u8) -> Option<PointKind> {
		match byte {
			0 => Some(PointKind::Output),
			1 => Some(PointKind::Spend),
			_ => None,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HistoryRow {
	pub kind: PointKind,
	/// The output for `Output` rows, the spending input for `Spend` rows.
	pub point: OutPoint,
	pub height: u32,
	/// Output value, or checksum of the spent output.
	pub value: u64,
}

fn encode(kind: PointKind, outpoint: &OutPoint, height: u32, value: u64) -> [u8; ROW_SIZE] {
	let mut row = [0u8; ROW_SIZE];
	row[0] = kind.as_u8();
	row[1..HEIGHT_POSITION].copy_from_slice(&point::encode(outpoint));
	LittleEndian::write_u32(&mut row[HEIGHT_POSITION..VALUE_POSITION], height);
	LittleEndian::write_u64(&mut row[VALUE_POSITION..], value);
	row
}

pub fn encode_output(outpoint: &OutPoint, height: u32, value: u64) -> [u8; ROW_SIZE] {
	encode(PointKind::Output, outpoint, height, value)
}

pub fn encode_spend(previous: &OutPoint, spend: &OutPoint, height: u32) -> [u8; ROW_SIZE] {
	encode(PointKind::Spend, spend, height, point::checksum(previous))
}

/// Reads only the height, for filtering before a full decode.
pub fn read_height(row: &[u8]) -> u32 {
	LittleEndian::read_u32(&row[HEIGHT_POSITION..VALUE_POSITION])
}

pub fn decode(row: &[u8]) -> Result<HistoryRow> {
	if row.len() < ROW_SIZE {
		return Err(ErrorKind::Corrupted(format!("history row needs {} bytes, got {}", ROW_SIZE, row.len())).into());
	}

	let kind = PointKind::from_u8(row[0]).ok_or(ErrorKind::InvalidMarker(row[0]))?;

	let result = HistoryRow {
		kind,
		point: point::decode(&row[1..HEIGHT_POSITION])?,
		height: read_height(row),
		value: LittleEndian::read_u64(&row[VALUE_POSITION..ROW_SIZE]),
	};

	Ok(result)
}

#[cfg(test)]
mod tests {
	use bitcoin::{OutPoint, Txid};
	use bitcoin::hashes::Hash;
	use error::ErrorKind;
	use point;
	use super::{decode, encode_output, encode_spend, read_height, PointKind, ROW_SIZE};

	fn point(fill: u8, vout: u32) -> OutPoint {
		OutPoint::new(Txid::from_byte_array([fill; 32]), vout)
	}

	#[test]
	fn test_row_size() {
		assert_eq!(ROW_SIZE, 49);
	}

	#[test]
	fn test_output_row_layout() {
		let row = encode_output(&point(2, 1), 10, 5000);
		assert_eq!(row[0], 0);
		assert_eq!(&row[1..33], &[2u8; 32][..]);
		assert_eq!(&row[33..37], &[1, 0, 0, 0]);
		assert_eq!(&row[37..41], &[10, 0, 0, 0]);
		assert_eq!(&row[41..49], &[0x88, 0x13, 0, 0, 0, 0, 0, 0]);
		assert_eq!(read_height(&row), 10);

		let decoded = decode(&row).unwrap();
		assert_eq!(decoded.kind, PointKind::Output);
		assert_eq!(decoded.point, point(2, 1));
		assert_eq!(decoded.value, 5000);
	}

	#[test]
	fn test_spend_row_carries_checksum() {
		let previous = point(2, 1);
		let row = encode_spend(&previous, &point(3, 0), 20);
		assert_eq!(row[0], 1);

		let decoded = decode(&row).unwrap();
		assert_eq!(decoded.kind, PointKind::Spend);
		assert_eq!(decoded.point, point(3, 0));
		assert_eq!(decoded.height, 20);
		assert_eq!(decoded.value, point::checksum(&previous));
	}

	#[test]
	fn test_decode_short_row() {
		let row = encode_output(&point(2, 1), 10, 5000);
		for len in &[0, 1, 37, ROW_SIZE - 1] {
			match *decode(&row[..*len]).unwrap_err().kind() {
				ErrorKind::Corrupted(_) => {},
				ref other => panic!("unexpected error: {:?}", other),
			}
		}
	}

	#[test]
	fn test_invalid_marker() {
		let mut row = encode_output(&point(2, 1), 10, 5000);
		row[0] = 7;
		match *decode(&row).unwrap_err().kind() {
			ErrorKind::InvalidMarker(7) => {},
			ref other => panic!("unexpected error: {:?}", other),
		}
	}
}
