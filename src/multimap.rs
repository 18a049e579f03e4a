//! Key to row list multimap.
//!
//! A record hash table maps every key to the newest of its rows. Rows live
//! in a separate record list and link to the row added before them.
//!
//! ```text
//!  index                  rows
//! |key|head| ---------> |next|payload| ---> |next|payload| ---> EMPTY
//! ```
//!
//! Rows can only be removed from the head, as an undo of the last `add_row`.

use byteorder::{ByteOrder, LittleEndian};
use error::{ErrorKind, Result};
use hashtable::{Key, RecordHashTable};
use manager::{Allocator, RecordManager, EMPTY};

const NEXT_SIZE: usize = 8;
const HEAD_SIZE: usize = 8;

pub struct RecordMultimap<K> {
	index: RecordHashTable<K>,
	rows: RecordManager,
}

impl<K: Key> RecordMultimap<K> {
	/// Record size of the key index.
	pub fn index_record_size() -> usize {
		RecordHashTable::<K>::element_size(HEAD_SIZE)
	}

	/// Record size of the row list.
	pub fn row_size(payload_size: usize) -> usize {
		NEXT_SIZE + payload_size
	}

	pub fn new(index: RecordHashTable<K>, rows: RecordManager) -> Self {
		RecordMultimap {
			index,
			rows,
		}
	}

	pub fn index(&self) -> &RecordHashTable<K> {
		&self.index
	}

	pub fn row_manager(&self) -> &RecordManager {
		&self.rows
	}

	pub fn payload_size(&self) -> usize {
		self.rows.record_size() - NEXT_SIZE
	}

	/// Offset of the newest row of the key.
	pub fn lookup(&self, key: &K) -> Option<u64> {
		self.index.find(key).map(|offset| self.index.read(offset, |data| LittleEndian::read_u64(&data[..HEAD_SIZE])))
	}

	/// Appends a row in front of the key's rows.
	pub fn add_row(&self, key: &K, payload: &[u8]) -> Result<u64> {
		let head = self.lookup(key);
		let row = self.rows.allocate(Self::row_size(payload.len()))?;

		{
			let position = self.rows.position(row);
			let mut data = self.rows.file().access_mut();
			LittleEndian::write_u64(&mut data[position..position + NEXT_SIZE], head.unwrap_or(EMPTY));
			data[position + NEXT_SIZE..position + NEXT_SIZE + payload.len()].copy_from_slice(payload);
		}

		let mut link = [0u8; HEAD_SIZE];
		LittleEndian::write_u64(&mut link, row);
		match head {
			Some(_) => {
				self.index.update(key, &link);
			},
			None => {
				self.index.store(key, &link)?;
			},
		}

		trace!("added row {} (previous head {:?})", row, head);
		Ok(row)
	}

	/// Removes the newest row of the key.
	///
	/// Only valid as an exact undo of the last `add_row` for the key.
	pub fn delete_last_row(&self, key: &K) -> Result<()> {
		let head = self.lookup(key).ok_or(ErrorKind::MissingKey)?;
		let next = self.next(head);

		if next == EMPTY {
			self.index.unlink(key);
		} else {
			let mut link = [0u8; HEAD_SIZE];
			LittleEndian::write_u64(&mut link, next);
			self.index.update(key, &link);
		}

		trace!("deleted row {}, new head {}", head, next);
		Ok(())
	}

	/// Iterates over the rows of the key, newest first.
	pub fn rows(&self, key: &K) -> RowIterator<K> {
		self.iter(self.lookup(key).unwrap_or(EMPTY))
	}

	/// Iterates over a row chain starting at given row.
	pub fn iter(&self, head: u64) -> RowIterator<K> {
		RowIterator {
			multimap: self,
			current: head,
		}
	}

	/// Offset of the row added before given one.
	pub fn next(&self, row: u64) -> u64 {
		let position = self.rows.position(row);
		LittleEndian::read_u64(&self.rows.file().access()[position..position + NEXT_SIZE])
	}

	/// Calls `f` with the payload of the row.
	pub fn read_row<F, U>(&self, row: u64, f: F) -> U where F: FnOnce(&[u8]) -> U {
		let position = self.rows.position(row) + NEXT_SIZE;
		let data = self.rows.file().access();
		f(&data[position..position + self.payload_size()])
	}
}

/// Lazy iterator over row offsets.
///
/// Links are read one at a time, so the iterator stays valid when the
/// row file is remapped between steps.
pub struct RowIterator<'a, K: 'a> {
	multimap: &'a RecordMultimap<K>,
	current: u64,
}

impl<'a, K: 'a> Clone for RowIterator<'a, K> {
	fn clone(&self) -> Self {
		RowIterator {
			multimap: self.multimap,
			current: self.current,
		}
	}
}

impl<'a, K: Key + 'a> Iterator for RowIterator<'a, K> {
	type Item = u64;

	fn next(&mut self) -> Option<Self::Item> {
		if self.current == EMPTY {
			return None;
		}

		let row = self.current;
		self.current = self.multimap.next(row);
		Some(row)
	}
}
