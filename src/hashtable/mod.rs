//! Bucket/chain hash table over an allocator.
//!
//! Every element starts with a link to the element stored before it in the
//! same bucket, so each bucket is the head of a newest-first chain.
//!
//! ```text
//!  next     key      value
//!   /        /        /
//! |........|........|...........|
//! ```
//!
//! Storing an existing key prepends a new element; the old one stays in
//! the file and becomes visible again if the new one is unlinked.

mod header;

pub use self::header::HashTableHeader;

use std::marker;
use byteorder::{ByteOrder, LittleEndian};
use error::Result;
use manager::{Allocator, RecordManager, SlabManager, EMPTY};

const NEXT_SIZE: usize = 8;

/// Fixed-width table key.
pub trait Key: AsRef<[u8]> {
	const SIZE: usize;
}

impl Key for [u8; 32] {
	const SIZE: usize = 32;
}

impl Key for [u8; 20] {
	const SIZE: usize = 20;
}

/// Table with variable-size values.
pub type SlabHashTable<K> = HashTable<K, SlabManager>;

/// Table with fixed-size values.
pub type RecordHashTable<K> = HashTable<K, RecordManager>;

pub struct HashTable<K, A> {
	header: HashTableHeader,
	manager: A,
	key: marker::PhantomData<K>,
}

impl<K: Key, A: Allocator> HashTable<K, A> {
	pub fn new(header: HashTableHeader, manager: A) -> Self {
		HashTable {
			header,
			manager,
			key: marker::PhantomData,
		}
	}

	/// Number of bytes taken by an element with value of given size.
	pub fn element_size(value_size: usize) -> usize {
		NEXT_SIZE + K::SIZE + value_size
	}

	pub fn header(&self) -> &HashTableHeader {
		&self.header
	}

	pub fn manager(&self) -> &A {
		&self.manager
	}

	/// Prepends new element to the key's bucket and returns the offset of its value.
	pub fn store(&self, key: &K, value: &[u8]) -> Result<u64> {
		let size = Self::element_size(value.len());
		// allocation may remap the file, so no handle can be held across it
		let offset = self.manager.allocate(size)?;
		let bucket = self.header.bucket(key.as_ref());
		let head = self.header.read(bucket);

		{
			let position = self.manager.position(offset);
			let mut data = self.manager.file().access_mut();
			let element = &mut data[position..position + size];
			LittleEndian::write_u64(&mut element[..NEXT_SIZE], head);
			element[NEXT_SIZE..NEXT_SIZE + K::SIZE].copy_from_slice(key.as_ref());
			element[NEXT_SIZE + K::SIZE..].copy_from_slice(value);
		}

		self.header.write(bucket, offset);
		Ok(Self::value_offset(offset))
	}

	/// Returns the value offset of the newest element stored under the key.
	pub fn find(&self, key: &K) -> Option<u64> {
		self.find_element(key).map(|(_, offset)| Self::value_offset(offset))
	}

	/// Calls `f` with the bytes from value offset up to the end of the file.
	///
	/// `f` runs under a read handle and must not call back into the table.
	pub fn read<F, U>(&self, value_offset: u64, f: F) -> U where F: FnOnce(&[u8]) -> U {
		let position = self.manager.position(value_offset);
		let data = self.manager.file().access();
		f(&data[position..])
	}

	/// Overwrites the beginning of the newest value stored under the key.
	pub fn update(&self, key: &K, value: &[u8]) -> bool {
		match self.find(key) {
			Some(offset) => {
				let position = self.manager.position(offset);
				self.manager.file().access_mut()[position..position + value.len()].copy_from_slice(value);
				true
			},
			None => false,
		}
	}

	/// Removes the newest element stored under the key from its chain.
	///
	/// The element's space is not reclaimed.
	pub fn unlink(&self, key: &K) -> bool {
		let (previous, current) = match self.find_element(key) {
			Some(found) => found,
			None => return false,
		};

		let next = self.read_next(current);
		if previous == EMPTY {
			let bucket = self.header.bucket(key.as_ref());
			self.header.write(bucket, next);
		} else {
			let position = self.manager.position(previous);
			LittleEndian::write_u64(&mut self.manager.file().access_mut()[position..position + NEXT_SIZE], next);
		}

		true
	}

	/// Walks the bucket chain and returns offsets of the matching element and its predecessor.
	fn find_element(&self, key: &K) -> Option<(u64, u64)> {
		let bucket = self.header.bucket(key.as_ref());
		let mut previous = EMPTY;
		let mut current = self.header.read(bucket);

		let data = self.manager.file().access();
		while current != EMPTY {
			let position = self.manager.position(current);
			let element = &data[position..position + NEXT_SIZE + K::SIZE];
			if &element[NEXT_SIZE..] == key.as_ref() {
				return Some((previous, current));
			}

			previous = current;
			current = LittleEndian::read_u64(&element[..NEXT_SIZE]);
		}

		None
	}

	fn read_next(&self, offset: u64) -> u64 {
		let position = self.manager.position(offset);
		LittleEndian::read_u64(&self.manager.file().access()[position..position + NEXT_SIZE])
	}

	#[inline]
	fn value_offset(offset: u64) -> u64 {
		offset + (NEXT_SIZE + K::SIZE) as u64
	}
}
