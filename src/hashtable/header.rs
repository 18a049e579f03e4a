use std::cmp;
use std::sync::Arc;
use byteorder::{ByteOrder, LittleEndian};
use error::{ErrorKind, Result};
use memory::MemoryMap;

/// Bucket array at the front of a hash table file.
///
/// ```text
///  count    bucket 0  bucket 1       bucket N-1
///   /        /         /              /
/// |........|........|........|...|........|
/// ```
///
/// Each bucket holds the offset of the newest element of its chain,
/// or `EMPTY`.
pub struct HashTableHeader {
	file: Arc<MemoryMap>,
	buckets: u64,
}

impl HashTableHeader {
	pub const COUNT_SIZE: u64 = 8;
	pub const BUCKET_SIZE: u64 = 8;

	/// Size of the header in bytes.
	pub fn file_size(buckets: u64) -> u64 {
		Self::COUNT_SIZE + buckets * Self::BUCKET_SIZE
	}

	pub fn new(file: Arc<MemoryMap>, buckets: u64) -> Self {
		HashTableHeader {
			file,
			buckets,
		}
	}

	/// Writes the bucket count and empties every bucket.
	pub fn create(&self) -> Result<()> {
		let end = Self::file_size(self.buckets);
		self.file.resize(end)?;

		let mut data = self.file.access_mut();
		LittleEndian::write_u64(&mut data[..Self::COUNT_SIZE as usize], self.buckets);
		for byte in &mut data[Self::COUNT_SIZE as usize..end as usize] {
			*byte = 0;
		}

		Ok(())
	}

	/// Checks the stored bucket count against the expected one.
	pub fn start(&self) -> Result<()> {
		let data = self.file.access();
		if (data.len() as u64) < Self::file_size(self.buckets) {
			return Err(ErrorKind::Corrupted(format!("{} is smaller than its header", self.file.path().display())).into());
		}

		let stored = LittleEndian::read_u64(&data[..Self::COUNT_SIZE as usize]);
		if stored != self.buckets {
			warn!("{}: expected {} buckets, found {}", self.file.path().display(), self.buckets, stored);
			return Err(ErrorKind::Corrupted(format!("expected {} buckets, found {}", self.buckets, stored)).into());
		}

		Ok(())
	}

	/// Number of buckets.
	pub fn size(&self) -> u64 {
		self.buckets
	}

	/// Bucket of the key. Keys are digests, so their first bytes are already uniform.
	pub fn bucket(&self, key: &[u8]) -> u64 {
		let mut prefix = [0u8; 8];
		let len = cmp::min(prefix.len(), key.len());
		prefix[..len].copy_from_slice(&key[..len]);
		LittleEndian::read_u64(&prefix) % self.buckets
	}

	pub fn read(&self, bucket: u64) -> u64 {
		let position = Self::position(bucket);
		LittleEndian::read_u64(&self.file.access()[position..position + Self::BUCKET_SIZE as usize])
	}

	pub fn write(&self, bucket: u64, value: u64) {
		let position = Self::position(bucket);
		LittleEndian::write_u64(&mut self.file.access_mut()[position..position + Self::BUCKET_SIZE as usize], value);
	}

	fn position(bucket: u64) -> usize {
		(Self::COUNT_SIZE + bucket * Self::BUCKET_SIZE) as usize
	}
}
