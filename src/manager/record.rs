use std::sync::Arc;
use byteorder::{ByteOrder, LittleEndian};
use parking_lot::Mutex;
use error::{ErrorKind, Result};
use manager::Allocator;
use memory::MemoryMap;

/// Fixed-size record allocator.
///
/// ```text
///  count     record 0    record 1
///   /         /           /
/// |........|...........|...........|
/// ```
pub struct RecordManager {
	file: Arc<MemoryMap>,
	base: u64,
	record_size: usize,
	count: Mutex<u64>,
}

impl RecordManager {
	pub const COUNT_SIZE: u64 = 8;

	pub fn new(file: Arc<MemoryMap>, base: u64, record_size: usize) -> Self {
		RecordManager {
			file,
			base,
			record_size,
			count: Mutex::new(0),
		}
	}

	pub fn record_size(&self) -> usize {
		self.record_size
	}

	/// Logical offset of the record with given index.
	pub fn offset(&self, index: u64) -> u64 {
		Self::COUNT_SIZE + index * self.record_size as u64
	}

	fn end(&self, count: u64) -> u64 {
		self.base + self.offset(count)
	}

	fn write_count(&self, count: u64) {
		let position = self.base as usize;
		LittleEndian::write_u64(&mut self.file.access_mut()[position..position + 8], count);
	}
}

impl Allocator for RecordManager {
	fn file(&self) -> &MemoryMap {
		&self.file
	}

	fn create(&self) -> Result<()> {
		let mut count = self.count.lock();
		self.file.reserve(self.end(0))?;
		self.write_count(0);
		*count = 0;
		Ok(())
	}

	fn start(&self) -> Result<()> {
		let mut count = self.count.lock();
		let position = self.base as usize;
		let stored = {
			let data = self.file.access();
			if data.len() < position + 8 {
				return Err(ErrorKind::Corrupted(format!("{} has no record header", self.file.path().display())).into());
			}
			LittleEndian::read_u64(&data[position..position + 8])
		};

		let capacity = self.file.size().saturating_sub(self.base + Self::COUNT_SIZE) / self.record_size as u64;
		if stored > capacity {
			warn!("{}: {} records exceed the file size", self.file.path().display(), stored);
			return Err(ErrorKind::Corrupted(format!("record count {} out of range", stored)).into());
		}

		*count = stored;
		Ok(())
	}

	fn sync(&self) -> Result<()> {
		let count = self.count.lock();
		self.write_count(*count);
		self.file.sync()
	}

	fn count(&self) -> u64 {
		*self.count.lock()
	}

	fn allocate(&self, size: usize) -> Result<u64> {
		if size != self.record_size {
			return Err(ErrorKind::InvalidAllocation(size, self.record_size).into());
		}

		let mut count = self.count.lock();
		self.file.reserve(self.end(*count + 1))?;
		let offset = self.offset(*count);
		*count += 1;
		trace!("allocated record {} at {}", *count - 1, offset);
		Ok(offset)
	}

	fn position(&self, offset: u64) -> usize {
		(self.base + offset) as usize
	}
}
