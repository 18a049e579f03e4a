use std::sync::Arc;
use byteorder::{ByteOrder, LittleEndian};
use parking_lot::Mutex;
use error::{ErrorKind, Result};
use manager::Allocator;
use memory::MemoryMap;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cursor {
	end: u64,
	count: u64,
}

/// Variable-size slab allocator.
///
/// ```text
///  end      count    slab     slab
///   /        /        /        /
/// |........|........|.....|.........|
/// ```
pub struct SlabManager {
	file: Arc<MemoryMap>,
	base: u64,
	cursor: Mutex<Cursor>,
}

impl SlabManager {
	pub const HEADER_SIZE: u64 = 16;

	pub fn new(file: Arc<MemoryMap>, base: u64) -> Self {
		SlabManager {
			file,
			base,
			cursor: Mutex::new(Cursor {
				end: Self::HEADER_SIZE,
				count: 0,
			}),
		}
	}

	/// Number of bytes used by the allocator, including its header.
	pub fn payload_size(&self) -> u64 {
		self.cursor.lock().end
	}

	fn write_cursor(&self, cursor: &Cursor) {
		let position = self.base as usize;
		let mut data = self.file.access_mut();
		LittleEndian::write_u64(&mut data[position..position + 8], cursor.end);
		LittleEndian::write_u64(&mut data[position + 8..position + 16], cursor.count);
	}
}

impl Allocator for SlabManager {
	fn file(&self) -> &MemoryMap {
		&self.file
	}

	fn create(&self) -> Result<()> {
		let mut cursor = self.cursor.lock();
		self.file.reserve(self.base + Self::HEADER_SIZE)?;
		*cursor = Cursor {
			end: Self::HEADER_SIZE,
			count: 0,
		};
		self.write_cursor(&cursor);
		Ok(())
	}

	fn start(&self) -> Result<()> {
		let mut cursor = self.cursor.lock();
		let position = self.base as usize;
		let stored = {
			let data = self.file.access();
			if data.len() < position + Self::HEADER_SIZE as usize {
				return Err(ErrorKind::Corrupted(format!("{} has no slab header", self.file.path().display())).into());
			}
			Cursor {
				end: LittleEndian::read_u64(&data[position..position + 8]),
				count: LittleEndian::read_u64(&data[position + 8..position + 16]),
			}
		};

		if stored.end < Self::HEADER_SIZE || stored.end > self.file.size().saturating_sub(self.base) {
			warn!("{}: slab end {} out of range", self.file.path().display(), stored.end);
			return Err(ErrorKind::Corrupted(format!("slab end {} out of range", stored.end)).into());
		}

		*cursor = stored;
		Ok(())
	}

	fn sync(&self) -> Result<()> {
		let cursor = self.cursor.lock();
		self.write_cursor(&cursor);
		self.file.sync()
	}

	fn count(&self) -> u64 {
		self.cursor.lock().count
	}

	fn allocate(&self, size: usize) -> Result<u64> {
		let mut cursor = self.cursor.lock();
		let offset = cursor.end;
		self.file.reserve(self.base + offset + size as u64)?;
		cursor.end += size as u64;
		cursor.count += 1;
		trace!("allocated {} byte slab at {}", size, offset);
		Ok(offset)
	}

	fn position(&self, offset: u64) -> usize {
		(self.base + offset) as usize
	}
}
