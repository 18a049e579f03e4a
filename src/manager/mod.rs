//! Allocators handing out space from a memory map.
//!
//! Both managers keep a small cursor at the front of their region and
//! return offsets relative to the region start. The cursor header means
//! no allocation ever lands on offset 0, which is reserved for "empty".
//!
//! ```text
//!  base   cursor   allocations
//!   /      /        /
//! |...|........|.........|
//! ```

mod record;
mod slab;

pub use self::record::RecordManager;
pub use self::slab::SlabManager;

use error::Result;
use memory::MemoryMap;

/// Logical offset which never points at an allocation.
pub const EMPTY: u64 = 0;

pub trait Allocator {
	/// The memory map allocations come from.
	fn file(&self) -> &MemoryMap;

	/// Formats a fresh cursor.
	fn create(&self) -> Result<()>;

	/// Loads the cursor persisted by the last `sync`.
	fn start(&self) -> Result<()>;

	/// Persists the cursor and flushes the file.
	fn sync(&self) -> Result<()>;

	/// Number of allocated units.
	fn count(&self) -> u64;

	/// Allocates `size` bytes and returns their logical offset.
	fn allocate(&self, size: usize) -> Result<u64>;

	/// Position of a logical offset in the file.
	fn position(&self, offset: u64) -> usize;
}
