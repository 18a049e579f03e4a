//! Growable memory-mapped file.
//!
//! The map is guarded by a read-write lock which doubles as a remap barrier.
//! Handles returned by `access` and `access_mut` borrow the lock, so the
//! region can't be remapped while any of them is alive.
//!
//! ```text
//!  access()    access()         resize()
//!   /           /                /
//! |rrrrrrrrr|..rrrrrr..|  wait  |remap|  ...
//! ```
//!
//! Code which allocates must release its handles first, otherwise growth
//! blocks forever on its own reader.

use std::cmp;
use std::fs::{File, OpenOptions};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use fs2::FileExt;
use memmap::MmapMut;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use error::{ErrorKind, Result};

/// Shared handle onto the mapped region.
pub struct Accessor<'a> {
	guard: RwLockReadGuard<'a, MmapMut>,
}

impl<'a> Deref for Accessor<'a> {
	type Target = [u8];

	fn deref(&self) -> &[u8] {
		&**self.guard
	}
}

/// Exclusive handle onto the mapped region.
pub struct AccessorMut<'a> {
	guard: RwLockWriteGuard<'a, MmapMut>,
}

impl<'a> Deref for AccessorMut<'a> {
	type Target = [u8];

	fn deref(&self) -> &[u8] {
		&**self.guard
	}
}

impl<'a> DerefMut for AccessorMut<'a> {
	fn deref_mut(&mut self) -> &mut [u8] {
		&mut **self.guard
	}
}

pub struct MemoryMap {
	path: PathBuf,
	file: File,
	map: RwLock<MmapMut>,
	expansion_percent: u16,
	generation: AtomicUsize,
}

impl MemoryMap {
	/// Zero-length files can't be mapped.
	pub const MINIMUM_SIZE: u64 = 4096;

	/// Opens (or creates) the file and maps it into memory.
	///
	/// The file is locked exclusively until the map is dropped.
	pub fn open<P: AsRef<Path>>(path: P, expansion_percent: u16) -> Result<Self> {
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.open(path.as_ref())?;

		file.try_lock_exclusive().map_err(|_| ErrorKind::DatabaseLocked(path.as_ref().to_path_buf()))?;

		if file.metadata()?.len() < Self::MINIMUM_SIZE {
			file.set_len(Self::MINIMUM_SIZE)?;
		}

		let map = unsafe { MmapMut::map_mut(&file)? };
		debug!("mapped {} ({} bytes)", path.as_ref().display(), map.len());

		let result = MemoryMap {
			path: path.as_ref().to_path_buf(),
			file,
			map: RwLock::new(map),
			expansion_percent,
			generation: AtomicUsize::new(0),
		};

		Ok(result)
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Number of mapped bytes.
	pub fn size(&self) -> u64 {
		self.map.read().len() as u64
	}

	/// Number of remaps since the file was opened.
	pub fn generation(&self) -> usize {
		self.generation.load(Ordering::Acquire)
	}

	pub fn access(&self) -> Accessor {
		Accessor {
			guard: self.map.read(),
		}
	}

	pub fn access_mut(&self) -> AccessorMut {
		AccessorMut {
			guard: self.map.write(),
		}
	}

	/// Grows the file to exactly `size` bytes. Never shrinks it.
	///
	/// Waits until every outstanding handle is released.
	pub fn resize(&self, size: u64) -> Result<()> {
		let mut map = self.map.write();
		if size <= map.len() as u64 {
			return Ok(());
		}

		self.file.set_len(size)?;
		// the old map stays in place if remapping fails
		*map = unsafe { MmapMut::map_mut(&self.file)? };

		let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
		debug!("remapped {} to {} bytes, generation {}", self.path.display(), size, generation);
		Ok(())
	}

	/// Makes sure at least `size` bytes are mapped, growing geometrically.
	pub fn reserve(&self, size: u64) -> Result<()> {
		if size <= self.size() {
			return Ok(());
		}

		let expanded = size.saturating_mul(self.expansion_percent as u64) / 100;
		self.resize(cmp::max(size, expanded))
	}

	/// Flushes dirty pages to disk.
	pub fn sync(&self) -> Result<()> {
		self.map.read().flush()?;
		Ok(())
	}

	/// Flushes and releases the file.
	pub fn stop(self) -> Result<()> {
		self.sync()?;
		self.file.unlock()?;
		debug!("unmapped {}", self.path.display());
		Ok(())
	}
}
