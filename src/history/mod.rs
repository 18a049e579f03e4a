//! Address history store.
//!
//! Maps a short address hash to the outputs it received and the inputs
//! which spent them, newest first. Uses two files:
//!
//! - lookup file: bucket header followed by key records `|next|key|head|`
//! - rows file: row records `|next|row|`, see `row` for the row layout

pub mod row;

use std::path::Path;
use std::sync::Arc;
use bitcoin::OutPoint;
use error::{ErrorKind, Result};
use hashtable::{HashTableHeader, RecordHashTable};
use manager::{Allocator, RecordManager};
use memory::MemoryMap;
use multimap::RecordMultimap;
use options::{InternalOptions, Options};
use self::row::{HistoryRow, ROW_SIZE};
use ShortHash;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct HistoryStatinfo {
	/// Number of buckets in the lookup header.
	pub buckets: u64,
	/// Number of address records ever allocated.
	pub addresses: u64,
	/// Number of rows ever allocated.
	pub rows: u64,
}

pub struct HistoryDatabase {
	lookup_file: Arc<MemoryMap>,
	rows_file: Arc<MemoryMap>,
	rows: RecordMultimap<ShortHash>,
}

impl HistoryDatabase {
	/// Opens both files. Call `create` or `start` before use.
	pub fn new<P, Q>(lookup_path: P, rows_path: Q, options: Options) -> Result<Self> where
		P: AsRef<Path>,
		Q: AsRef<Path>,
	{
		let options = InternalOptions::from_external(options)?;
		let buckets = options.history_buckets;

		let lookup_file = Arc::new(MemoryMap::open(lookup_path, options.expansion_percent)?);
		let rows_file = Arc::new(MemoryMap::open(rows_path, options.expansion_percent)?);

		let header = HashTableHeader::new(lookup_file.clone(), buckets);
		let lookup_manager = RecordManager::new(
			lookup_file.clone(),
			HashTableHeader::file_size(buckets),
			RecordMultimap::<ShortHash>::index_record_size(),
		);
		let rows_manager = RecordManager::new(rows_file.clone(), 0, RecordMultimap::<ShortHash>::row_size(ROW_SIZE));

		let result = HistoryDatabase {
			lookup_file,
			rows_file,
			rows: RecordMultimap::new(RecordHashTable::new(header, lookup_manager), rows_manager),
		};

		Ok(result)
	}

	/// Formats both files.
	pub fn create(&self) -> Result<()> {
		self.rows.index().header().create()?;
		self.rows.index().manager().create()?;
		self.rows.row_manager().create()?;

		debug!("created history database {}", self.lookup_file.path().display());
		Ok(())
	}

	/// Attaches to previously created and synced files.
	pub fn start(&self) -> Result<()> {
		self.rows.index().header().start()?;
		self.rows.index().manager().start()?;
		self.rows.row_manager().start()?;

		debug!("started history database {}: {:?}", self.lookup_file.path().display(), self.statinfo());
		Ok(())
	}

	/// Syncs and releases both files, even if the first one fails.
	pub fn stop(self) -> Result<()> {
		let synced = self.sync();
		let HistoryDatabase { lookup_file, rows_file, rows } = self;
		drop(rows);

		let lookup = stop_file(lookup_file);
		let rows = stop_file(rows_file);
		synced.and(lookup).and(rows)
	}

	/// Persists allocation cursors and flushes both files.
	pub fn sync(&self) -> Result<()> {
		self.rows.index().manager().sync()?;
		self.rows.row_manager().sync()
	}

	pub fn add_output(&self, key: &ShortHash, outpoint: &OutPoint, output_height: u32, value: u64) -> Result<()> {
		self.rows.add_row(key, &row::encode_output(outpoint, output_height, value))?;
		Ok(())
	}

	pub fn add_spend(&self, key: &ShortHash, previous: &OutPoint, spend: &OutPoint, spend_height: u64) -> Result<()> {
		if spend_height > u32::max_value() as u64 {
			return Err(ErrorKind::HeightOverflow(spend_height).into());
		}

		self.rows.add_row(key, &row::encode_spend(previous, spend, spend_height as u32))?;
		Ok(())
	}

	/// Removes the row added last for the address.
	pub fn delete_last_row(&self, key: &ShortHash) -> Result<()> {
		self.rows.delete_last_row(key)
	}

	/// Returns up to `limit` rows (0 for all) at or above `from_height`
	/// (0 for all), newest first.
	///
	/// Rows are ordered by insertion rather than height, so a row below
	/// `from_height` doesn't end the scan.
	pub fn get(&self, key: &ShortHash, limit: usize, from_height: u64) -> Result<Vec<HistoryRow>> {
		let mut result = Vec::new();

		for offset in self.rows.rows(key) {
			if limit != 0 && result.len() >= limit {
				break;
			}

			let decoded = self.rows.read_row(offset, |data| {
				if from_height == 0 || from_height <= row::read_height(data) as u64 {
					row::decode(data).map(Some)
				} else {
					Ok(None)
				}
			})?;

			if let Some(decoded) = decoded {
				result.push(decoded);
			}
		}

		Ok(result)
	}

	pub fn statinfo(&self) -> HistoryStatinfo {
		HistoryStatinfo {
			buckets: self.rows.index().header().size(),
			addresses: self.rows.index().manager().count(),
			rows: self.rows.row_manager().count(),
		}
	}
}

fn stop_file(file: Arc<MemoryMap>) -> Result<()> {
	match Arc::try_unwrap(file) {
		Ok(file) => file.stop(),
		Err(file) => file.sync(),
	}
}
