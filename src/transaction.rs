//! Transaction store.
//!
//! A slab hash table keyed by transaction hash. Each value holds the
//! block position of the transaction followed by its serialized form.
//!
//! ```text
//!  height   index    transaction
//!   /        /        /
//! |....|....|.....................|
//!  4B LE    4B LE
//! ```

use std::path::Path;
use std::sync::Arc;
use bitcoin::Transaction;
use bitcoin::consensus::encode::{deserialize_partial, serialize};
use bitcoin::hashes::Hash;
use byteorder::{ByteOrder, LittleEndian};
use error::{ErrorKind, Result};
use hashtable::{HashTableHeader, SlabHashTable};
use manager::{Allocator, SlabManager};
use memory::MemoryMap;
use options::{InternalOptions, Options};
use HashDigest;

const HEIGHT_SIZE: usize = 4;
const INDEX_SIZE: usize = 4;
const METADATA_SIZE: usize = HEIGHT_SIZE + INDEX_SIZE;

/// Encodes the stored value of a transaction.
fn encode(height: u32, index: u32, tx: &Transaction) -> Vec<u8> {
	let mut value = vec![0u8; METADATA_SIZE];
	LittleEndian::write_u32(&mut value[..HEIGHT_SIZE], height);
	LittleEndian::write_u32(&mut value[HEIGHT_SIZE..METADATA_SIZE], index);
	value.extend_from_slice(&serialize(tx));
	value
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TransactionStatinfo {
	pub buckets: u64,
	/// Number of slabs ever allocated, including unlinked ones.
	pub transactions: u64,
	/// Bytes taken by slabs and the slab cursor.
	pub size: u64,
}

/// Found transaction. Fields are decoded only when asked for.
pub struct TransactionResult<'a> {
	table: &'a SlabHashTable<HashDigest>,
	offset: u64,
}

impl<'a> TransactionResult<'a> {
	/// Block height of the transaction.
	pub fn height(&self) -> u32 {
		self.table.read(self.offset, |data| LittleEndian::read_u32(&data[..HEIGHT_SIZE]))
	}

	/// Position of the transaction within its block.
	pub fn index(&self) -> u32 {
		self.table.read(self.offset, |data| LittleEndian::read_u32(&data[HEIGHT_SIZE..METADATA_SIZE]))
	}

	pub fn transaction(&self) -> Result<Transaction> {
		self.table.read(self.offset, |data| -> Result<Transaction> {
			let (tx, _) = deserialize_partial::<Transaction>(&data[METADATA_SIZE..])?;
			Ok(tx)
		})
	}
}

pub struct TransactionDatabase {
	file: Arc<MemoryMap>,
	table: SlabHashTable<HashDigest>,
}

impl TransactionDatabase {
	/// Opens the file. Call `create` or `start` before use.
	pub fn new<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
		let options = InternalOptions::from_external(options)?;
		let buckets = options.transaction_buckets;
		let file = Arc::new(MemoryMap::open(path, options.expansion_percent)?);

		let header = HashTableHeader::new(file.clone(), buckets);
		let manager = SlabManager::new(file.clone(), HashTableHeader::file_size(buckets));

		let result = TransactionDatabase {
			file,
			table: SlabHashTable::new(header, manager),
		};

		Ok(result)
	}

	/// Formats the file.
	pub fn create(&self) -> Result<()> {
		self.table.header().create()?;
		self.table.manager().create()?;
		debug!("created transaction database {}", self.file.path().display());
		Ok(())
	}

	/// Attaches to a previously created and synced file.
	pub fn start(&self) -> Result<()> {
		self.table.header().start()?;
		self.table.manager().start()?;
		debug!("started transaction database {}: {:?}", self.file.path().display(), self.statinfo());
		Ok(())
	}

	pub fn stop(self) -> Result<()> {
		let synced = self.sync();
		let TransactionDatabase { file, table } = self;
		drop(table);

		let stopped = match Arc::try_unwrap(file) {
			Ok(file) => file.stop(),
			Err(file) => file.sync(),
		};
		synced.and(stopped)
	}

	/// Persists the slab cursor and flushes the file.
	pub fn sync(&self) -> Result<()> {
		self.table.manager().sync()
	}

	pub fn store(&self, height: u64, index: u64, tx: &Transaction) -> Result<()> {
		if height > u32::max_value() as u64 {
			return Err(ErrorKind::HeightOverflow(height).into());
		}

		if index > u32::max_value() as u64 {
			return Err(ErrorKind::IndexOverflow(index).into());
		}

		let key = tx.compute_txid().to_byte_array();
		let offset = self.table.store(&key, &encode(height as u32, index as u32, tx))?;
		trace!("stored transaction at {}", offset);
		Ok(())
	}

	pub fn get(&self, hash: &HashDigest) -> Option<TransactionResult> {
		self.table.find(hash).map(|offset| TransactionResult {
			table: &self.table,
			offset,
		})
	}

	/// Unlinks the newest transaction stored under the hash.
	pub fn remove(&self, hash: &HashDigest) -> Result<()> {
		if self.table.unlink(hash) {
			Ok(())
		} else {
			Err(ErrorKind::MissingKey.into())
		}
	}

	pub fn statinfo(&self) -> TransactionStatinfo {
		TransactionStatinfo {
			buckets: self.table.header().size(),
			transactions: self.table.manager().count(),
			size: self.table.manager().payload_size(),
		}
	}
}

#[cfg(test)]
mod tests {
	use bitcoin::{absolute, transaction, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
	use bitcoin::consensus::encode::serialize;
	use bitcoin::hashes::Hash;
	use tempdir::TempDir;
	use error::ErrorKind;
	use options::Options;
	use super::TransactionDatabase;

	fn tx(seed: u8, outputs: u64) -> Transaction {
		Transaction {
			version: transaction::Version::ONE,
			lock_time: absolute::LockTime::ZERO,
			input: vec![TxIn {
				previous_output: OutPoint::null(),
				script_sig: ScriptBuf::from_bytes(vec![seed, 0x51]),
				sequence: Sequence::MAX,
				witness: Witness::new(),
			}],
			output: (0..outputs).map(|i| TxOut {
				value: Amount::from_sat(1000 * (i + 1)),
				script_pubkey: ScriptBuf::from_bytes(vec![0x6a, seed]),
			}).collect(),
		}
	}

	fn open(temp: &TempDir) -> TransactionDatabase {
		let options = Options::with(|o| o.transaction_buckets = 53);
		TransactionDatabase::new(temp.path().join("transactions"), options).unwrap()
	}

	#[test]
	fn test_store_and_get() {
		let temp = TempDir::new("test_store_and_get").unwrap();
		let db = open(&temp);
		db.create().unwrap();

		let t = tx(1, 2);
		let hash = t.compute_txid().to_byte_array();
		db.store(100, 2, &t).unwrap();

		let result = db.get(&hash).unwrap();
		assert_eq!(result.height(), 100);
		assert_eq!(result.index(), 2);
		assert_eq!(result.transaction().unwrap(), t);
		assert!(db.get(&[0u8; 32]).is_none());
	}

	#[test]
	fn test_remove() {
		let temp = TempDir::new("test_remove").unwrap();
		let db = open(&temp);
		db.create().unwrap();

		let t = tx(2, 1);
		let hash = t.compute_txid().to_byte_array();
		db.store(1, 0, &t).unwrap();
		db.remove(&hash).unwrap();
		assert!(db.get(&hash).is_none());

		match *db.remove(&hash).unwrap_err().kind() {
			ErrorKind::MissingKey => {},
			ref other => panic!("unexpected error: {:?}", other),
		}
	}

	#[test]
	fn test_overflows_are_rejected() {
		let temp = TempDir::new("test_overflows_are_rejected").unwrap();
		let db = open(&temp);
		db.create().unwrap();

		let t = tx(3, 1);
		match *db.store(1 << 32, 0, &t).unwrap_err().kind() {
			ErrorKind::HeightOverflow(height) => assert_eq!(height, 1 << 32),
			ref other => panic!("unexpected error: {:?}", other),
		}
		match *db.store(0, 1 << 32, &t).unwrap_err().kind() {
			ErrorKind::IndexOverflow(index) => assert_eq!(index, 1 << 32),
			ref other => panic!("unexpected error: {:?}", other),
		}
		assert_eq!(db.statinfo().transactions, 0);
		assert_eq!(db.statinfo().size, 16);
	}

	#[test]
	fn test_result_survives_growth() {
		let temp = TempDir::new("test_result_survives_growth").unwrap();
		let db = open(&temp);
		db.create().unwrap();

		let first = tx(0, 1);
		db.store(7, 0, &first).unwrap();
		let hash = first.compute_txid().to_byte_array();
		let result = db.get(&hash).unwrap();

		for seed in 1..200u8 {
			db.store(seed as u64, 1, &tx(seed, 20)).unwrap();
		}

		assert_eq!(result.height(), 7);
		assert_eq!(result.transaction().unwrap(), first);
		assert_eq!(db.statinfo().transactions, 200);
	}

	#[test]
	fn test_restart() {
		let temp = TempDir::new("test_restart").unwrap();
		let t = tx(9, 3);
		let hash = t.compute_txid().to_byte_array();
		{
			let db = open(&temp);
			db.create().unwrap();
			db.store(42, 3, &t).unwrap();
			db.stop().unwrap();
		}

		let db = open(&temp);
		db.start().unwrap();
		let statinfo = db.statinfo();
		assert_eq!(statinfo.buckets, 53);
		assert_eq!(statinfo.transactions, 1);
		// cursor, then one slab of link, key, height and index, transaction
		assert_eq!(statinfo.size, 16 + 8 + 32 + 8 + serialize(&t).len() as u64);
		assert_eq!(db.get(&hash).unwrap().transaction().unwrap(), t);
	}
}
