//! In-memory unspent output cache.
//!
//! `UnspentTransaction` is identified by its hash alone. Height, coinbase
//! flag and outputs are payload, so a value built from just a hash can be
//! used to look up a full one.

use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use bitcoin::{OutPoint, Transaction, TxOut};
use bitcoin::hashes::Hash as BitcoinHash;
use parking_lot::RwLock;
use HashDigest;

/// Unspent outputs of a transaction, by output index.
pub type OutputMap = HashMap<u32, TxOut>;

#[derive(Debug, Clone)]
pub struct UnspentTransaction {
	height: usize,
	is_coinbase: bool,
	hash: HashDigest,
	outputs: Arc<RwLock<OutputMap>>,
}

impl UnspentTransaction {
	/// Identity-only value with no outputs.
	pub fn from_hash(hash: HashDigest) -> Self {
		UnspentTransaction {
			height: 0,
			is_coinbase: false,
			hash,
			outputs: Arc::new(RwLock::new(OutputMap::new())),
		}
	}

	pub fn from_point(point: &OutPoint) -> Self {
		Self::from_hash(point.txid.to_byte_array())
	}

	pub fn new(tx: &Transaction, height: usize) -> Self {
		let outputs = tx.output.iter()
			.enumerate()
			.map(|(index, output)| (index as u32, output.clone()))
			.collect();

		UnspentTransaction {
			height,
			is_coinbase: tx.is_coinbase(),
			hash: tx.compute_txid().to_byte_array(),
			outputs: Arc::new(RwLock::new(outputs)),
		}
	}

	pub fn hash(&self) -> &HashDigest {
		&self.hash
	}

	pub fn height(&self) -> usize {
		self.height
	}

	pub fn is_coinbase(&self) -> bool {
		self.is_coinbase
	}

	/// Outputs, shared with every clone of this value. Changes made
	/// through any clone are seen by all of them.
	pub fn outputs(&self) -> &Arc<RwLock<OutputMap>> {
		&self.outputs
	}
}

impl PartialEq for UnspentTransaction {
	fn eq(&self, other: &Self) -> bool {
		self.hash == other.hash
	}
}

impl Eq for UnspentTransaction {}

impl Hash for UnspentTransaction {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.hash.hash(state)
	}
}

struct Entry {
	sequence: u64,
	transaction: UnspentTransaction,
}

/// Bounded cache of unspent transactions.
///
/// Entries are keyed by hash. A second index orders them by the time they
/// were last added, and the oldest ones are evicted once `capacity` is
/// exceeded.
pub struct UnspentTransactions {
	entries: HashMap<HashDigest, Entry>,
	recency: BTreeMap<u64, HashDigest>,
	sequence: u64,
	capacity: usize,
}

impl UnspentTransactions {
	pub fn new(capacity: usize) -> Self {
		UnspentTransactions {
			entries: HashMap::new(),
			recency: BTreeMap::new(),
			sequence: 0,
			capacity,
		}
	}

	/// Inserts the transaction's outputs, replacing any previous entry for its hash.
	pub fn add(&mut self, tx: &Transaction, height: usize) {
		self.insert(UnspentTransaction::new(tx, height));
	}

	pub fn insert(&mut self, transaction: UnspentTransaction) {
		let hash = *transaction.hash();
		let sequence = self.sequence;
		self.sequence += 1;

		if let Some(previous) = self.entries.insert(hash, Entry { sequence, transaction }) {
			self.recency.remove(&previous.sequence);
		}
		self.recency.insert(sequence, hash);

		while self.entries.len() > self.capacity {
			let oldest = match self.recency.keys().next() {
				Some(oldest) => *oldest,
				None => break,
			};
			if let Some(hash) = self.recency.remove(&oldest) {
				self.entries.remove(&hash);
				trace!("evicted unspent transaction {:?}", &hash[..4]);
			}
		}
	}

	pub fn get(&self, hash: &HashDigest) -> Option<&UnspentTransaction> {
		self.entries.get(hash).map(|entry| &entry.transaction)
	}

	/// Returns the output if it is cached and not spent.
	pub fn get_output(&self, point: &OutPoint) -> Option<TxOut> {
		self.get(&point.txid.to_byte_array())
			.and_then(|transaction| transaction.outputs().read().get(&point.vout).cloned())
	}

	/// Removes the output from the cache, returning it.
	///
	/// The whole transaction is dropped once its last output is spent.
	pub fn spend(&mut self, point: &OutPoint) -> Option<TxOut> {
		let hash = point.txid.to_byte_array();
		let (output, exhausted) = {
			let entry = self.entries.get(&hash)?;
			let mut outputs = entry.transaction.outputs().write();
			let output = outputs.remove(&point.vout)?;
			(output, outputs.is_empty())
		};

		if exhausted {
			self.remove(&hash);
		}

		Some(output)
	}

	pub fn remove(&mut self, hash: &HashDigest) -> Option<UnspentTransaction> {
		self.entries.remove(hash).map(|entry| {
			self.recency.remove(&entry.sequence);
			entry.transaction
		})
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn clear(&mut self) {
		self.entries.clear();
		self.recency.clear();
	}
}
