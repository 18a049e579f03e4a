#[cfg(test)]
#[macro_use]
extern crate quickcheck;

extern crate bitcoin;
extern crate chaindb;
extern crate tempdir;

use bitcoin::{absolute, transaction, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use bitcoin::hashes::Hash;
use tempdir::TempDir;
use chaindb::{HistoryDatabase, HistoryRow, Options, PointKind, TransactionDatabase};
use quickcheck::TestResult;

const ADDRESSES: u8 = 3;

fn outpoint(i: usize) -> OutPoint {
	OutPoint::new(Txid::from_byte_array([i as u8; 32]), i as u32)
}

fn history(temp: &TempDir) -> HistoryDatabase {
	let options = Options::with(|o| o.history_buckets = 7);
	let db = HistoryDatabase::new(temp.path().join("lookup"), temp.path().join("rows"), options).unwrap();
	db.create().unwrap();
	db
}

/// Stores `(address, height, value)` outputs and returns the rows of every
/// address, oldest first.
fn fill(db: &HistoryDatabase, outputs: &[(u8, u32, u64)]) -> Vec<Vec<HistoryRow>> {
	let mut expected = vec![Vec::new(); ADDRESSES as usize];
	for (i, &(address, height, value)) in outputs.iter().enumerate() {
		let address = address % ADDRESSES;
		db.add_output(&[address; 20], &outpoint(i), height, value).unwrap();
		expected[address as usize].push(HistoryRow {
			kind: PointKind::Output,
			point: outpoint(i),
			height,
			value,
		});
	}
	expected
}

quickcheck! {
	fn history_is_newest_first_and_limited(outputs: Vec<(u8, u32, u64)>, limit: u8) -> TestResult {
		// limit search space to prevent tests from taking forever
		let mut outputs = outputs;
		outputs.truncate(64);

		let temp = TempDir::new("quickcheck_history_is_newest_first_and_limited").unwrap();
		let db = history(&temp);
		let expected = fill(&db, &outputs);

		for address in 0..ADDRESSES {
			let mut rows = expected[address as usize].clone();
			rows.reverse();
			if limit != 0 {
				rows.truncate(limit as usize);
			}

			if db.get(&[address; 20], limit as usize, 0).unwrap() != rows {
				return TestResult::failed();
			}
		}

		TestResult::passed()
	}

	fn history_height_filter_skips_without_stopping(outputs: Vec<(u8, u32, u64)>, from_height: u32) -> TestResult {
		let mut outputs = outputs;
		outputs.truncate(64);

		let temp = TempDir::new("quickcheck_history_height_filter_skips_without_stopping").unwrap();
		let db = history(&temp);
		let expected = fill(&db, &outputs);

		for address in 0..ADDRESSES {
			let rows: Vec<_> = expected[address as usize].iter()
				.rev()
				.filter(|row| from_height == 0 || row.height >= from_height)
				.cloned()
				.collect();

			if db.get(&[address; 20], 0, from_height as u64).unwrap() != rows {
				return TestResult::failed();
			}
		}

		TestResult::passed()
	}

	fn history_undo_restores_previous_state(outputs: Vec<(u8, u32, u64)>, undo: u8) -> TestResult {
		let mut outputs = outputs;
		outputs.truncate(64);
		let undo = undo as usize % (outputs.len() + 1);

		let temp = TempDir::new("quickcheck_history_undo_restores_previous_state").unwrap();
		let db = history(&temp);
		fill(&db, &outputs);

		// undo in reverse insertion order, so every delete hits the newest row of its address
		for &(address, _, _) in outputs.iter().rev().take(undo) {
			db.delete_last_row(&[address % ADDRESSES; 20]).unwrap();
		}

		let reference_temp = TempDir::new("quickcheck_history_undo_reference").unwrap();
		let reference = history(&reference_temp);
		fill(&reference, &outputs[..outputs.len() - undo]);

		for address in 0..ADDRESSES {
			if db.get(&[address; 20], 0, 0).unwrap() != reference.get(&[address; 20], 0, 0).unwrap() {
				return TestResult::failed();
			}
		}

		TestResult::passed()
	}

	fn transaction_round_trip(height: u32, index: u32, script: Vec<u8>, values: Vec<u64>) -> TestResult {
		let mut script = script;
		let mut values = values;
		script.truncate(100);
		values.truncate(16);

		let tx = Transaction {
			version: transaction::Version::ONE,
			lock_time: absolute::LockTime::ZERO,
			input: vec![TxIn {
				previous_output: OutPoint::null(),
				script_sig: ScriptBuf::from_bytes(script.clone()),
				sequence: Sequence::MAX,
				witness: Witness::new(),
			}],
			output: values.iter().map(|value| TxOut {
				value: Amount::from_sat(*value),
				script_pubkey: ScriptBuf::from_bytes(script.clone()),
			}).collect(),
		};

		let temp = TempDir::new("quickcheck_transaction_round_trip").unwrap();
		let db = TransactionDatabase::new(temp.path().join("transactions"), Options::with(|o| o.transaction_buckets = 7)).unwrap();
		db.create().unwrap();
		db.store(height as u64, index as u64, &tx).unwrap();

		let result = db.get(&tx.compute_txid().to_byte_array()).unwrap();
		TestResult::from_bool(result.height() == height && result.index() == index && result.transaction().unwrap() == tx)
	}
}
