#![allow(unknown_lints)]
#![allow(missing_docs)]

use std::io;
use std::path::PathBuf;
use bitcoin::consensus::encode;

error_chain! {
	foreign_links {
		Io(io::Error);
		Encode(encode::Error);
	}

	errors {
		DatabaseLocked(path: PathBuf) {
			description("database file is locked by another process")
			display("database file {} is locked by another process", path.display())
		}
		InvalidOptions(field: &'static str, error: String) {
			description("invalid options")
			display("invalid option {}: {}", field, error)
		}
		Corrupted(reason: String) {
			description("database file is corrupted")
			display("database file is corrupted: {}", reason)
		}
		HeightOverflow(height: u64) {
			description("height does not fit in 32 bits")
			display("height {} does not fit in 32 bits", height)
		}
		IndexOverflow(index: u64) {
			description("index does not fit in 32 bits")
			display("index {} does not fit in 32 bits", index)
		}
		MissingKey {
			description("key not found")
			display("key not found")
		}
		InvalidMarker(marker: u8) {
			description("invalid history row marker")
			display("invalid history row marker: {}", marker)
		}
		InvalidAllocation(requested: usize, record_size: usize) {
			description("invalid record allocation")
			display("cannot allocate {} bytes from a manager of {} byte records", requested, record_size)
		}
	}
}
