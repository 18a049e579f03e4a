//! Memory-mapped indexes for blockchain data
//!
//! Assumptions:
//!
//! - keys are digests, so their leading bytes are uniformly distributed
//!
//! - data is only appended, deletes are undos of the latest writes
//!
//! - a single writer, serialized by the caller
//!
//! - durability only at `sync`
//!
//! Every store is a bucket/chain hash table on top of a growable memory
//! mapped file. The file starts with a bucket array, followed by an
//! allocator which hands out space for elements.
//!
//! ```text
//!  buckets             allocator cursor   elements
//!   /                   /                  /
//! |....|....|....|....|........|.........|......|..........|
//! ```
//!
//! Each bucket points at the newest element which hashed into it and each
//! element points at the one stored before it.
//!
//! ```text
//!  bucket        element           element
//!   /             /                 /
//! |....| ---> |next|key|value| ---> |next|key|value| ---> EMPTY
//! ```
//!
//! Elements are addressed by offsets relative to the allocator, never by
//! pointers, so they stay valid when the file grows and is remapped.
//!
//! Two stores are built on that:
//!
//! - `TransactionDatabase` maps a transaction hash to its height, position
//! in block and serialized form
//!
//! - `HistoryDatabase` maps an address hash to a newest-first list of the
//! outputs it received and the spends of those outputs

extern crate bitcoin;
extern crate byteorder;
#[macro_use]
extern crate error_chain;
extern crate fs2;
#[macro_use]
extern crate log;
extern crate memmap;
extern crate parking_lot;

#[cfg(test)]
extern crate tempdir;

pub mod error;
pub mod hashtable;
pub mod history;
pub mod manager;
pub mod memory;
pub mod multimap;
pub mod options;
pub mod point;
pub mod transaction;
pub mod unspent;

/// Transaction hash.
pub type HashDigest = [u8; 32];
/// Address hash.
pub type ShortHash = [u8; 20];

pub use error::{Error, ErrorKind, Result};
pub use history::{HistoryDatabase, HistoryStatinfo};
pub use history::row::{HistoryRow, PointKind};
pub use options::Options;
pub use transaction::{TransactionDatabase, TransactionResult, TransactionStatinfo};
pub use unspent::{OutputMap, UnspentTransaction, UnspentTransactions};
