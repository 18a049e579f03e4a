use std::ops::Deref;
use error::{ErrorKind, Result};

#[derive(Debug, PartialEq, Clone)]
pub struct Options {
	/// Number of buckets in the transaction table. Fixed once the table is created.
	pub transaction_buckets: u64,
	/// Number of buckets in the history key index. Fixed once the index is created.
	pub history_buckets: u64,
	/// A file which runs out of space grows to `expansion_percent` of the
	/// requested size, so that consecutive allocations don't remap every time.
	pub expansion_percent: u16,
}

impl Default for Options {
	fn default() -> Self {
		Options {
			transaction_buckets: 100_000_000,
			history_buckets: 97_210_744,
			expansion_percent: 150,
		}
	}
}

impl Options {
	pub fn with<F>(f: F) -> Self where
		F: FnOnce(&mut Self),
	{
		let mut options = Options::default();
		f(&mut options);
		options
	}
}

#[derive(Debug, PartialEq, Clone)]
pub(crate) struct InternalOptions {
	pub external: Options,
}

impl Deref for InternalOptions {
	type Target = Options;

	fn deref(&self) -> &Self::Target {
		&self.external
	}
}

impl InternalOptions {
	pub fn from_external(external: Options) -> Result<Self> {
		if external.transaction_buckets == 0 {
			return Err(ErrorKind::InvalidOptions("transaction_buckets", "must be greater than 0".into()).into());
		}

		if external.history_buckets == 0 {
			return Err(ErrorKind::InvalidOptions("history_buckets", "must be greater than 0".into()).into());
		}

		if external.expansion_percent < 100 {
			return Err(ErrorKind::InvalidOptions(
				"expansion_percent",
				format!("{} is less than 100", external.expansion_percent),
			).into());
		}

		Ok(InternalOptions {
			external,
		})
	}
}

#[cfg(test)]
mod tests {
	use error::ErrorKind;
	use super::{Options, InternalOptions};

	#[test]
	fn test_default_options_are_valid() {
		let options = InternalOptions::from_external(Options::default()).unwrap();
		assert_eq!(options.transaction_buckets, 100_000_000);
		assert_eq!(options.history_buckets, 97_210_744);
	}

	#[test]
	fn test_zero_buckets_are_rejected() {
		let options = Options::with(|o| o.history_buckets = 0);
		match *InternalOptions::from_external(options).unwrap_err().kind() {
			ErrorKind::InvalidOptions(field, _) => assert_eq!(field, "history_buckets"),
			ref other => panic!("unexpected error: {:?}", other),
		}
	}

	#[test]
	fn test_shrinking_expansion_is_rejected() {
		let options = Options::with(|o| o.expansion_percent = 99);
		assert!(InternalOptions::from_external(options).is_err());
	}
}
