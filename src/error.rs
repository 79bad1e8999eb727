use std::result;
use thiserror::Error;

//-------------------------------------------------------------------------

/// Errors raised by the trie core.  Header-validation errors are surfaced to the
/// caller of `open`/`create`; in-trie index errors are swallowed at the walker
/// and logged instead (see the crate docs for the propagation policy).
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TrieError {
    #[error("invalid magic number: expected {expected:?}, found {found:?}")]
    InvalidMagicNumber { expected: [u8; 4], found: [u8; 4] },

    #[error("invalid version: expected {expected}, found {found}")]
    InvalidVersion { expected: u8, found: u8 },

    #[error("truncated file: header claims {claimed} bytes, file is {actual} bytes")]
    TruncatedFile { claimed: u64, actual: u64 },

    #[error("block array capacity exhausted at {capacity} blocks")]
    CapacityExhausted { capacity: u64 },

    #[error("key segment of {len} bytes does not fit in a slot of {max} bytes")]
    KeyTooLongForSlot { len: usize, max: usize },

    #[error("corrupt child index {index} (len is {len})")]
    CorruptChildIndex { index: u32, len: u64 },
}

pub type Result<T> = result::Result<T, TrieError>;

//-------------------------------------------------------------------------
