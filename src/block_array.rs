use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, TrieError};

//-------------------------------------------------------------------------

/// A fixed-size record that can be read from / written to a raw byte slice in
/// place.  `TrieBlock` is the only implementor in this crate, but the trait
/// keeps `BlockArray` generic the way the donor's `PArray<S, Data>` is generic
/// over `Serializable`.
pub trait BlockRecord: Sized {
    /// On-disk size of one record, in bytes.  Every record occupies exactly
    /// this many bytes regardless of which logical variant it holds.
    const RECORD_SIZE: usize;

    fn read_from(bytes: &[u8]) -> Self;
    fn write_to(&self, bytes: &mut [u8]);
}

//-------------------------------------------------------------------------

/// Append-only array of fixed-size records over an externally-owned byte
/// buffer (typically a memory-mapped file region), with a shared length cell.
///
/// `BlockArray` does not own the buffer: it borrows `&'a mut [u8]` for the
/// record storage and a `&'a AtomicU64` for the length cell, mirroring the
/// donor's `PArray`, which is handed a `Data` window rather than owning bytes
/// itself.  There is no reallocation; growth is `append` only, and hitting
/// capacity is a fatal `TrieError::CapacityExhausted` (the file-resize
/// protocol is the caller's responsibility and out of scope here).
pub struct BlockArray<'a, T: BlockRecord> {
    data: &'a mut [u8],
    len: &'a AtomicU64,
    capacity: u64,
    _marker: PhantomData<T>,
}

impl<'a, T: BlockRecord> BlockArray<'a, T> {
    /// `data` must be at least `capacity * T::RECORD_SIZE` bytes.
    pub fn new(data: &'a mut [u8], len: &'a AtomicU64, capacity: u64) -> Self {
        assert!(data.len() as u64 >= capacity * T::RECORD_SIZE as u64);
        BlockArray {
            data,
            len,
            capacity,
            _marker: PhantomData,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Readers should call this once and treat `[0, len)` as readable for the
    /// duration of their walk (see the crate docs on cross-process ordering).
    pub fn len(&self) -> u64 {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn byte_range(idx: u64) -> std::ops::Range<usize> {
        let start = idx as usize * T::RECORD_SIZE;
        start..start + T::RECORD_SIZE
    }

    pub fn get(&self, idx: u64) -> T {
        let range = Self::byte_range(idx);
        T::read_from(&self.data[range])
    }

    /// Like `get`, but reads every byte of the record through `read_volatile`
    /// first so the compiler cannot hoist or CSE the read across loop
    /// iterations in a walker that may race a concurrent writer (see the
    /// crate docs' memory-ordering note). Readers that don't cross an inner
    /// loop boundary can use the plain `get`.
    pub fn get_volatile(&self, idx: u64) -> T {
        let range = Self::byte_range(idx);
        let src = &self.data[range];
        let mut buf = vec![0u8; T::RECORD_SIZE];
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = unsafe { std::ptr::read_volatile(&src[i] as *const u8) };
        }
        T::read_from(&buf)
    }

    pub fn set(&mut self, idx: u64, record: &T) {
        let range = Self::byte_range(idx);
        record.write_to(&mut self.data[range]);
    }

    /// Writes `record` at the current length, then advances the length cell
    /// with `Release` ordering so that a reader observing the new length also
    /// observes the record's bytes (see the crate docs' memory-ordering note).
    pub fn append(&mut self, record: &T) -> Result<u64> {
        let idx = self.len.load(Ordering::Relaxed);
        if idx >= self.capacity {
            return Err(TrieError::CapacityExhausted {
                capacity: self.capacity,
            });
        }
        let range = Self::byte_range(idx);
        record.write_to(&mut self.data[range]);
        self.len.store(idx + 1, Ordering::Release);
        Ok(idx)
    }
}

//-------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    struct Stamp(u32);

    impl BlockRecord for Stamp {
        const RECORD_SIZE: usize = 4;

        fn read_from(bytes: &[u8]) -> Self {
            Stamp(u32::from_le_bytes(bytes[0..4].try_into().unwrap()))
        }

        fn write_to(&self, bytes: &mut [u8]) {
            bytes[0..4].copy_from_slice(&self.0.to_le_bytes());
        }
    }

    fn mk_array(capacity: u64) -> (Vec<u8>, AtomicU64) {
        (vec![0u8; capacity as usize * 4], AtomicU64::new(0))
    }

    #[test]
    fn append_then_get() {
        let (mut data, len) = mk_array(4);
        let mut arr: BlockArray<Stamp> = BlockArray::new(&mut data, &len, 4);

        assert_eq!(arr.len(), 0);
        assert_eq!(arr.append(&Stamp(10)).unwrap(), 0);
        assert_eq!(arr.append(&Stamp(20)).unwrap(), 1);
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.get(0), Stamp(10));
        assert_eq!(arr.get(1), Stamp(20));
    }

    #[test]
    fn set_mutates_in_place_without_growing_len() {
        let (mut data, len) = mk_array(4);
        let mut arr: BlockArray<Stamp> = BlockArray::new(&mut data, &len, 4);
        arr.append(&Stamp(1)).unwrap();
        arr.set(0, &Stamp(99));
        assert_eq!(arr.len(), 1);
        assert_eq!(arr.get(0), Stamp(99));
    }

    #[test]
    fn append_past_capacity_is_fatal() {
        let (mut data, len) = mk_array(1);
        let mut arr: BlockArray<Stamp> = BlockArray::new(&mut data, &len, 1);
        arr.append(&Stamp(1)).unwrap();
        let err = arr.append(&Stamp(2)).unwrap_err();
        assert_eq!(err, TrieError::CapacityExhausted { capacity: 1 });
    }

    #[test]
    fn get_volatile_matches_get() {
        let (mut data, len) = mk_array(2);
        let mut arr: BlockArray<Stamp> = BlockArray::new(&mut data, &len, 2);
        arr.append(&Stamp(42)).unwrap();
        assert_eq!(arr.get_volatile(0), arr.get(0));
    }

    #[test]
    fn len_is_monotone_non_decreasing() {
        let (mut data, len) = mk_array(8);
        let mut arr: BlockArray<Stamp> = BlockArray::new(&mut data, &len, 8);
        let mut last = arr.len();
        for i in 0..8 {
            arr.append(&Stamp(i)).unwrap();
            assert!(arr.len() >= last);
            last = arr.len();
        }
    }
}

//-------------------------------------------------------------------------
