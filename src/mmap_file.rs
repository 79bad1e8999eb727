use anyhow::Context;
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::path::Path;

use crate::block_array::BlockArray;
use crate::config::TrieConfig;
use crate::header::{self, HEADER_SIZE};
use crate::trie::block::TrieBlock;
use crate::trie::Trie;

//-------------------------------------------------------------------------

/// Owns the memory mapping backing a `Trie`: the file's header lives in the
/// first `HEADER_SIZE` bytes, the block array fills the rest (§6). Opening
/// validates the header and rejects mismatches without touching the file
/// further (§7); creating lays out a fresh header and a zeroed block region
/// sized from `TrieConfig::initial_capacity_blocks`.
pub struct TrieFile {
    mmap: MmapMut,
    capacity: u64,
}

impl TrieFile {
    /// Creates a new backing file at `path`, sized for
    /// `config.initial_capacity_blocks` blocks, and returns it already
    /// wrapped in a `Trie`. Fails if `path` already exists (callers that want
    /// to overwrite should remove it first — this module never does that
    /// implicitly).
    pub fn create(path: impl AsRef<Path>, config: TrieConfig) -> anyhow::Result<TrieFile> {
        let capacity = config.initial_capacity_blocks;
        let size = HEADER_SIZE as u64 + capacity * TrieBlock::RECORD_SIZE as u64;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path.as_ref())
            .with_context(|| format!("creating {}", path.as_ref().display()))?;
        file.set_len(size).context("sizing new trie file")?;

        let mut mmap = unsafe { MmapOptions::new().map_mut(&file) }.context("mapping new trie file")?;
        header::write_header(&mut mmap[..HEADER_SIZE], size as u32);

        tracing::info!(path = %path.as_ref().display(), capacity, "created trie file");
        Ok(TrieFile { mmap, capacity })
    }

    /// Opens an existing backing file, validating its header against the
    /// real on-disk size. The capacity (and therefore the block array size)
    /// is derived from the validated `size_in_bytes`, not from any
    /// caller-supplied config — the file's own header is authoritative.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<TrieFile> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())
            .with_context(|| format!("opening {}", path.as_ref().display()))?;
        let actual_size = file.metadata().context("statting trie file")?.len();

        let mmap = unsafe { MmapOptions::new().map_mut(&file) }.context("mapping trie file")?;
        let hdr = header::validate_header(&mmap[..HEADER_SIZE], actual_size)?;

        let capacity = (hdr.size_in_bytes as u64 - HEADER_SIZE as u64) / TrieBlock::RECORD_SIZE as u64;
        tracing::info!(path = %path.as_ref().display(), capacity, "opened trie file");
        Ok(TrieFile { mmap, capacity })
    }

    /// Builds a `Trie` borrowing this mapping's block-array region and length
    /// cell. The `Trie` cannot outlive the `TrieFile` it was built from.
    pub fn trie(&mut self, config: TrieConfig) -> Trie<'_> {
        let capacity = self.capacity;
        let (header_bytes, block_bytes) = self.mmap.split_at_mut(HEADER_SIZE);
        // SAFETY: `header_bytes` is `HEADER_SIZE` bytes of the start of a
        // page-aligned mmap region, so the length cell at `LEN_OFFSET` is
        // 8-byte aligned; its lifetime is tied to `self` via the `'_` on the
        // returned `Trie`, so it cannot outlive this mapping.
        let len_cell = unsafe { header::len_cell(header_bytes) };
        let array = BlockArray::new(block_bytes, len_cell, capacity);
        Trie::new(array, config)
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Flushes pending writes to disk. Not required for correctness within a
    /// single process (the mapping is the source of truth), but callers that
    /// want durability across a crash should call this after a batch of
    /// inserts.
    pub fn flush(&self) -> anyhow::Result<()> {
        self.mmap.flush().context("flushing trie file")
    }
}

//-------------------------------------------------------------------------


//-------------------------------------------------------------------------
