pub mod block;
pub(crate) mod cost;
mod insert;
mod promote;
mod sort;
pub mod walker;


use crate::block_array::BlockArray;
use crate::config::TrieConfig;
use crate::error::Result;
use crate::trie::block::TrieBlock;
use crate::trie::walker::{TrieWalker, WalkResult};

//-------------------------------------------------------------------------

/// Root holder and insertion driver over a `BlockArray<TrieBlock>` (§3, §4.2).
/// Index 0 is always the root; an empty backing array gets an empty tall
/// block appended the first time something is inserted.
pub struct Trie<'a> {
    array: BlockArray<'a, TrieBlock>,
    config: TrieConfig,
}

impl<'a> Trie<'a> {
    pub fn new(array: BlockArray<'a, TrieBlock>, config: TrieConfig) -> Self {
        Trie { array, config }
    }

    pub fn config(&self) -> &TrieConfig {
        &self.config
    }

    /// `view.insert(s)` (§4.2). Not thread-safe — the caller is responsible
    /// for the single-writer gate described in §5.
    pub fn insert(&mut self, s: &[u8]) -> Result<()> {
        insert::insert(&mut self.array, &self.config, s)
    }

    /// `walk(prefix)` (§4.6, §6).
    pub fn walk(&self, prefix: &[u8]) -> WalkResult {
        TrieWalker::new(&self.array, &self.config).walk_to(prefix)
    }

    /// `best_completion(prefix)` (§4.7, §6).
    pub fn best_completion(&self, prefix: &[u8]) -> Option<Vec<u8>> {
        TrieWalker::new(&self.array, &self.config).best_completion(prefix)
    }
}

//-------------------------------------------------------------------------
