use crate::block_array::BlockArray;
use crate::config::TrieConfig;
use crate::trie::block::{BlockIndex, Group, NodeEntry, TrieBlock};

//-------------------------------------------------------------------------

/// Result of `TrieWalker::walk_to` (§4.6): what was matched, and how much of
/// `prefix` it accounted for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkResult {
    pub success: bool,
    pub consumed: usize,
    pub extension: Vec<u8>,
    pub cost: u16,
    pub reached_leaf: bool,
    /// The block to keep descending from for `walk_to_heuristic`, if the
    /// walk stopped by moving into a child rather than matching a terminal
    /// leaf edge directly. Not part of the public contract in §6; internal
    /// plumbing so the walker doesn't need to re-traverse from the root.
    continuation: Option<BlockIndex>,
}

impl WalkResult {
    fn failure() -> Self {
        WalkResult { success: false, consumed: 0, extension: Vec::new(), cost: 0, reached_leaf: false, continuation: None }
    }
}

/// A read-only cursor over a `BlockArray<TrieBlock>`: exact prefix walks and
/// heuristic best-completion extension. Pure-read, no allocation beyond the
/// small owned buffers returned in `WalkResult`.
pub struct TrieWalker<'a, 'b> {
    array: &'a BlockArray<'b, TrieBlock>,
    config: &'a TrieConfig,
}

impl<'a, 'b> TrieWalker<'a, 'b> {
    pub fn new(array: &'a BlockArray<'b, TrieBlock>, config: &'a TrieConfig) -> Self {
        TrieWalker { array, config }
    }

    /// §4.6: advances from the root, consuming `prefix`, until the prefix is
    /// exhausted, a leaf is reached, or no edge/sibling matches.
    pub fn walk_to(&self, prefix: &[u8]) -> WalkResult {
        if self.array.is_empty() {
            return WalkResult::failure();
        }

        let mut block_idx: BlockIndex = 0;
        let mut char_id = 0usize;

        loop {
            let block = match self.safe_block(block_idx) {
                Some(b) => b,
                None => return WalkResult::failure(),
            };
            let key = &prefix[char_id..];

            match find_child(&block, key) {
                Some((stored_len, entry, cost, suffix)) => {
                    char_id += key.len().min(stored_len);
                    if entry.is_leaf {
                        if key.len() > stored_len {
                            // The key wants to continue past a terminal leaf
                            // that has no child to descend into.
                            return WalkResult::failure();
                        }
                        return WalkResult {
                            success: true,
                            consumed: char_id,
                            extension: suffix,
                            cost,
                            reached_leaf: key.len() == stored_len,
                            continuation: None,
                        };
                    }
                    if !self.index_in_bounds(entry.child) {
                        tracing::warn!(child = entry.child, "corrupt child index during walk");
                        return WalkResult::failure();
                    }
                    block_idx = entry.child;
                    if char_id == prefix.len() {
                        let reached_leaf = self.has_sentinel(block_idx);
                        return WalkResult {
                            success: true,
                            consumed: char_id,
                            extension: suffix,
                            cost,
                            reached_leaf,
                            continuation: Some(block_idx),
                        };
                    }
                    // else continue the loop at the child block.
                }
                None => {
                    if block.next == 0 {
                        return WalkResult::failure();
                    }
                    if !self.index_in_bounds(block.next) {
                        tracing::warn!(sibling = block.next, "corrupt sibling index during walk");
                        return WalkResult::failure();
                    }
                    block_idx = block.next;
                }
            }
        }
    }

    /// §4.7: given the walker positioned at the end of a prior `walk_to`
    /// against this same array, greedily extends into the best-scoring child
    /// while the ambiguity stop condition allows it. Returns nothing if
    /// `from` failed, already reached a terminal leaf, or holds no
    /// continuation (e.g. it came from a different walker).
    pub fn walk_to_heuristic(&self, from: &WalkResult) -> Vec<u8> {
        let Some(mut block_idx) = (if from.success && !from.reached_leaf { from.continuation } else { None }) else {
            return Vec::new();
        };
        let mut entry_cost = from.cost;
        let mut out = Vec::new();

        loop {
            let block = match self.safe_block(block_idx) {
                Some(b) => b,
                None => break,
            };
            if block.len() == 0 {
                break;
            }
            let (best_node, best_entry, best_cost) = first_slot(&block);
            let total = total_score(&block, self.config.base_cost);
            let prev_score = (self.config.base_cost as i64) - (entry_cost as i64);
            let stop_score = prev_score - total as i64;
            let best_score = (self.config.base_cost as i64) - (best_cost as i64);

            if (stop_score as f64) * self.config.heuristic_factor > best_score as f64 {
                break;
            }

            out.extend_from_slice(best_node.as_bytes());
            entry_cost = best_cost;
            if best_entry.is_leaf {
                break;
            }
            if !self.index_in_bounds(best_entry.child) {
                tracing::warn!(child = best_entry.child, "corrupt child index during heuristic walk");
                break;
            }
            block_idx = best_entry.child;
        }
        out
    }

    /// `best_completion(prefix)` (§6): the exact match of `prefix` followed
    /// by the heuristic's best extension, or `None` if `prefix` itself does
    /// not occur in the trie.
    pub fn best_completion(&self, prefix: &[u8]) -> Option<Vec<u8>> {
        let exact = self.walk_to(prefix);
        if !exact.success {
            return None;
        }
        let mut out = prefix[..exact.consumed].to_vec();
        out.extend_from_slice(&exact.extension);
        out.extend(self.walk_to_heuristic(&exact));
        Some(out)
    }

    fn index_in_bounds(&self, idx: BlockIndex) -> bool {
        (idx as u64) < self.array.len()
    }

    fn safe_block(&self, idx: BlockIndex) -> Option<TrieBlock> {
        if !self.index_in_bounds(idx) {
            tracing::warn!(block = idx, "corrupt block index during walk");
            return None;
        }
        Some(self.array.get_volatile(idx as u64))
    }

    /// True if `block_idx` or any block reachable through its sibling chain
    /// holds a zero-length leaf sentinel (§4.8). Bounded by the chain length
    /// actually observed; a cycle is logged and treated as "no sentinel"
    /// rather than looping forever.
    fn has_sentinel(&self, block_idx: BlockIndex) -> bool {
        let mut cur = block_idx;
        let mut steps = 0u64;
        loop {
            let block = match self.safe_block(cur) {
                Some(b) => b,
                None => return false,
            };
            let found = match &block.group {
                Group::Tall(g) => (0..g.len()).any(|i| g.node(i).is_empty() && g.entry(i).is_leaf),
                Group::Wide(g) => (0..g.len()).any(|i| g.node(i).is_empty() && g.entry(i).is_leaf),
            };
            if found {
                return true;
            }
            if block.next == 0 {
                return false;
            }
            steps += 1;
            if steps > self.array.len() {
                tracing::warn!(block = cur, "sibling chain cycle detected while checking for leaf sentinel");
                return false;
            }
            cur = block.next;
        }
    }
}

/// `get_child(K)` (§4.6): the first non-sentinel edge matching `K` as a
/// prefix, plus its stored length, entry, cost, and the unconsumed suffix of
/// the stored string.
fn find_child(block: &TrieBlock, key: &[u8]) -> Option<(usize, NodeEntry, u16, Vec<u8>)> {
    match &block.group {
        Group::Tall(g) => g.find_matching_edge(key).map(|i| {
            let (node, entry, cost) = g.slot(i);
            let stored = node.as_bytes();
            let consumed = key.len().min(stored.len());
            (stored.len(), entry, cost, stored[consumed..].to_vec())
        }),
        Group::Wide(g) => g.find_matching_edge(key).map(|i| {
            let (node, entry, cost) = g.slot(i);
            let stored = node.as_bytes();
            let consumed = key.len().min(stored.len());
            (stored.len(), entry, cost, stored[consumed..].to_vec())
        }),
    }
}

/// The first (lowest-cost, since the group is kept sorted) occupied slot,
/// normalized to a 1-byte view so the heuristic loop can treat tall and wide
/// blocks uniformly — only the first character is ever appended per step in
/// a tall block anyway, since tall groups hold exactly one edge.
fn first_slot(block: &TrieBlock) -> (crate::inline_string::InlineString<1>, NodeEntry, u16) {
    match &block.group {
        Group::Tall(g) => {
            let (node, entry, cost) = g.slot(0);
            (node_to_single_byte(node), entry, cost)
        }
        Group::Wide(g) => {
            let (node, entry, cost) = g.slot(0);
            (*node, entry, cost)
        }
    }
}

fn node_to_single_byte<const S: usize>(node: &crate::inline_string::InlineString<S>) -> crate::inline_string::InlineString<1> {
    let bytes = node.as_bytes();
    crate::inline_string::InlineString::from_bytes(if bytes.is_empty() { b"" } else { &bytes[..1] })
}

fn total_score(block: &TrieBlock, base_cost: u16) -> u32 {
    match &block.group {
        Group::Tall(g) => g.total_score(base_cost),
        Group::Wide(g) => g.total_score(base_cost),
    }
}

//-------------------------------------------------------------------------


//-------------------------------------------------------------------------
