use byteorder::{ByteOrder, LittleEndian};

use crate::block_array::BlockRecord;
use crate::inline_string::InlineString;

//-------------------------------------------------------------------------

/// Max inline string length in a tall `NodeGroup`'s single edge slot.
pub const TALL_STRING_LEN: usize = 22;
/// Number of edge slots in a wide `NodeGroup`.
pub const WIDE_FANOUT: usize = 8;
/// Max inline string length in a wide `NodeGroup`'s edge slots.
pub const WIDE_STRING_LEN: usize = 1;

const HEADER_BYTES: usize = 4;
const TALL_ENTRY_BYTES: usize = TALL_STRING_LEN + 4 + 2;
const WIDE_ENTRY_BYTES: usize = WIDE_FANOUT * (WIDE_STRING_LEN + 4 + 2);
const GROUP_BYTES: usize = if TALL_ENTRY_BYTES > WIDE_ENTRY_BYTES {
    TALL_ENTRY_BYTES
} else {
    WIDE_ENTRY_BYTES
};

/// A block index.  0 always denotes "no sibling" / "the root".
pub type BlockIndex = u32;

//-------------------------------------------------------------------------

/// `{ child_or_leaf: u30, exists: bool, is_leaf: bool }`, packed into 32 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct NodeEntry {
    pub exists: bool,
    pub is_leaf: bool,
    /// Meaningful only when `exists && !is_leaf`: the index of the block
    /// holding the continuation of this edge.
    pub child: BlockIndex,
}

const EXISTS_BIT: u32 = 1 << 31;
const LEAF_BIT: u32 = 1 << 30;
const CHILD_MASK: u32 = (1 << 30) - 1;

/// Top bit of the block header word discriminates tall (0) from wide (1);
/// the remaining 31 bits hold the sibling `next` index.
const WIDE_BIT: u32 = 1 << 31;
const NEXT_MASK: u32 = WIDE_BIT - 1;

impl NodeEntry {
    pub const EMPTY: NodeEntry = NodeEntry {
        exists: false,
        is_leaf: false,
        child: 0,
    };

    pub fn leaf() -> Self {
        NodeEntry {
            exists: true,
            is_leaf: true,
            child: 0,
        }
    }

    pub fn internal(child: BlockIndex) -> Self {
        assert!(child & !CHILD_MASK == 0, "child index exceeds 30 bits");
        NodeEntry {
            exists: true,
            is_leaf: false,
            child,
        }
    }

    fn pack(self) -> u32 {
        if !self.exists {
            return 0;
        }
        let mut bits = EXISTS_BIT;
        if self.is_leaf {
            bits |= LEAF_BIT;
        } else {
            bits |= self.child & CHILD_MASK;
        }
        bits
    }

    fn unpack(bits: u32) -> Self {
        if bits & EXISTS_BIT == 0 {
            return NodeEntry::EMPTY;
        }
        let is_leaf = bits & LEAF_BIT != 0;
        NodeEntry {
            exists: true,
            is_leaf,
            child: if is_leaf { 0 } else { bits & CHILD_MASK },
        }
    }
}

//-------------------------------------------------------------------------

/// Edge table inside a block: `C` parallel slots of child strings,
/// pointer/leaf flags and recency costs.  Used slots are a contiguous prefix
/// (invariant I5); slots beyond the occupied prefix read back as
/// `NodeEntry::EMPTY` with an empty string and cost 0.
#[derive(Clone, Copy)]
pub struct NodeGroup<const S: usize, const C: usize> {
    nodes: [InlineString<S>; C],
    entries: [NodeEntry; C],
    costs: [u16; C],
}

impl<const S: usize, const C: usize> NodeGroup<S, C> {
    pub fn empty() -> Self {
        NodeGroup {
            nodes: [InlineString::empty(); C],
            entries: [NodeEntry::EMPTY; C],
            costs: [0; C],
        }
    }

    pub fn capacity(&self) -> usize {
        C
    }

    /// Number of occupied slots (I5: a contiguous prefix of `exists` slots).
    pub fn len(&self) -> usize {
        self.entries.iter().take_while(|e| e.exists).count()
    }

    pub fn is_full(&self) -> bool {
        self.len() == C
    }

    pub fn slot(&self, i: usize) -> (&InlineString<S>, NodeEntry, u16) {
        (&self.nodes[i], self.entries[i], self.costs[i])
    }

    pub fn cost(&self, i: usize) -> u16 {
        self.costs[i]
    }

    pub fn entry(&self, i: usize) -> NodeEntry {
        self.entries[i]
    }

    pub fn node(&self, i: usize) -> &InlineString<S> {
        &self.nodes[i]
    }

    pub fn set_cost(&mut self, i: usize, cost: u16) {
        self.costs[i] = cost;
    }

    pub fn set_slot(&mut self, i: usize, node: InlineString<S>, entry: NodeEntry, cost: u16) {
        self.nodes[i] = node;
        self.entries[i] = entry;
        self.costs[i] = cost;
    }

    /// Finds the first occupied slot whose common prefix with `key` is
    /// non-zero (used by insertion step 1).
    pub fn find_sharing_prefix(&self, key: &[u8]) -> Option<(usize, usize)> {
        for i in 0..self.len() {
            let l = self.nodes[i].common_prefix_len(key);
            if l > 0 {
                return Some((i, l));
            }
        }
        None
    }

    /// Finds the first occupied slot whose stored string is a non-empty
    /// prefix-match of `key` (used by the walker; zero-length edges are
    /// leaf-beneath-node sentinels and must never match here, invariant I9).
    pub fn find_matching_edge(&self, key: &[u8]) -> Option<usize> {
        for i in 0..self.len() {
            if self.nodes[i].len() > 0 && self.nodes[i].matches(key) {
                return Some(i);
            }
        }
        None
    }

    /// Appends a new slot at the end of the occupied prefix.  Caller must
    /// have checked `!is_full()`.
    pub fn push(&mut self, node: InlineString<S>, entry: NodeEntry, cost: u16) -> usize {
        let idx = self.len();
        self.set_slot(idx, node, entry, cost);
        idx
    }

    /// Sum of `base_cost - cost` over occupied slots (used by the completion
    /// heuristic's `total_score`).
    pub fn total_score(&self, base_cost: u16) -> u32 {
        (0..self.len())
            .map(|i| crate::trie::cost::score(base_cost, self.costs[i]))
            .sum()
    }

    /// Sorts the occupied slots by cost ascending, with ties broken toward
    /// the later position (the `>=`, not `>`, swap predicate from the spec) so
    /// the most recently touched edge floats to the front.
    ///
    /// A literal bubble sort using a `>=` swap predicate does not actually
    /// terminate in general: three or more slots tied on cost can cycle
    /// between two orderings forever (costs `[100, 50, 100]` oscillates pass
    /// after pass, since the tied pair keeps leapfrogging each other once the
    /// lower-cost slot has bubbled past). Sorting by `(cost, Reverse(original
    /// position))` gives the same ascending-cost, later-position-wins order
    /// with a sort that's guaranteed to halt.
    pub fn sort_in_place(&mut self) {
        let n = self.len();
        if n < 2 {
            return;
        }
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| self.costs[a].cmp(&self.costs[b]).then(b.cmp(&a)));

        let nodes = self.nodes;
        let entries = self.entries;
        let costs = self.costs;
        for (dst, &src) in order.iter().enumerate() {
            self.nodes[dst] = nodes[src];
            self.entries[dst] = entries[src];
            self.costs[dst] = costs[src];
        }
    }

    fn read_from(bytes: &[u8]) -> Self {
        let mut g = NodeGroup::empty();
        for i in 0..C {
            let base = i * (S + 4 + 2);
            let mut raw = [0u8; S];
            raw.copy_from_slice(&bytes[base..base + S]);
            g.nodes[i] = InlineString::from_raw(raw);
            let bits = LittleEndian::read_u32(&bytes[base + S..base + S + 4]);
            g.entries[i] = NodeEntry::unpack(bits);
            g.costs[i] = LittleEndian::read_u16(&bytes[base + S + 4..base + S + 6]);
        }
        g
    }

    fn write_to(&self, bytes: &mut [u8]) {
        for i in 0..C {
            let base = i * (S + 4 + 2);
            bytes[base..base + S].copy_from_slice(self.nodes[i].as_raw());
            LittleEndian::write_u32(&mut bytes[base + S..base + S + 4], self.entries[i].pack());
            LittleEndian::write_u16(&mut bytes[base + S + 4..base + S + 6], self.costs[i]);
        }
    }
}

pub type TallGroup = NodeGroup<TALL_STRING_LEN, 1>;
pub type WideGroup = NodeGroup<WIDE_STRING_LEN, WIDE_FANOUT>;

//-------------------------------------------------------------------------

/// The tagged-union block record: either a tall group (one long edge) or a
/// wide group (up to `WIDE_FANOUT` single-character edges), plus a sibling
/// link.  Exactly one group shape is active, discriminated by `wide`; the
/// on-disk record reserves `GROUP_BYTES` regardless of which is active so
/// every `TrieBlock` occupies the same fixed width (`RECORD_SIZE`).
#[derive(Clone, Copy)]
pub enum Group {
    Tall(TallGroup),
    Wide(WideGroup),
}

#[derive(Clone, Copy)]
pub struct TrieBlock {
    pub next: BlockIndex,
    pub group: Group,
}

impl TrieBlock {
    pub fn empty_tall() -> Self {
        TrieBlock {
            next: 0,
            group: Group::Tall(TallGroup::empty()),
        }
    }

    pub fn empty_wide() -> Self {
        TrieBlock {
            next: 0,
            group: Group::Wide(WideGroup::empty()),
        }
    }

    pub fn is_wide(&self) -> bool {
        matches!(self.group, Group::Wide(_))
    }

    pub fn len(&self) -> usize {
        match &self.group {
            Group::Tall(g) => g.len(),
            Group::Wide(g) => g.len(),
        }
    }

    pub fn is_full(&self) -> bool {
        match &self.group {
            Group::Tall(g) => g.is_full(),
            Group::Wide(g) => g.is_full(),
        }
    }
}

impl BlockRecord for TrieBlock {
    const RECORD_SIZE: usize = HEADER_BYTES + GROUP_BYTES;

    fn read_from(bytes: &[u8]) -> Self {
        let next_and_wide = LittleEndian::read_u32(&bytes[0..4]);
        let wide = next_and_wide & WIDE_BIT != 0;
        let next = next_and_wide & NEXT_MASK;
        let group_bytes = &bytes[HEADER_BYTES..HEADER_BYTES + GROUP_BYTES];
        let group = if wide {
            Group::Wide(WideGroup::read_from(group_bytes))
        } else {
            Group::Tall(TallGroup::read_from(group_bytes))
        };
        TrieBlock { next, group }
    }

    fn write_to(&self, bytes: &mut [u8]) {
        let mut next_and_wide = self.next & NEXT_MASK;
        if self.is_wide() {
            next_and_wide |= WIDE_BIT;
        }
        LittleEndian::write_u32(&mut bytes[0..4], next_and_wide);
        let group_bytes = &mut bytes[HEADER_BYTES..HEADER_BYTES + GROUP_BYTES];
        group_bytes.fill(0);
        match &self.group {
            Group::Tall(g) => g.write_to(group_bytes),
            Group::Wide(g) => g.write_to(group_bytes),
        }
    }
}

//-------------------------------------------------------------------------


//-------------------------------------------------------------------------
