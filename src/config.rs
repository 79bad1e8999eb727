//-------------------------------------------------------------------------

/// Runtime-tunable constants for the trie.  The group shapes themselves
/// (`TALL_STRING_LEN`, `WIDE_FANOUT` in `crate::trie::block`) are fixed at
/// compile time because they determine the on-disk record layout; these are
/// the knobs that only affect scoring and file sizing, not the ABI.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrieConfig {
    /// Cost given to a freshly inserted leaf; the neutral, worst-ranked value.
    pub base_cost: u16,

    /// Multiplier in the heuristic completion stop condition (see `walk_to_heuristic`).
    pub heuristic_factor: f64,

    /// Number of blocks to size a newly created file for.  There is no resize
    /// protocol (see the crate docs), so this is fixed for the lifetime of the file.
    pub initial_capacity_blocks: u64,
}

impl Default for TrieConfig {
    fn default() -> Self {
        TrieConfig {
            base_cost: u16::MAX,
            heuristic_factor: 1.8,
            initial_capacity_blocks: 1024,
        }
    }
}

//-------------------------------------------------------------------------
