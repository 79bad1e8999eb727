use crate::block_array::BlockArray;
use crate::error::Result;
use crate::inline_string::InlineString;
use crate::trie::block::{NodeEntry, TallGroup, TrieBlock, WideGroup, WIDE_STRING_LEN};

//-------------------------------------------------------------------------

/// Promotes a full tall group to a wide one (§4.3): a tall block trades the
/// length of its one edge for fan-out. Short edges (`len <= WIDE_STRING_LEN`)
/// move across unchanged; long edges keep their first character in the wide
/// slot and spill the remainder into a freshly appended tall child.
///
/// Promotion is one-way — callers never convert a wide group back to tall.
pub fn promote_to_wide(array: &mut BlockArray<TrieBlock>, g: &TallGroup) -> Result<WideGroup> {
    let mut wide = WideGroup::empty();
    for i in 0..g.len() {
        let (node, entry, cost) = g.slot(i);
        let bytes = node.as_bytes();
        if bytes.len() <= WIDE_STRING_LEN {
            wide.set_slot(i, *node, entry, cost);
        } else {
            let suffix = TrieBlock::empty_tall();
            let mut suffix = suffix;
            if let crate::trie::block::Group::Tall(tg) = &mut suffix.group {
                tg.push(InlineString::from_bytes(&bytes[WIDE_STRING_LEN..]), entry, cost);
            }
            let child_idx = array.append(&suffix)?;
            tracing::debug!(block = child_idx, "tall->wide promotion spilled a long edge");
            wide.set_slot(
                i,
                InlineString::from_bytes(&bytes[..WIDE_STRING_LEN]),
                NodeEntry::internal(child_idx as u32),
                cost,
            );
        }
    }
    Ok(wide)
}

//-------------------------------------------------------------------------


//-------------------------------------------------------------------------
