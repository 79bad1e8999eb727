use crate::block_array::BlockArray;
use crate::error::Result;
use crate::inline_string::InlineString;
use crate::trie::block::{BlockIndex, Group, NodeEntry, TrieBlock, WIDE_FANOUT};

//-------------------------------------------------------------------------

/// Sorts all edges across a block and its sibling chain by cost ascending,
/// with the recency tiebreak (`>=`, not `>`) from `NodeGroup::sort_in_place`.
///
/// Tall blocks never grow a sibling chain (a full tall block promotes to wide
/// rather than spilling, see `promote`), so the chain-walk below only ever
/// does real work for wide groups; a lone tall block just sorts its own
/// single-slot group in place.
pub fn sort_block_and_siblings(array: &mut BlockArray<TrieBlock>, block_idx: BlockIndex) -> Result<()> {
    let first = array.get(block_idx as u64);
    match first.group {
        Group::Tall(mut g) => {
            g.sort_in_place();
            array.set(block_idx as u64, &TrieBlock { next: first.next, group: Group::Tall(g) });
            Ok(())
        }
        Group::Wide(_) => sort_wide_chain(array, block_idx),
    }
}

fn chain_indices(array: &BlockArray<TrieBlock>, block_idx: BlockIndex) -> Result<Vec<BlockIndex>> {
    let mut indices = Vec::new();
    let mut cur = block_idx;
    loop {
        if indices.contains(&cur) {
            tracing::warn!(block = cur, "sibling chain cycle detected during sort");
            return Err(crate::error::TrieError::CorruptChildIndex {
                index: cur,
                len: array.len(),
            });
        }
        indices.push(cur);
        let b = array.get(cur as u64);
        if b.next == 0 {
            break;
        }
        cur = b.next;
    }
    Ok(indices)
}

/// The logical edge set of a wide sibling chain is the concatenation of every
/// block's slots; sort is defined over that whole sequence, then the sorted
/// triples are redistributed back into the chain's blocks `WIDE_FANOUT` at a
/// time. Child subtrees are untouched — only `{node, entry, cost}` move.
fn sort_wide_chain(array: &mut BlockArray<TrieBlock>, block_idx: BlockIndex) -> Result<()> {
    let indices = chain_indices(array, block_idx)?;

    let mut slots: Vec<(InlineString<1>, NodeEntry, u16)> = Vec::new();
    for &idx in &indices {
        let b = array.get(idx as u64);
        if let Group::Wide(g) = &b.group {
            for i in 0..g.len() {
                let (node, entry, cost) = g.slot(i);
                slots.push((*node, entry, cost));
            }
        }
    }

    sort_with_recency_tiebreak(&mut slots);

    let mut drained = slots.into_iter();
    for &idx in &indices {
        let mut b = array.get(idx as u64);
        if let Group::Wide(g) = &mut b.group {
            let mut fresh = crate::trie::block::WideGroup::empty();
            for slot_idx in 0..WIDE_FANOUT {
                match drained.next() {
                    Some((node, entry, cost)) => fresh.set_slot(slot_idx, node, entry, cost),
                    None => break,
                }
            }
            *g = fresh;
        }
        array.set(idx as u64, &b);
    }
    Ok(())
}

/// Same ordering as `NodeGroup::sort_in_place` (ascending cost, ties broken
/// toward later position), applied across the whole sibling-chain sequence
/// rather than one block's fixed-size arrays. See that function's doc
/// comment for why a literal `>=`-swap bubble sort can cycle forever on a
/// three-way tie instead of a plain stable sort over `(cost, Reverse(index))`.
fn sort_with_recency_tiebreak<const S: usize>(slots: &mut [(InlineString<S>, NodeEntry, u16)]) {
    let n = slots.len();
    if n < 2 {
        return;
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| slots[a].2.cmp(&slots[b].2).then(b.cmp(&a)));
    let original = slots.to_vec();
    for (dst, &src) in order.iter().enumerate() {
        slots[dst] = original[src];
    }
}

//-------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::trie::block::{TallGroup, WideGroup};
    use std::sync::atomic::AtomicU64;

    fn mk_array(capacity: u64) -> (Vec<u8>, AtomicU64) {
        (vec![0u8; capacity as usize * TrieBlock::RECORD_SIZE], AtomicU64::new(0))
    }

    #[test]
    fn sorts_single_tall_block_trivially() {
        let (mut data, len) = mk_array(1);
        let mut arr: BlockArray<TrieBlock> = BlockArray::new(&mut data, &len, 1);
        let mut tg = TallGroup::empty();
        tg.push(InlineString::from_bytes(b"x"), NodeEntry::leaf(), 5);
        arr.append(&TrieBlock { next: 0, group: Group::Tall(tg) }).unwrap();
        sort_block_and_siblings(&mut arr, 0).unwrap();
        let b = arr.get(0);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn sorts_across_sibling_chain() {
        let (mut data, len) = mk_array(2);
        let mut arr: BlockArray<TrieBlock> = BlockArray::new(&mut data, &len, 2);
        let mut g0 = WideGroup::empty();
        g0.push(InlineString::from_bytes(b"a"), NodeEntry::leaf(), 100);
        arr.append(&TrieBlock { next: 1, group: Group::Wide(g0) }).unwrap();
        let mut g1 = WideGroup::empty();
        g1.push(InlineString::from_bytes(b"b"), NodeEntry::leaf(), 1);
        arr.append(&TrieBlock { next: 0, group: Group::Wide(g1) }).unwrap();

        sort_block_and_siblings(&mut arr, 0).unwrap();

        let b0 = arr.get(0);
        if let Group::Wide(g) = &b0.group {
            assert_eq!(g.node(0).as_bytes(), b"b");
            assert_eq!(g.cost(0), 1);
        } else {
            panic!("expected wide group");
        }
    }

    #[test]
    fn detects_a_genuine_two_block_cycle() {
        let (mut data, len) = mk_array(2);
        let mut arr: BlockArray<TrieBlock> = BlockArray::new(&mut data, &len, 2);
        arr.append(&TrieBlock { next: 1, group: Group::Wide(WideGroup::empty()) }).unwrap();
        // next == 0 means "no sibling", so looping back to index 0 would just
        // terminate the chain cleanly. Point block 1 back at itself instead,
        // which the walk visits a second time without ever landing on 0.
        arr.append(&TrieBlock { next: 1, group: Group::Wide(WideGroup::empty()) }).unwrap();
        let err = sort_block_and_siblings(&mut arr, 0).unwrap_err();
        assert!(matches!(err, crate::error::TrieError::CorruptChildIndex { .. }));
    }

    #[test]
    fn detects_cycle() {
        let (mut data, len) = mk_array(1);
        let mut arr: BlockArray<TrieBlock> = BlockArray::new(&mut data, &len, 1);
        arr.append(&TrieBlock { next: 0, group: Group::Wide(WideGroup::empty()) }).unwrap();
        // Point the single block's sibling link at itself.
        let mut b = arr.get(0);
        b.next = 0; // a self-pointing chain at index 0 is not itself a cycle
        arr.set(0, &b);
        // With only one block, next == 0 terminates the chain cleanly; the
        // real cycle case requires at least two blocks pointing at each other
        // (exercised at the Trie level in trie/tests.rs).
        assert!(sort_block_and_siblings(&mut arr, 0).is_ok());
    }
}

//-------------------------------------------------------------------------
