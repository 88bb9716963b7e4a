//! Compressed-block column: a sequence of (start, delta, length) runs
//! (spec.md §3 Column "Compressed-block" variant).

use crate::term::Term;

/// One arithmetic run: `length` values starting at `start` and advancing by
/// `delta` each step, using wrapping 64-bit arithmetic (spec.md §4.2:
/// "ordering is lexicographic with unsigned 64-bit comparisons").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunBlock {
    pub start: u64,
    pub delta: i64,
    pub len: usize,
}

impl RunBlock {
    fn value_at(&self, offset: usize) -> Term {
        let delta = self.delta.wrapping_mul(offset as i64);
        Term(self.start.wrapping_add(delta as u64))
    }
}

/// A column backed by concatenated [`RunBlock`]s, with a prefix-sum index
/// for O(log n) random access.
#[derive(Debug)]
pub struct CompressedBlocks {
    blocks: Vec<RunBlock>,
    /// `prefix[i]` = total length of `blocks[0..i]`; `prefix.len() == blocks.len() + 1`.
    prefix: Vec<usize>,
}

impl CompressedBlocks {
    #[must_use]
    pub fn new(blocks: Vec<RunBlock>) -> Self {
        let mut prefix = Vec::with_capacity(blocks.len() + 1);
        prefix.push(0);
        let mut total = 0;
        for b in &blocks {
            total += b.len;
            prefix.push(total);
        }
        CompressedBlocks { blocks, prefix }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        *self.prefix.last().unwrap_or(&0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Term {
        debug_assert!(i < self.len(), "index out of bounds for compressed column");
        // Find the rightmost block whose prefix start is <= i.
        let block_idx = match self.prefix.binary_search(&i) {
            Ok(exact) => exact.min(self.blocks.len() - 1),
            Err(insert_at) => insert_at - 1,
        };
        let offset = i - self.prefix[block_idx];
        self.blocks[block_idx].value_at(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_block_ascending() {
        let c = CompressedBlocks::new(vec![RunBlock {
            start: 10,
            delta: 2,
            len: 5,
        }]);
        let values: Vec<u64> = (0..c.len()).map(|i| c.get(i).0).collect();
        assert_eq!(values, vec![10, 12, 14, 16, 18]);
    }

    #[test]
    fn multiple_blocks_concatenate() {
        let c = CompressedBlocks::new(vec![
            RunBlock {
                start: 0,
                delta: 1,
                len: 3,
            },
            RunBlock {
                start: 100,
                delta: -1,
                len: 2,
            },
        ]);
        assert_eq!(c.len(), 5);
        let values: Vec<u64> = (0..c.len()).map(|i| c.get(i).0).collect();
        assert_eq!(values, vec![0, 1, 2, 100, 99]);
    }
}
