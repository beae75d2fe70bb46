//! Greedy online block splitter.
//!
//! The splitter consumes one symbol at a time. Every `target_block_size`
//! symbols it closes the current block and decides, by comparing entropy
//! costs, whether the block
//!
//! - opens a new block type,
//! - rejoins the second most recent type (an A, B, A pattern), or
//! - extends the preceding block.
//!
//! Histograms are kept per (block type, context) in one flat array indexed
//! `type * num_contexts + context`. A splitter with one context is the plain
//! splitter used for commands and distances.

use tracing::trace;

use crate::block_split::{max_blocks, BlockSplit};
use crate::histogram::Histogram;
use crate::params::{MAX_NUMBER_OF_BLOCK_TYPES, MAX_STATIC_CONTEXTS, MERGE_MARGIN_BITS};

/// Greedy block splitter over `num_contexts` simultaneous contexts.
#[derive(Debug)]
pub struct ContextBlockSplitter<const N: usize> {
    alphabet_size: usize,
    num_contexts: usize,
    max_block_types: usize,
    min_block_size: usize,
    split_threshold: f64,

    split: BlockSplit,
    histograms: Vec<Histogram<N>>,

    target_block_size: usize,
    block_size: usize,
    curr_histogram_ix: usize,
    /// First histogram of the most recent and second most recent type.
    last_histogram_ix: [usize; 2],
    /// Per-context entropy of the last (`[..nc]`) and second-last
    /// (`[nc..2nc]`) type.
    last_entropy: [f64; 2 * MAX_STATIC_CONTEXTS],
    merge_last_count: usize,
}

impl<const N: usize> ContextBlockSplitter<N> {
    /// Create a splitter for `num_symbols` symbols.
    ///
    /// `alphabet_size` is the prefix of the alphabet scored for entropy.
    ///
    /// # Panics
    ///
    /// Panics unless `1 <= num_contexts <= 13` and `alphabet_size <= N`.
    pub fn new(
        alphabet_size: usize,
        num_contexts: usize,
        min_block_size: usize,
        split_threshold: f64,
        num_symbols: usize,
    ) -> Self {
        assert!(
            (1..=MAX_STATIC_CONTEXTS).contains(&num_contexts),
            "context count {} outside 1..={}",
            num_contexts,
            MAX_STATIC_CONTEXTS
        );
        assert!(alphabet_size <= N, "alphabet larger than histogram");

        let max_num_blocks = max_blocks(num_symbols, min_block_size);
        let max_num_types = max_num_blocks.min(MAX_NUMBER_OF_BLOCK_TYPES + 1);
        Self {
            alphabet_size,
            num_contexts,
            max_block_types: MAX_NUMBER_OF_BLOCK_TYPES / num_contexts,
            min_block_size,
            split_threshold,
            split: BlockSplit::with_capacity(max_num_blocks),
            histograms: vec![Histogram::new(); max_num_types * num_contexts],
            target_block_size: min_block_size,
            block_size: 0,
            curr_histogram_ix: 0,
            last_histogram_ix: [0, 0],
            last_entropy: [0.0; 2 * MAX_STATIC_CONTEXTS],
            merge_last_count: 0,
        }
    }

    /// Block types opened so far.
    #[inline]
    pub fn num_types(&self) -> usize {
        self.split.num_types
    }

    /// Count `symbol` under `context` in the current block.
    #[inline]
    pub fn add_symbol(&mut self, symbol: usize, context: usize) {
        self.histograms[self.curr_histogram_ix + context].add(symbol);
        self.block_size += 1;
        if self.block_size == self.target_block_size {
            self.finish_block(false);
        }
    }

    /// Close the last block and return the split with one histogram per
    /// (block type, context).
    pub fn finish(mut self) -> (BlockSplit, Vec<Histogram<N>>) {
        self.finish_block(true);
        (self.split, self.histograms)
    }

    fn entropy(&self, h: &Histogram<N>) -> f64 {
        h.bits_entropy(self.alphabet_size)
    }

    /// Make sure the histograms of the current type exist and are empty.
    fn clear_current(&mut self) {
        let end = self.curr_histogram_ix + self.num_contexts;
        if self.histograms.len() < end {
            self.histograms.resize(end, Histogram::new());
        }
        for h in &mut self.histograms[self.curr_histogram_ix..end] {
            h.clear();
        }
    }

    fn finish_block(&mut self, is_final: bool) {
        let nc = self.num_contexts;

        if self.split.num_blocks == 0 {
            if self.block_size > 0 {
                self.split.push(0, self.block_size as u32);
                for i in 0..nc {
                    let e = self.entropy(&self.histograms[i]);
                    self.last_entropy[i] = e;
                    self.last_entropy[nc + i] = e;
                }
                self.curr_histogram_ix += nc;
                self.clear_current();
                self.block_size = 0;
            }
            // The first block always has type 0, even when empty.
            self.split.num_types = 1;
        } else if self.block_size > 0 {
            self.decide_block();
        }

        if is_final {
            self.histograms.truncate(self.split.num_types * nc);
            self.split.types.truncate(self.split.num_blocks);
            self.split.lengths.truncate(self.split.num_blocks);
        }
    }

    fn decide_block(&mut self) {
        let nc = self.num_contexts;
        let curr = self.curr_histogram_ix;

        let mut entropy = [0.0; MAX_STATIC_CONTEXTS];
        let mut combined: Vec<Histogram<N>> = Vec::with_capacity(2 * nc);
        let mut combined_entropy = [0.0; 2 * MAX_STATIC_CONTEXTS];
        let mut diff = [0.0f64; 2];
        for j in 0..2 {
            for i in 0..nc {
                let mut h = self.histograms[curr + i].clone();
                h.add_histogram(&self.histograms[self.last_histogram_ix[j] + i]);
                combined_entropy[j * nc + i] = self.entropy(&h);
                combined.push(h);
            }
        }
        for i in 0..nc {
            entropy[i] = self.entropy(&self.histograms[curr + i]);
            for j in 0..2 {
                let jx = j * nc + i;
                diff[j] += combined_entropy[jx] - entropy[i] - self.last_entropy[jx];
            }
        }

        let nb = self.split.num_blocks;
        if self.split.num_types < self.max_block_types
            && diff[0] > self.split_threshold
            && diff[1] > self.split_threshold
        {
            let new_type = self.split.num_types;
            trace!(
                block = nb,
                block_type = new_type,
                size = self.block_size,
                diff_last = diff[0],
                diff_second_last = diff[1],
                "opening block type"
            );
            self.split.push(new_type as u8, self.block_size as u32);
            self.last_histogram_ix[1] = self.last_histogram_ix[0];
            self.last_histogram_ix[0] = new_type * nc;
            for i in 0..nc {
                self.last_entropy[nc + i] = self.last_entropy[i];
                self.last_entropy[i] = entropy[i];
            }
            self.split.num_types += 1;
            self.curr_histogram_ix += nc;
            self.clear_current();
            self.block_size = 0;
            self.merge_last_count = 0;
            self.target_block_size = self.min_block_size;
        } else if diff[1] < diff[0] - MERGE_MARGIN_BITS {
            let reused = self.split.types[nb - 2];
            trace!(
                block = nb,
                block_type = reused,
                size = self.block_size,
                "reusing second-last block type"
            );
            self.split.push(reused, self.block_size as u32);
            self.last_histogram_ix.swap(0, 1);
            let last = self.last_histogram_ix[0];
            for (i, h) in combined.drain(nc..).enumerate() {
                self.histograms[last + i] = h;
                self.last_entropy[nc + i] = self.last_entropy[i];
                self.last_entropy[i] = combined_entropy[nc + i];
            }
            self.clear_current();
            self.block_size = 0;
            self.merge_last_count = 0;
            self.target_block_size = self.min_block_size;
        } else {
            trace!(block = nb - 1, size = self.block_size, "extending previous block");
            self.split.lengths[nb - 1] += self.block_size as u32;
            let last = self.last_histogram_ix[0];
            for (i, h) in combined.drain(..nc).enumerate() {
                self.histograms[last + i] = h;
                self.last_entropy[i] = combined_entropy[i];
                if self.split.num_types == 1 {
                    self.last_entropy[nc + i] = self.last_entropy[i];
                }
            }
            self.clear_current();
            self.block_size = 0;
            self.merge_last_count += 1;
            if self.merge_last_count > 1 {
                self.target_block_size += self.min_block_size;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::HistogramLiteral;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn split_symbols(symbols: &[u8], min_block_size: usize) -> (BlockSplit, Vec<HistogramLiteral>) {
        let mut splitter =
            ContextBlockSplitter::<256>::new(256, 1, min_block_size, 400.0, symbols.len());
        for &s in symbols {
            splitter.add_symbol(s as usize, 0);
        }
        splitter.finish()
    }

    fn random_bytes(rng: &mut StdRng, n: usize) -> Vec<u8> {
        (0..n).map(|_| rng.gen()).collect()
    }

    #[test]
    fn test_short_stream_is_one_block() {
        let symbols = vec![3u8; 100];
        let (split, histograms) = split_symbols(&symbols, 512);
        assert_eq!(split.num_types(), 1);
        assert_eq!(split.blocks().collect::<Vec<_>>(), vec![(0, 100)]);
        assert_eq!(histograms.len(), 1);
        assert_eq!(histograms[0].total_count(), 100);
    }

    #[test]
    fn test_empty_stream() {
        let (split, histograms) = split_symbols(&[], 512);
        assert_eq!(split.num_types(), 1);
        assert_eq!(split.num_blocks(), 0);
        assert_eq!(histograms.len(), 1);
    }

    #[test]
    fn test_uniform_stream_merges() {
        let mut rng = StdRng::seed_from_u64(3);
        let symbols: Vec<u8> = (0..5000).map(|_| rng.gen_range(0..16u8)).collect();
        let (split, histograms) = split_symbols(&symbols, 512);
        assert_eq!(split.num_types(), 1);
        assert_eq!(split.total_length(), 5000);
        assert_eq!(histograms[0].total_count(), 5000);
    }

    #[test]
    fn test_statistics_change_opens_type() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut symbols = vec![0u8; 1000];
        symbols.extend(random_bytes(&mut rng, 1000));
        let (split, histograms) = split_symbols(&symbols, 512);

        assert_eq!(split.num_types(), 2);
        assert_eq!(split.total_length(), 2000);
        let mut start = 0;
        for (t, len) in split.blocks() {
            if t == 1 {
                assert!((512..=1536).contains(&start), "type 1 starts at {}", start);
                break;
            }
            start += len as usize;
        }
        let counted: usize = histograms.iter().map(|h| h.total_count()).sum();
        assert_eq!(counted, 2000);
    }

    #[test]
    fn test_alternating_pattern_reuses_types() {
        // Segment lengths line up with the block boundaries the splitter
        // picks: 512, 1024, 1536, 2560, then 1536 after each reset.
        let mut rng = StdRng::seed_from_u64(9);
        let mut symbols: Vec<u8> = (0..2560).map(|_| rng.gen_range(0..8u8)).collect();
        symbols.extend((0..3584).map(|_| rng.gen_range(200..=255u8)));
        symbols.extend((0..1536).map(|_| rng.gen_range(0..8u8)));

        let (split, histograms) = split_symbols(&symbols, 512);
        assert_eq!(split.num_types(), 2);
        assert_eq!(
            split.blocks().collect::<Vec<_>>(),
            vec![(0, 2560), (1, 3584), (0, 1536)]
        );
        assert_eq!(histograms[0].total_count(), 2560 + 1536);
        assert_eq!(histograms[1].total_count(), 3584);
    }

    #[test]
    fn test_deterministic() {
        let mut rng = StdRng::seed_from_u64(21);
        let symbols = random_bytes(&mut rng, 4000);
        let (a, _) = split_symbols(&symbols, 256);
        let (b, _) = split_symbols(&symbols, 256);
        assert_eq!(a, b);
    }

    #[test]
    fn test_contexts_fill_per_type_histograms() {
        let mut rng = StdRng::seed_from_u64(1);
        let n = 3000;
        let mut splitter = ContextBlockSplitter::<256>::new(256, 3, 512, 400.0, n);
        for i in 0..n {
            splitter.add_symbol(rng.gen_range(0..32usize), i % 3);
        }
        let (split, histograms) = splitter.finish();
        assert_eq!(histograms.len(), split.num_types() * 3);
        assert_eq!(split.total_length(), n);
        let counted: usize = histograms.iter().map(|h| h.total_count()).sum();
        assert_eq!(counted, n);
    }

    #[test]
    fn test_type_budget_exhausted() {
        // Every 64-symbol regime draws from its own group of 8 symbols, so
        // each block differs from the last two types until the budget runs
        // out and the remaining regimes are folded into existing types.
        const REGIME_LEN: usize = 64;
        const NUM_REGIMES: usize = 600;
        let n = REGIME_LEN * NUM_REGIMES;

        for num_contexts in [1usize, 2, 13] {
            let max_types = MAX_NUMBER_OF_BLOCK_TYPES / num_contexts;
            let mut splitter =
                ContextBlockSplitter::<256>::new(256, num_contexts, REGIME_LEN, 10.0, n);
            for r in 0..NUM_REGIMES {
                let base = 8 * (r % 32);
                for k in 0..REGIME_LEN {
                    splitter.add_symbol(base + k % 8, k % num_contexts);
                }
            }
            assert_eq!(splitter.num_types(), max_types);
            let (split, histograms) = splitter.finish();

            assert_eq!(split.num_types(), max_types, "contexts {}", num_contexts);
            assert_eq!(split.total_length(), n);
            assert!(split.types().iter().all(|&t| (t as usize) < max_types));
            let opened: Vec<u8> = split.types()[..max_types].to_vec();
            let expected: Vec<u8> = (0..max_types).map(|t| t as u8).collect();
            assert_eq!(opened, expected);
            assert!(split.lengths()[..max_types - 1]
                .iter()
                .all(|&l| l as usize == REGIME_LEN));

            assert_eq!(histograms.len(), max_types * num_contexts);
            let counted: usize = histograms.iter().map(|h| h.total_count()).sum();
            assert_eq!(counted, n);
        }
    }

    #[test]
    #[should_panic(expected = "context count")]
    fn test_too_many_contexts() {
        ContextBlockSplitter::<256>::new(256, 14, 512, 400.0, 100);
    }
}
