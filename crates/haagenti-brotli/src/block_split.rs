//! Block splits and the coarse-to-fine splitter.
//!
//! A [`BlockSplit`] is a run-length encoding of block-type assignments for
//! one symbol category. This module also extracts the flat symbol arrays the
//! splitters work on from a command stream, and implements the iterative
//! splitter used by the high-effort metablock path:
//!
//! 1. Seed a handful of histograms from strided samples of the input.
//! 2. Refine them with random samples.
//! 3. Repeatedly assign every symbol to the cheapest histogram with a
//!    switch penalty (dynamic programming with traceback), then rebuild
//!    the histograms from the assignment.
//! 4. Cluster the resulting blocks down to at most 256 block types.

use tracing::debug;

use crate::cluster::{histogram_bit_cost_distance, histogram_combine};
use crate::command::{Command, DISTANCE_SYMBOL_MASK};
use crate::entropy::fast_log2;
use crate::histogram::Histogram;
use crate::params::{
    BlockCategory, EncoderParams, MAX_NUMBER_OF_BLOCK_TYPES, NUM_COMMAND_SYMBOLS,
    NUM_DISTANCE_SYMBOLS, NUM_LITERAL_SYMBOLS,
};

/// Inputs shorter than this are never split.
const MIN_LENGTH_FOR_BLOCK_SPLITTING: usize = 128;

/// Refinement samples per stride of input.
const ITER_MUL_FOR_REFINING: usize = 2;

/// Minimum number of refinement samples.
const MIN_ITERS_FOR_REFINING: usize = 100;

/// Blocks clustered together in the first clustering stage.
const HISTOGRAMS_PER_BATCH: usize = 64;

/// Expected clusters surviving one batch.
const CLUSTERS_PER_BATCH: usize = 16;

/// Run-length encoded block-type assignment for one symbol category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSplit {
    pub(crate) num_types: usize,
    pub(crate) num_blocks: usize,
    pub(crate) types: Vec<u8>,
    pub(crate) lengths: Vec<u32>,
}

impl BlockSplit {
    /// Create an empty split.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty split with room for `max_blocks` blocks.
    pub fn with_capacity(max_blocks: usize) -> Self {
        Self {
            num_types: 0,
            num_blocks: 0,
            types: Vec::with_capacity(max_blocks),
            lengths: Vec::with_capacity(max_blocks),
        }
    }

    /// Build a split from explicit blocks.
    ///
    /// # Panics
    ///
    /// Panics if the arrays differ in length or a type is out of range.
    pub fn from_parts(num_types: usize, types: Vec<u8>, lengths: Vec<u32>) -> Self {
        assert_eq!(types.len(), lengths.len(), "types and lengths must be parallel");
        assert!(
            types.iter().all(|&t| (t as usize) < num_types),
            "block type out of range"
        );
        Self {
            num_types,
            num_blocks: types.len(),
            types,
            lengths,
        }
    }

    /// Reset to the empty split and release storage.
    pub fn clear(&mut self) {
        self.num_types = 0;
        self.num_blocks = 0;
        self.types = Vec::new();
        self.lengths = Vec::new();
    }

    /// Number of distinct block types.
    #[inline]
    pub fn num_types(&self) -> usize {
        self.num_types
    }

    /// Number of blocks.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Type of each block.
    #[inline]
    pub fn types(&self) -> &[u8] {
        &self.types[..self.num_blocks]
    }

    /// Length of each block in symbols.
    #[inline]
    pub fn lengths(&self) -> &[u32] {
        &self.lengths[..self.num_blocks]
    }

    /// Total number of symbols covered.
    pub fn total_length(&self) -> usize {
        self.lengths().iter().map(|&l| l as usize).sum()
    }

    /// Iterate `(type, length)` pairs.
    pub fn blocks(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.types().iter().copied().zip(self.lengths().iter().copied())
    }

    /// Append a block without checking the type budget.
    #[inline]
    pub(crate) fn push(&mut self, block_type: u8, length: u32) {
        self.types.push(block_type);
        self.lengths.push(length);
        self.num_blocks += 1;
    }
}

/// Upper bound on the blocks a greedy splitter emits.
#[inline]
pub fn max_blocks(num_symbols: usize, min_block_size: usize) -> usize {
    num_symbols / min_block_size + 1
}

/// A read position inside the circular source buffer.
#[derive(Debug, Clone, Copy)]
pub struct SourceWindow<'a> {
    /// Ring buffer holding at least `mask + 1` bytes.
    pub data: &'a [u8],
    /// Position of the first literal of the metablock.
    pub pos: usize,
    /// Ring buffer mask (size minus one, size a power of two).
    pub mask: usize,
    /// Byte preceding `pos`.
    pub prev_byte: u8,
    /// Byte preceding `prev_byte`.
    pub prev_byte2: u8,
}

impl<'a> SourceWindow<'a> {
    /// Window at the start of a stream; the preceding bytes read as zero.
    pub fn new(data: &'a [u8], pos: usize, mask: usize) -> Self {
        Self {
            data,
            pos,
            mask,
            prev_byte: 0,
            prev_byte2: 0,
        }
    }

    /// Set the two bytes preceding the window.
    pub fn with_prev_bytes(mut self, prev_byte: u8, prev_byte2: u8) -> Self {
        self.prev_byte = prev_byte;
        self.prev_byte2 = prev_byte2;
        self
    }

    /// Byte at an absolute stream position.
    #[inline(always)]
    pub fn byte_at(&self, pos: usize) -> u8 {
        self.data[pos & self.mask]
    }
}

/// Total number of literals in a command stream.
pub fn count_literals(cmds: &[Command]) -> usize {
    cmds.iter().map(|c| c.insert_len as usize).sum()
}

/// Copy every literal run out of the ring buffer into `out`.
///
/// The read cursor starts at `offset` and advances past each insert run
/// and its copy.
pub fn copy_literals_to_array(
    cmds: &[Command],
    data: &[u8],
    offset: usize,
    mask: usize,
    out: &mut Vec<u8>,
) {
    let mut from_pos = offset & mask;
    for cmd in cmds {
        let mut insert_len = cmd.insert_len as usize;
        while from_pos + insert_len > mask {
            let head_size = mask + 1 - from_pos;
            out.extend_from_slice(&data[from_pos..from_pos + head_size]);
            from_pos = 0;
            insert_len -= head_size;
        }
        if insert_len > 0 {
            out.extend_from_slice(&data[from_pos..from_pos + insert_len]);
        }
        from_pos = (from_pos + insert_len + cmd.copy_len() as usize) & mask;
    }
}

/// Command prefix of every command.
pub fn extract_command_prefixes(cmds: &[Command]) -> Vec<u16> {
    cmds.iter().map(|c| c.cmd_prefix).collect()
}

/// Distance symbol of every command with an explicit distance.
pub fn extract_distance_prefixes(cmds: &[Command]) -> Vec<u16> {
    cmds.iter()
        .filter(|c| c.has_distance())
        .map(|c| c.dist_prefix & DISTANCE_SYMBOL_MASK)
        .collect()
}

/// Park-Miller generator shared by sampling and refinement.
#[inline]
fn my_rand(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(16807);
    *seed
}

/// Cost of a symbol with `count` occurrences, relative to the total.
#[inline]
fn bit_cost(count: u32) -> f64 {
    if count == 0 { -2.0 } else { fast_log2(count as usize) }
}

fn initial_entropy_codes<T: Copy + Into<usize>, const N: usize>(
    data: &[T],
    stride: usize,
    histograms: &mut [Histogram<N>],
) {
    let length = data.len();
    let num_histograms = histograms.len();
    let mut seed = 7u32;
    let block_length = length / num_histograms;
    for (i, h) in histograms.iter_mut().enumerate() {
        h.clear();
        let mut pos = length * i / num_histograms;
        if i != 0 {
            pos += my_rand(&mut seed) as usize % block_length;
        }
        if pos + stride >= length {
            pos = length - stride - 1;
        }
        h.add_vector(&data[pos..pos + stride]);
    }
}

fn random_sample<T: Copy + Into<usize>, const N: usize>(
    seed: &mut u32,
    data: &[T],
    stride: usize,
    sample: &mut Histogram<N>,
) {
    let length = data.len();
    let (pos, stride) = if stride >= length {
        (0, length)
    } else {
        (my_rand(seed) as usize % (length - stride + 1), stride)
    };
    sample.add_vector(&data[pos..pos + stride]);
}

fn refine_entropy_codes<T: Copy + Into<usize>, const N: usize>(
    data: &[T],
    stride: usize,
    histograms: &mut [Histogram<N>],
) {
    let num_histograms = histograms.len();
    let iters = ITER_MUL_FOR_REFINING * data.len() / stride + MIN_ITERS_FOR_REFINING;
    let iters = iters.div_ceil(num_histograms) * num_histograms;
    let mut seed = 7u32;
    let mut sample = Histogram::<N>::new();
    for iter in 0..iters {
        sample.clear();
        random_sample(&mut seed, data, stride, &mut sample);
        histograms[iter % num_histograms].add_histogram(&sample);
    }
}

/// Assign every symbol to a histogram, paying `block_switch_cost` bits for
/// each change. Returns the number of blocks.
fn find_blocks<T: Copy + Into<usize>, const N: usize>(
    data: &[T],
    block_switch_cost: f64,
    histograms: &[Histogram<N>],
    block_ids: &mut [u8],
) -> usize {
    let length = data.len();
    let num_histograms = histograms.len();
    if num_histograms <= 1 {
        block_ids.fill(0);
        return 1;
    }

    // insert_cost[symbol * num_histograms + k]: bits to code `symbol` with
    // histogram k.
    let mut insert_cost = vec![0.0f64; N * num_histograms];
    for symbol in 0..N {
        for (k, h) in histograms.iter().enumerate() {
            insert_cost[symbol * num_histograms + k] =
                fast_log2(h.total_count()) - bit_cost(h.data()[symbol]);
        }
    }

    let bitmap_len = num_histograms.div_ceil(8);
    let mut cost = vec![0.0f64; num_histograms];
    let mut switch_signal = vec![0u8; length * bitmap_len];

    for (byte_ix, &symbol) in data.iter().enumerate() {
        let ix = byte_ix * bitmap_len;
        let insert_cost_ix = symbol.into() * num_histograms;
        let mut min_cost = 1e99;
        for k in 0..num_histograms {
            cost[k] += insert_cost[insert_cost_ix + k];
            if cost[k] < min_cost {
                min_cost = cost[k];
                block_ids[byte_ix] = k as u8;
            }
        }
        // Switching is cheaper near the start of the data.
        let mut switch_cost = block_switch_cost;
        if byte_ix < 2000 {
            switch_cost *= 0.77 + 0.07 * byte_ix as f64 / 2000.0;
        }
        for (k, c) in cost.iter_mut().enumerate() {
            *c -= min_cost;
            if *c >= switch_cost {
                *c = switch_cost;
                switch_signal[ix + (k >> 3)] |= 1 << (k & 7);
            }
        }
    }

    // Trace back from the end, switching only where the signal says the
    // current histogram was not worth keeping.
    let mut num_blocks = 1;
    let mut byte_ix = length - 1;
    let mut ix = byte_ix * bitmap_len;
    let mut cur_id = block_ids[byte_ix];
    while byte_ix > 0 {
        let mask = 1u8 << (cur_id & 7);
        byte_ix -= 1;
        ix -= bitmap_len;
        if switch_signal[ix + (cur_id >> 3) as usize] & mask != 0 && cur_id != block_ids[byte_ix] {
            cur_id = block_ids[byte_ix];
            num_blocks += 1;
        }
        block_ids[byte_ix] = cur_id;
    }
    num_blocks
}

/// Renumber block ids densely in order of first use. Returns the id count.
fn remap_block_ids(block_ids: &mut [u8], num_histograms: usize) -> usize {
    const INVALID_ID: u16 = 256;
    let mut new_id = vec![INVALID_ID; num_histograms];
    let mut next_id = 0u16;
    for &id in block_ids.iter() {
        if new_id[id as usize] == INVALID_ID {
            new_id[id as usize] = next_id;
            next_id += 1;
        }
    }
    for id in block_ids.iter_mut() {
        *id = new_id[*id as usize] as u8;
    }
    next_id as usize
}

fn build_block_histograms<T: Copy + Into<usize>, const N: usize>(
    data: &[T],
    block_ids: &[u8],
    histograms: &mut [Histogram<N>],
) {
    for h in histograms.iter_mut() {
        h.clear();
    }
    for (&symbol, &id) in data.iter().zip(block_ids) {
        histograms[id as usize].add(symbol.into());
    }
}

/// Merge blocks with similar statistics into at most 256 block types.
fn cluster_blocks<T: Copy + Into<usize>, const N: usize>(
    data: &[T],
    num_blocks: usize,
    block_ids: &[u8],
) -> BlockSplit {
    let mut block_lengths = vec![0u32; num_blocks];
    let mut block_idx = 0;
    for i in 0..data.len() {
        block_lengths[block_idx] += 1;
        if i + 1 == data.len() || block_ids[i] != block_ids[i + 1] {
            block_idx += 1;
        }
    }

    let expected_num_clusters = CLUSTERS_PER_BATCH * num_blocks.div_ceil(HISTOGRAMS_PER_BATCH);
    let mut all_histograms: Vec<Histogram<N>> = Vec::with_capacity(expected_num_clusters);
    let mut cluster_size: Vec<u32> = Vec::with_capacity(expected_num_clusters);
    let mut histogram_symbols = vec![0u32; num_blocks];
    let mut histograms: Vec<Histogram<N>> =
        vec![Histogram::new(); num_blocks.min(HISTOGRAMS_PER_BATCH)];
    let batch_pairs = HISTOGRAMS_PER_BATCH * HISTOGRAMS_PER_BATCH / 2;
    let mut pairs = Vec::with_capacity(batch_pairs + 1);

    let mut sizes = [0u32; HISTOGRAMS_PER_BATCH];
    let mut new_clusters = [0u32; HISTOGRAMS_PER_BATCH];
    let mut symbols = [0u32; HISTOGRAMS_PER_BATCH];
    let mut remap = [0u32; HISTOGRAMS_PER_BATCH];

    let mut pos = 0;
    let mut num_clusters = 0;
    for i in (0..num_blocks).step_by(HISTOGRAMS_PER_BATCH) {
        let num_to_combine = (num_blocks - i).min(HISTOGRAMS_PER_BATCH);
        for j in 0..num_to_combine {
            let block_length = block_lengths[i + j] as usize;
            let h = &mut histograms[j];
            h.clear();
            h.add_vector(&data[pos..pos + block_length]);
            pos += block_length;
            h.bit_cost = h.population_cost();
            new_clusters[j] = j as u32;
            symbols[j] = j as u32;
            sizes[j] = 1;
        }
        let num_new_clusters = histogram_combine(
            &mut histograms,
            &mut sizes,
            &mut symbols[..num_to_combine],
            &mut new_clusters,
            &mut pairs,
            num_to_combine,
            HISTOGRAMS_PER_BATCH,
            batch_pairs,
        );
        for (j, &c) in new_clusters[..num_new_clusters].iter().enumerate() {
            all_histograms.push(histograms[c as usize].clone());
            cluster_size.push(sizes[c as usize]);
            remap[c as usize] = j as u32;
        }
        for j in 0..num_to_combine {
            histogram_symbols[i + j] = (num_clusters + remap[symbols[j] as usize] as usize) as u32;
        }
        num_clusters += num_new_clusters;
    }
    drop(histograms);

    let max_num_pairs =
        (HISTOGRAMS_PER_BATCH * num_clusters).min((num_clusters / 2) * num_clusters);
    pairs.reserve(max_num_pairs + 1);
    let mut clusters: Vec<u32> = (0..num_clusters as u32).collect();
    let num_final_clusters = histogram_combine(
        &mut all_histograms,
        &mut cluster_size,
        &mut histogram_symbols,
        &mut clusters,
        &mut pairs,
        num_clusters,
        MAX_NUMBER_OF_BLOCK_TYPES,
        max_num_pairs,
    );

    // Move each block to its cheapest surviving cluster and number the
    // clusters in order of first use.
    const INVALID_INDEX: u32 = u32::MAX;
    let mut new_index = vec![INVALID_INDEX; num_clusters];
    let mut next_index = 0u32;
    let mut histo = Histogram::<N>::new();
    pos = 0;
    for i in 0..num_blocks {
        let block_length = block_lengths[i] as usize;
        histo.clear();
        histo.add_vector(&data[pos..pos + block_length]);
        pos += block_length;

        let mut best_out = if i == 0 {
            histogram_symbols[0]
        } else {
            histogram_symbols[i - 1]
        };
        let mut best_bits = histogram_bit_cost_distance(&histo, &all_histograms[best_out as usize]);
        for &c in &clusters[..num_final_clusters] {
            let cur_bits = histogram_bit_cost_distance(&histo, &all_histograms[c as usize]);
            if cur_bits < best_bits {
                best_bits = cur_bits;
                best_out = c;
            }
        }
        histogram_symbols[i] = best_out;
        if new_index[best_out as usize] == INVALID_INDEX {
            new_index[best_out as usize] = next_index;
            next_index += 1;
        }
    }

    // Emit, merging neighbours that landed in the same cluster.
    let mut split = BlockSplit::with_capacity(num_blocks);
    let mut cur_length = 0u32;
    let mut max_type = 0u32;
    for i in 0..num_blocks {
        cur_length += block_lengths[i];
        if i + 1 == num_blocks || histogram_symbols[i] != histogram_symbols[i + 1] {
            let id = new_index[histogram_symbols[i] as usize];
            split.push(id as u8, cur_length);
            max_type = max_type.max(id);
            cur_length = 0;
        }
    }
    split.num_types = max_type as usize + 1;
    split
}

/// Split a symbol array into blocks of similar statistics.
///
/// `symbols_per_histogram` and `max_histograms` bound the number of seed
/// histograms, `stride` is the sample length and `block_switch_cost` the
/// penalty in bits for changing histogram.
pub fn split_byte_vector<T: Copy + Into<usize>, const N: usize>(
    data: &[T],
    symbols_per_histogram: usize,
    max_histograms: usize,
    stride: usize,
    block_switch_cost: f64,
    params: &EncoderParams,
) -> BlockSplit {
    let length = data.len();
    let mut split = BlockSplit::new();
    if length == 0 {
        split.num_types = 1;
        return split;
    }
    if length < MIN_LENGTH_FOR_BLOCK_SPLITTING {
        split.num_types = 1;
        split.push(0, length as u32);
        return split;
    }

    let num_histograms = (length / symbols_per_histogram + 1).min(max_histograms);
    let mut histograms: Vec<Histogram<N>> = vec![Histogram::new(); num_histograms];
    initial_entropy_codes(data, stride, &mut histograms);
    refine_entropy_codes(data, stride, &mut histograms);

    let mut block_ids = vec![0u8; length];
    let mut num_blocks = 0;
    let mut num_histograms = num_histograms;
    for _ in 0..params.block_splitting_passes() {
        num_blocks = find_blocks(
            data,
            block_switch_cost,
            &histograms[..num_histograms],
            &mut block_ids,
        );
        num_histograms = remap_block_ids(&mut block_ids, num_histograms);
        build_block_histograms(data, &block_ids, &mut histograms[..num_histograms]);
    }

    cluster_blocks::<T, N>(data, num_blocks, &block_ids)
}

fn split_category<T: Copy + Into<usize>, const N: usize>(
    data: &[T],
    category: BlockCategory,
    params: &EncoderParams,
) -> BlockSplit {
    let p = category.params();
    let split = split_byte_vector::<T, N>(
        data,
        p.symbols_per_histogram,
        p.max_histograms,
        p.stride,
        p.block_switch_cost,
        params,
    );
    debug!(
        category = category.name(),
        symbols = data.len(),
        num_types = split.num_types(),
        num_blocks = split.num_blocks(),
        "split category"
    );
    split
}

/// Split literals, commands and distances of a metablock.
///
/// Returns `(literal_split, command_split, distance_split)`.
pub fn split_block(
    cmds: &[Command],
    source: &SourceWindow<'_>,
    params: &EncoderParams,
) -> (BlockSplit, BlockSplit, BlockSplit) {
    let mut literals = Vec::with_capacity(count_literals(cmds));
    copy_literals_to_array(cmds, source.data, source.pos, source.mask, &mut literals);
    let literal_split = split_category::<u8, NUM_LITERAL_SYMBOLS>(
        &literals,
        BlockCategory::Literal,
        params,
    );

    let command_prefixes = extract_command_prefixes(cmds);
    let command_split = split_category::<u16, NUM_COMMAND_SYMBOLS>(
        &command_prefixes,
        BlockCategory::Command,
        params,
    );

    let distance_prefixes = extract_distance_prefixes(cmds);
    let distance_split = split_category::<u16, NUM_DISTANCE_SYMBOLS>(
        &distance_prefixes,
        BlockCategory::Distance,
        params,
    );

    (literal_split, command_split, distance_split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DistanceParams;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_block_split_lifecycle() {
        let mut split = BlockSplit::with_capacity(max_blocks(2000, 512));
        assert_eq!(split.num_types(), 0);
        assert_eq!(split.num_blocks(), 0);
        split.push(0, 10);
        split.push(0, 5);
        split.num_types = 1;
        assert_eq!(split.total_length(), 15);
        assert_eq!(split.blocks().collect::<Vec<_>>(), vec![(0, 10), (0, 5)]);
        split.clear();
        assert_eq!(split, BlockSplit::new());
    }

    #[test]
    fn test_max_blocks() {
        assert_eq!(max_blocks(0, 512), 1);
        assert_eq!(max_blocks(2000, 512), 4);
        assert_eq!(max_blocks(1024, 1024), 2);
    }

    #[test]
    #[should_panic(expected = "block type out of range")]
    fn test_from_parts_rejects_bad_type() {
        BlockSplit::from_parts(1, vec![0, 1], vec![3, 3]);
    }

    #[test]
    fn test_copy_literals_wraps() {
        // ring of 8 bytes, metablock starts at 6
        let data = b"ABCDEFGH";
        let cmds = vec![Command::insert_only(4)];
        let mut out = Vec::new();
        copy_literals_to_array(&cmds, data, 6, 7, &mut out);
        assert_eq!(out, b"GHAB");
    }

    #[test]
    fn test_copy_literals_skips_copies() {
        let data = b"0123456789abcdef";
        let dist = DistanceParams::default();
        let cmds = vec![Command::new(&dist, 2, 5, 0, 40), Command::insert_only(3)];
        let mut out = Vec::new();
        copy_literals_to_array(&cmds, data, 0, 15, &mut out);
        assert_eq!(out, b"01789");
        assert_eq!(count_literals(&cmds), out.len());
    }

    #[test]
    fn test_extract_prefixes() {
        let dist = DistanceParams::default();
        let cmds = vec![
            Command::new(&dist, 1, 4, 0, 100),
            Command::insert_only(7),
            Command::new(&dist, 0, 6, 0, 0),
            Command::new(&dist, 3, 9, 0, 300),
        ];
        let prefixes = extract_command_prefixes(&cmds);
        assert_eq!(prefixes.len(), 4);
        assert_eq!(prefixes[1], cmds[1].cmd_prefix);

        // Only explicit distances are extracted, without extra-bit counts.
        let distances = extract_distance_prefixes(&cmds);
        assert_eq!(distances, vec![cmds[0].distance_symbol(), cmds[3].distance_symbol()]);
        assert!(distances.iter().all(|&d| d <= DISTANCE_SYMBOL_MASK));
    }

    #[test]
    fn test_short_input_is_one_block() {
        let params = EncoderParams::default();
        let empty: Vec<u8> = Vec::new();
        let split = split_byte_vector::<u8, 256>(&empty, 544, 100, 70, 28.1, &params);
        assert_eq!(split.num_types(), 1);
        assert_eq!(split.num_blocks(), 0);

        let short = vec![5u8; 100];
        let split = split_byte_vector::<u8, 256>(&short, 544, 100, 70, 28.1, &params);
        assert_eq!(split.num_types(), 1);
        assert_eq!(split.blocks().collect::<Vec<_>>(), vec![(0, 100)]);
    }

    #[test]
    fn test_uniform_input_is_one_type() {
        let params = EncoderParams::default().with_quality(5);
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 4) as u8).collect();
        let split = split_byte_vector::<u8, 256>(&data, 544, 100, 70, 28.1, &params);
        assert_eq!(split.total_length(), data.len());
        assert_eq!(split.num_types(), 1);
    }

    #[test]
    fn test_distinct_halves_are_split() {
        let params = EncoderParams::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut data: Vec<u8> = (0..4000).map(|_| rng.gen_range(0..4u8)).collect();
        data.extend((0..4000).map(|_| rng.gen_range(128..=255u8)));
        let split = split_byte_vector::<u8, 256>(&data, 544, 100, 70, 28.1, &params);

        assert_eq!(split.total_length(), data.len());
        assert!(split.num_types() >= 2);
        assert!(split.types().iter().all(|&t| (t as usize) < split.num_types()));
        // first and last symbols land in different types
        assert_ne!(split.types()[0], *split.types().last().unwrap());
    }

    #[test]
    fn test_split_block_categories() {
        let dist = DistanceParams::default();
        let params = EncoderParams::default();
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8).collect();
        let mut cmds = Vec::new();
        for i in 0..200 {
            cmds.push(Command::new(&dist, 10, 6, 0, 16 + (i % 40)));
        }
        let source = SourceWindow::new(&data, 0, 4095);
        let (lit, cmd, dst) = split_block(&cmds, &source, &params);
        assert_eq!(lit.total_length(), count_literals(&cmds));
        assert_eq!(cmd.total_length(), cmds.len());
        assert_eq!(dst.total_length(), extract_distance_prefixes(&cmds).len());
    }
}
