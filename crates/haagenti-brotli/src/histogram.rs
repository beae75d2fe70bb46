//! Symbol histograms for the three block categories.
//!
//! A histogram counts occurrences of each alphabet symbol for one block
//! type (and, for literals and distances, one context). The alphabet size is
//! a const parameter so literal, command and distance histograms are
//! distinct types sharing one implementation.

use crate::block_split::{BlockSplit, SourceWindow};
use crate::command::Command;
use crate::context::ContextLut;
use crate::entropy::{bits_entropy, population_cost};
use crate::params::{
    DISTANCE_CONTEXT_BITS, LITERAL_CONTEXT_BITS, NUM_COMMAND_SYMBOLS, NUM_DISTANCE_SYMBOLS,
    NUM_LITERAL_SYMBOLS,
};

/// Occurrence counts over an alphabet of `N` symbols.
#[derive(Clone, PartialEq)]
pub struct Histogram<const N: usize> {
    data: [u32; N],
    total_count: usize,
    pub(crate) bit_cost: f64,
}

/// Literal histogram.
pub type HistogramLiteral = Histogram<NUM_LITERAL_SYMBOLS>;

/// Insert-and-copy command histogram.
pub type HistogramCommand = Histogram<NUM_COMMAND_SYMBOLS>;

/// Distance histogram.
pub type HistogramDistance = Histogram<NUM_DISTANCE_SYMBOLS>;

impl<const N: usize> Histogram<N> {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self {
            data: [0; N],
            total_count: 0,
            bit_cost: f64::INFINITY,
        }
    }

    /// Reset all counts.
    #[inline]
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.total_count = 0;
        self.bit_cost = f64::INFINITY;
    }

    /// Count one occurrence of `symbol`.
    #[inline(always)]
    pub fn add(&mut self, symbol: usize) {
        self.data[symbol] += 1;
        self.total_count += 1;
    }

    /// Count every symbol of a slice.
    #[inline]
    pub fn add_vector<T: Copy + Into<usize>>(&mut self, symbols: &[T]) {
        self.total_count += symbols.len();
        for &s in symbols {
            self.data[s.into()] += 1;
        }
    }

    /// Add the counts of another histogram.
    #[inline]
    pub fn add_histogram(&mut self, other: &Self) {
        self.total_count += other.total_count;
        for (d, &o) in self.data.iter_mut().zip(other.data.iter()) {
            *d += o;
        }
    }

    /// Symbol counts.
    #[inline]
    pub fn data(&self) -> &[u32; N] {
        &self.data
    }

    /// Mutable symbol counts. The total is not adjusted.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u32; N] {
        &mut self.data
    }

    /// Number of symbols counted.
    #[inline]
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Cached population cost, `INFINITY` until computed.
    #[inline]
    pub fn bit_cost(&self) -> f64 {
        self.bit_cost
    }

    /// Estimated coding cost including the code header.
    #[inline]
    pub fn population_cost(&self) -> f64 {
        population_cost(&self.data, self.total_count)
    }

    /// Shannon cost over the first `alphabet_size` symbols.
    #[inline]
    pub fn bits_entropy(&self, alphabet_size: usize) -> f64 {
        bits_entropy(&self.data[..alphabet_size])
    }
}

impl<const N: usize> Default for Histogram<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> std::fmt::Debug for Histogram<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.data.iter().filter(|&&c| c > 0).count();
        f.debug_struct("Histogram")
            .field("alphabet_size", &N)
            .field("total_count", &self.total_count)
            .field("used_symbols", &used)
            .field("bit_cost", &self.bit_cost)
            .finish()
    }
}

/// Allocate `count` empty histograms.
pub fn new_histograms<const N: usize>(count: usize) -> Vec<Histogram<N>> {
    vec![Histogram::new(); count]
}

/// Walks a [`BlockSplit`] one symbol at a time, yielding the block type.
#[derive(Debug)]
pub struct BlockSplitIterator<'a> {
    split: &'a BlockSplit,
    idx: usize,
    block_type: usize,
    length: usize,
}

impl<'a> BlockSplitIterator<'a> {
    /// Start at the first block.
    pub fn new(split: &'a BlockSplit) -> Self {
        let length = split.lengths().first().copied().unwrap_or(0) as usize;
        Self {
            split,
            idx: 0,
            block_type: 0,
            length,
        }
    }

    /// Advance by one symbol and return its block type.
    #[inline]
    pub fn next_type(&mut self) -> usize {
        if self.length == 0 {
            self.idx += 1;
            self.block_type = self.split.types()[self.idx] as usize;
            self.length = self.split.lengths()[self.idx] as usize;
        }
        self.length -= 1;
        self.block_type
    }
}

/// Replay the command stream against three block splits, filling one
/// histogram per (block type, context).
///
/// Literal histograms are indexed `type << 6 | context` when `literal_lut`
/// is given and by `type` alone otherwise. Distance histograms are indexed
/// `type << 2 | distance context`.
#[allow(clippy::too_many_arguments)]
pub fn build_histograms_with_context(
    cmds: &[Command],
    literal_split: &BlockSplit,
    command_split: &BlockSplit,
    distance_split: &BlockSplit,
    source: &SourceWindow<'_>,
    literal_lut: Option<&ContextLut>,
    literal_histograms: &mut [HistogramLiteral],
    command_histograms: &mut [HistogramCommand],
    distance_histograms: &mut [HistogramDistance],
) {
    let mut pos = source.pos;
    let mut prev_byte = source.prev_byte;
    let mut prev_byte2 = source.prev_byte2;
    let mut literal_it = BlockSplitIterator::new(literal_split);
    let mut command_it = BlockSplitIterator::new(command_split);
    let mut distance_it = BlockSplitIterator::new(distance_split);

    for cmd in cmds {
        command_histograms[command_it.next_type()].add(cmd.cmd_prefix as usize);

        for _ in 0..cmd.insert_len {
            let mut index = literal_it.next_type();
            if let Some(lut) = literal_lut {
                index = (index << LITERAL_CONTEXT_BITS) + lut.context(prev_byte, prev_byte2);
            }
            let literal = source.byte_at(pos);
            literal_histograms[index].add(literal as usize);
            prev_byte2 = prev_byte;
            prev_byte = literal;
            pos += 1;
        }

        pos += cmd.copy_len() as usize;
        if cmd.copy_len() != 0 {
            prev_byte2 = source.byte_at(pos.wrapping_sub(2));
            prev_byte = source.byte_at(pos.wrapping_sub(1));
            if cmd.cmd_prefix >= 128 {
                let index = (distance_it.next_type() << DISTANCE_CONTEXT_BITS)
                    + cmd.distance_context();
                distance_histograms[index].add(cmd.distance_symbol() as usize);
            }
        }
    }
}
