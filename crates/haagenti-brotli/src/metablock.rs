//! Metablock assembly.
//!
//! Two assemblers turn a command stream into a [`MetaBlockSplit`]:
//!
//! - [`build_meta_block`]: searches distance parameters, runs the
//!   coarse-to-fine splitter on all three categories, builds per-context
//!   histograms and clusters them.
//! - [`build_meta_block_greedy`]: one pass over the commands driving the
//!   greedy splitters directly, no search and no clustering.
//!
//! [`optimize_histograms`] then prepares the final histograms for code
//! construction.

use tracing::debug;

use crate::block_split::{count_literals, split_block, BlockSplit, SourceWindow};
use crate::cluster::cluster_histograms;
use crate::command::{prefix_encode_copy_distance, Command, DISTANCE_SYMBOL_MASK};
use crate::context::{ContextLut, ContextMode, StaticContextMap, NUM_LITERAL_CONTEXTS};
use crate::histogram::{
    build_histograms_with_context, new_histograms, HistogramCommand, HistogramDistance,
    HistogramLiteral,
};
use crate::params::{
    BlockCategory, DistanceParams, EncoderParams, DISTANCE_CONTEXT_BITS, LITERAL_CONTEXT_BITS,
    MAX_NPOSTFIX, MAX_NUMBER_OF_HISTOGRAMS, NUM_COMMAND_SYMBOLS, NUM_DISTANCE_SYMBOLS,
    NUM_LITERAL_SYMBOLS,
};
use crate::rle::optimize_huffman_counts_for_rle;
use crate::splitter::ContextBlockSplitter;

/// Block splits, context maps and histograms of one metablock.
///
/// Context maps are indexed `type << 6 | context` (literals) and
/// `type << 2 | context` (distances) and hold histogram indices. An empty
/// context map means the identity mapping.
#[derive(Debug, Clone, Default)]
pub struct MetaBlockSplit {
    /// Literal block split.
    pub literal_split: BlockSplit,
    /// Command block split.
    pub command_split: BlockSplit,
    /// Distance block split.
    pub distance_split: BlockSplit,
    /// Literal context map.
    pub literal_context_map: Vec<u32>,
    /// Distance context map.
    pub distance_context_map: Vec<u32>,
    /// Literal histograms.
    pub literal_histograms: Vec<HistogramLiteral>,
    /// Command histograms, one per command block type.
    pub command_histograms: Vec<HistogramCommand>,
    /// Distance histograms.
    pub distance_histograms: Vec<HistogramDistance>,
}

impl MetaBlockSplit {
    /// Create an empty split, ready to be populated once.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been populated yet.
    pub fn is_empty(&self) -> bool {
        self.literal_context_map.is_empty()
            && self.distance_context_map.is_empty()
            && self.literal_histograms.is_empty()
            && self.command_histograms.is_empty()
            && self.distance_histograms.is_empty()
    }

    fn assert_unpopulated(&self) {
        assert!(self.is_empty(), "metablock split is already populated");
    }
}

/// Cost in bits of coding every explicit distance under `new`, or `None`
/// if some distance cannot be represented.
///
/// Distances are stored coded under `orig`.
pub fn compute_distance_cost(
    cmds: &[Command],
    orig: &DistanceParams,
    new: &DistanceParams,
) -> Option<f64> {
    let equal_params = orig.same_coding(new);
    let mut histogram = HistogramDistance::new();
    let mut extra_bits = 0.0;
    for cmd in cmds.iter().filter(|c| c.has_distance()) {
        let dist_prefix = if equal_params {
            cmd.dist_prefix
        } else {
            let distance = cmd.restore_distance_code(orig);
            if distance as usize > new.max_distance {
                return None;
            }
            prefix_encode_copy_distance(
                distance as usize,
                new.num_direct_codes as usize,
                new.postfix_bits,
            )
            .0
        };
        histogram.add((dist_prefix & DISTANCE_SYMBOL_MASK) as usize);
        extra_bits += (dist_prefix >> 10) as f64;
    }
    Some(histogram.population_cost() + extra_bits)
}

/// Re-encode every explicit distance from `orig` to `new` in place.
///
/// Does nothing when both parameterizations code distances the same way.
pub fn recompute_distance_prefixes(
    cmds: &mut [Command],
    orig: &DistanceParams,
    new: &DistanceParams,
) {
    if orig.same_coding(new) {
        return;
    }
    for cmd in cmds.iter_mut().filter(|c| c.has_distance()) {
        let distance = cmd.restore_distance_code(orig);
        let (prefix, extra) = prefix_encode_copy_distance(
            distance as usize,
            new.num_direct_codes as usize,
            new.postfix_bits,
        );
        cmd.dist_prefix = prefix;
        cmd.dist_extra = extra;
    }
}

/// Find the cheapest distance parameterization for a command stream.
///
/// For each postfix bit count the direct-code count is scanned upwards
/// until the cost stops improving. Returns the chosen parameters and their
/// cost.
pub fn search_distance_params(
    cmds: &[Command],
    orig: &DistanceParams,
    large_window: bool,
) -> (DistanceParams, f64) {
    let mut best = *orig;
    let mut best_cost = 1e99;
    let mut check_orig = true;
    let mut ndirect_msb = 0u32;

    for npostfix in 0..=MAX_NPOSTFIX {
        while ndirect_msb < 16 {
            let ndirect = ndirect_msb << npostfix;
            let candidate = DistanceParams::compute(npostfix, ndirect, large_window);
            if candidate.same_coding(orig) {
                check_orig = false;
            }
            match compute_distance_cost(cmds, orig, &candidate) {
                Some(cost) if cost <= best_cost => {
                    best_cost = cost;
                    best = candidate;
                }
                _ => break,
            }
            ndirect_msb += 1;
        }
        // Start the next postfix size around the same direct range.
        ndirect_msb = ndirect_msb.saturating_sub(1) / 2;
    }

    if check_orig {
        if let Some(cost) = compute_distance_cost(cmds, orig, orig) {
            if cost < best_cost {
                best = *orig;
                best_cost = cost;
            }
        }
    }
    (best, best_cost)
}

/// Build a fully split and clustered metablock.
///
/// Picks the distance parameters (stored back into `params.dist`), rewrites
/// the command distances accordingly and populates `mb`.
///
/// # Panics
///
/// Panics if `mb` is already populated.
pub fn build_meta_block(
    source: &SourceWindow<'_>,
    params: &mut EncoderParams,
    literal_context_mode: ContextMode,
    cmds: &mut [Command],
    mb: &mut MetaBlockSplit,
) {
    mb.assert_unpopulated();

    let orig_dist = params.dist;
    let (dist, dist_cost) = search_distance_params(cmds, &orig_dist, params.large_window);
    params.dist = dist;
    recompute_distance_prefixes(cmds, &orig_dist, &params.dist);
    debug!(
        postfix_bits = dist.postfix_bits,
        num_direct_codes = dist.num_direct_codes,
        cost = dist_cost,
        "selected distance parameters"
    );

    let (literal_split, command_split, distance_split) = split_block(cmds, source, params);

    let literal_lut = if params.disable_literal_context_modeling {
        None
    } else {
        Some(ContextLut::new(literal_context_mode))
    };
    let literal_multiplier = if literal_lut.is_some() {
        1 << LITERAL_CONTEXT_BITS
    } else {
        1
    };
    let mut literal_histograms =
        new_histograms::<NUM_LITERAL_SYMBOLS>(literal_split.num_types() * literal_multiplier);
    let mut command_histograms = new_histograms::<NUM_COMMAND_SYMBOLS>(command_split.num_types());
    let mut distance_histograms =
        new_histograms::<NUM_DISTANCE_SYMBOLS>(distance_split.num_types() << DISTANCE_CONTEXT_BITS);
    build_histograms_with_context(
        cmds,
        &literal_split,
        &command_split,
        &distance_split,
        source,
        literal_lut.as_ref(),
        &mut literal_histograms,
        &mut command_histograms,
        &mut distance_histograms,
    );

    let (literal_clusters, mut literal_context_map) =
        cluster_histograms(&literal_histograms, MAX_NUMBER_OF_HISTOGRAMS);
    if params.disable_literal_context_modeling {
        // One cluster per type: every context column of a type shares it.
        let per_type = literal_context_map;
        literal_context_map = vec![0; literal_split.num_types() << LITERAL_CONTEXT_BITS];
        for (row, &cluster) in literal_context_map
            .chunks_exact_mut(NUM_LITERAL_CONTEXTS)
            .zip(per_type.iter())
        {
            row.fill(cluster);
        }
    }

    let (distance_clusters, distance_context_map) =
        cluster_histograms(&distance_histograms, MAX_NUMBER_OF_HISTOGRAMS);

    debug!(
        literal_types = literal_split.num_types(),
        command_types = command_split.num_types(),
        distance_types = distance_split.num_types(),
        literal_clusters = literal_clusters.len(),
        distance_clusters = distance_clusters.len(),
        "built metablock"
    );

    *mb = MetaBlockSplit {
        literal_split,
        command_split,
        distance_split,
        literal_context_map,
        distance_context_map,
        literal_histograms: literal_clusters,
        command_histograms,
        distance_histograms: distance_clusters,
    };
}

/// Literal context handling for the greedy assembler.
#[derive(Debug, Clone, Copy)]
pub enum LiteralContexts<'a> {
    /// One literal histogram per block type.
    Single,
    /// Literal contexts folded through a static context map.
    Static {
        /// Context id derivation.
        lut: &'a ContextLut,
        /// Reduction of context ids to clusters.
        map: &'a StaticContextMap,
    },
}

impl LiteralContexts<'_> {
    fn num_contexts(&self) -> usize {
        match self {
            LiteralContexts::Single => 1,
            LiteralContexts::Static { map, .. } => map.num_contexts(),
        }
    }
}

fn greedy_splitter<const N: usize>(
    category: BlockCategory,
    num_contexts: usize,
    num_symbols: usize,
) -> ContextBlockSplitter<N> {
    let p = category.params();
    ContextBlockSplitter::new(
        p.alphabet_size,
        num_contexts,
        p.min_block_size,
        p.split_threshold,
        num_symbols,
    )
}

/// Build a metablock in one pass with the greedy splitters.
///
/// Context maps stay empty except for the literal map under
/// [`LiteralContexts::Static`].
///
/// # Panics
///
/// Panics if `mb` is already populated.
pub fn build_meta_block_greedy(
    source: &SourceWindow<'_>,
    literal_contexts: LiteralContexts<'_>,
    cmds: &[Command],
    mb: &mut MetaBlockSplit,
) {
    mb.assert_unpopulated();

    let num_contexts = literal_contexts.num_contexts();
    let mut literal_blocks = greedy_splitter::<NUM_LITERAL_SYMBOLS>(
        BlockCategory::Literal,
        num_contexts,
        count_literals(cmds),
    );
    let mut command_blocks =
        greedy_splitter::<NUM_COMMAND_SYMBOLS>(BlockCategory::Command, 1, cmds.len());
    let mut distance_blocks =
        greedy_splitter::<NUM_DISTANCE_SYMBOLS>(BlockCategory::Distance, 1, cmds.len());

    let mut pos = source.pos;
    let mut prev_byte = source.prev_byte;
    let mut prev_byte2 = source.prev_byte2;
    for cmd in cmds {
        command_blocks.add_symbol(cmd.cmd_prefix as usize, 0);
        for _ in 0..cmd.insert_len {
            let literal = source.byte_at(pos);
            let context = match literal_contexts {
                LiteralContexts::Single => 0,
                LiteralContexts::Static { lut, map } => {
                    map.cluster(lut.context(prev_byte, prev_byte2))
                }
            };
            literal_blocks.add_symbol(literal as usize, context);
            prev_byte2 = prev_byte;
            prev_byte = literal;
            pos += 1;
        }
        let copy_len = cmd.copy_len() as usize;
        pos += copy_len;
        if copy_len != 0 {
            prev_byte2 = source.byte_at(pos.wrapping_sub(2));
            prev_byte = source.byte_at(pos.wrapping_sub(1));
            if cmd.cmd_prefix >= 128 {
                distance_blocks.add_symbol(cmd.distance_symbol() as usize, 0);
            }
        }
    }

    let (literal_split, literal_histograms) = literal_blocks.finish();
    let (command_split, command_histograms) = command_blocks.finish();
    let (distance_split, distance_histograms) = distance_blocks.finish();

    let literal_context_map = match literal_contexts {
        LiteralContexts::Single => Vec::new(),
        LiteralContexts::Static { map, .. } => {
            map_static_contexts(literal_split.num_types(), map)
        }
    };

    debug!(
        literal_types = literal_split.num_types(),
        command_types = command_split.num_types(),
        distance_types = distance_split.num_types(),
        num_contexts,
        "built greedy metablock"
    );

    *mb = MetaBlockSplit {
        literal_split,
        command_split,
        distance_split,
        literal_context_map,
        distance_context_map: Vec::new(),
        literal_histograms,
        command_histograms,
        distance_histograms,
    };
}

/// Expand a static context map to a literal context map over `num_types`
/// block types. Type `t` uses histograms `t * num_contexts ..`.
pub fn map_static_contexts(num_types: usize, map: &StaticContextMap) -> Vec<u32> {
    let num_contexts = map.num_contexts() as u32;
    let mut context_map = vec![0u32; num_types << LITERAL_CONTEXT_BITS];
    for (t, row) in context_map.chunks_exact_mut(NUM_LITERAL_CONTEXTS).enumerate() {
        let offset = t as u32 * num_contexts;
        for (entry, &cluster) in row.iter_mut().zip(map.as_array()) {
            *entry = offset + cluster;
        }
    }
    context_map
}

/// Smooth every histogram of a metablock for cheaper code-length headers.
///
/// Distance histograms are smoothed over their first `num_distance_codes`
/// symbols.
///
/// # Panics
///
/// Panics if `num_distance_codes` exceeds the distance alphabet.
pub fn optimize_histograms(num_distance_codes: usize, mb: &mut MetaBlockSplit) {
    assert!(num_distance_codes <= NUM_DISTANCE_SYMBOLS, "distance alphabet too large");
    let mut good_for_rle = [0u8; NUM_DISTANCE_SYMBOLS];
    for h in &mut mb.literal_histograms {
        optimize_huffman_counts_for_rle(h.data_mut(), &mut good_for_rle);
    }
    for h in &mut mb.command_histograms {
        optimize_huffman_counts_for_rle(h.data_mut(), &mut good_for_rle);
    }
    for h in &mut mb.distance_histograms {
        optimize_huffman_counts_for_rle(&mut h.data_mut()[..num_distance_codes], &mut good_for_rle);
    }
}
