//! Encoder parameters and per-category constants.
//!
//! The block splitters treat literals, commands and distances as three
//! independent symbol categories. Each category has a fixed set of tuning
//! constants (switch costs, minimum block sizes, split thresholds, sampling
//! strides); they must match peer encoders exactly, so they live here as
//! immutable `const` data.

use haagenti_core::{Error, Result};

/// Literal alphabet size.
pub const NUM_LITERAL_SYMBOLS: usize = 256;

/// Insert-and-copy command alphabet size.
pub const NUM_COMMAND_SYMBOLS: usize = 704;

/// Largest distance alphabet (3 postfix bits, 120 direct codes, large window).
pub const NUM_DISTANCE_SYMBOLS: usize = 1128;

/// Distance codes reserved for the last-distance ring.
pub const NUM_DISTANCE_SHORT_CODES: u32 = 16;

/// Maximum number of distance postfix bits.
pub const MAX_NPOSTFIX: u32 = 3;

/// Maximum number of direct distance codes.
pub const MAX_NDIRECT: u32 = 120;

/// Distance bits available in the standard window.
pub const MAX_DISTANCE_BITS: u32 = 24;

/// Distance bits available in large-window mode.
pub const LARGE_MAX_DISTANCE_BITS: u32 = 62;

/// Largest distance a large-window stream may reference.
pub const MAX_ALLOWED_DISTANCE: usize = 0x7FF_FFFC;

/// Block type ids must fit in one byte.
pub const MAX_NUMBER_OF_BLOCK_TYPES: usize = 256;

/// Upper bound on clustered histograms per category.
pub const MAX_NUMBER_OF_HISTOGRAMS: usize = 256;

/// Maximum number of simultaneous static literal contexts.
pub const MAX_STATIC_CONTEXTS: usize = 13;

/// Literal context id width.
pub const LITERAL_CONTEXT_BITS: u32 = 6;

/// Distance context id width.
pub const DISTANCE_CONTEXT_BITS: u32 = 2;

/// Extra bits an older block type must save before the splitter re-uses it.
pub const MERGE_MARGIN_BITS: f64 = 20.0;

/// Highest encoder quality.
pub const MAX_QUALITY: u32 = 11;

/// Quality from which the coarse splitter runs its long refinement schedule.
pub const HQ_BLOCK_SPLITTING_QUALITY: u32 = 11;

/// Size of a distance alphabet for the given parameterization.
#[inline]
pub const fn distance_alphabet_size(npostfix: u32, ndirect: u32, max_nbits: u32) -> u32 {
    NUM_DISTANCE_SHORT_CODES + ndirect + (max_nbits << (npostfix + 1))
}

/// Symbol category handled by a block splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockCategory {
    /// Literal bytes.
    Literal,
    /// Insert-and-copy command prefixes.
    Command,
    /// Distance prefixes.
    Distance,
}

/// Tuning constants for one symbol category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryParams {
    /// Alphabet prefix scored by the greedy splitter.
    pub alphabet_size: usize,
    /// Greedy splitter: symbols per block before a decision is taken.
    pub min_block_size: usize,
    /// Greedy splitter: bits a merge must lose before a new type opens.
    pub split_threshold: f64,
    /// Coarse splitter: cost in bits of switching block type.
    pub block_switch_cost: f64,
    /// Coarse splitter: symbols sampled per initial histogram.
    pub symbols_per_histogram: usize,
    /// Coarse splitter: upper bound on initial histograms.
    pub max_histograms: usize,
    /// Coarse splitter: sampling stride length.
    pub stride: usize,
}

const LITERAL_PARAMS: CategoryParams = CategoryParams {
    alphabet_size: NUM_LITERAL_SYMBOLS,
    min_block_size: 512,
    split_threshold: 400.0,
    block_switch_cost: 28.1,
    symbols_per_histogram: 544,
    max_histograms: 100,
    stride: 70,
};

const COMMAND_PARAMS: CategoryParams = CategoryParams {
    alphabet_size: NUM_COMMAND_SYMBOLS,
    min_block_size: 1024,
    split_threshold: 500.0,
    block_switch_cost: 13.5,
    symbols_per_histogram: 530,
    max_histograms: 50,
    stride: 40,
};

const DISTANCE_PARAMS: CategoryParams = CategoryParams {
    alphabet_size: 64,
    min_block_size: 512,
    split_threshold: 100.0,
    block_switch_cost: 14.6,
    symbols_per_histogram: 544,
    max_histograms: 50,
    stride: 40,
};

impl BlockCategory {
    /// Tuning constants for this category.
    #[inline]
    pub const fn params(self) -> &'static CategoryParams {
        match self {
            BlockCategory::Literal => &LITERAL_PARAMS,
            BlockCategory::Command => &COMMAND_PARAMS,
            BlockCategory::Distance => &DISTANCE_PARAMS,
        }
    }

    /// Category name for logging.
    pub fn name(self) -> &'static str {
        match self {
            BlockCategory::Literal => "literal",
            BlockCategory::Command => "command",
            BlockCategory::Distance => "distance",
        }
    }
}

/// Distance coding parameterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceParams {
    /// Number of low distance bits carried in the prefix code (NPOSTFIX).
    pub postfix_bits: u32,
    /// Number of distances coded directly (NDIRECT).
    pub num_direct_codes: u32,
    /// Resulting distance alphabet size.
    pub alphabet_size: u32,
    /// Largest distance representable with all extra bits set.
    pub max_distance: usize,
}

impl DistanceParams {
    /// Validate and derive distance parameters.
    ///
    /// `num_direct_codes` must be of the form `msb << postfix_bits` with
    /// `msb < 16`.
    pub fn new(postfix_bits: u32, num_direct_codes: u32, large_window: bool) -> Result<Self> {
        if postfix_bits > MAX_NPOSTFIX {
            return Err(Error::out_of_range(
                "distance postfix bits",
                postfix_bits as i64,
                0,
                MAX_NPOSTFIX as i64,
            ));
        }
        if num_direct_codes > MAX_NDIRECT {
            return Err(Error::out_of_range(
                "direct distance codes",
                num_direct_codes as i64,
                0,
                MAX_NDIRECT as i64,
            ));
        }
        let step = 1u32 << postfix_bits;
        if num_direct_codes % step != 0 || (num_direct_codes >> postfix_bits) >= 16 {
            return Err(Error::invalid_parameter(
                "direct distance codes",
                format!(
                    "{} is not a multiple of {} below {}",
                    num_direct_codes,
                    step,
                    16 * step
                ),
            ));
        }
        Ok(Self::compute(postfix_bits, num_direct_codes, large_window))
    }

    /// Derive alphabet size and maximum distance without validation.
    pub(crate) fn compute(npostfix: u32, ndirect: u32, large_window: bool) -> Self {
        let mut alphabet_size = distance_alphabet_size(npostfix, ndirect, MAX_DISTANCE_BITS);
        let mut max_distance = ndirect as usize + (1usize << (MAX_DISTANCE_BITS + npostfix + 2))
            - (1usize << (npostfix + 2));

        if large_window {
            const BOUND: [u32; MAX_NPOSTFIX as usize + 1] = [0, 4, 12, 28];
            let bound = BOUND[npostfix as usize];
            let postfix = 1u32 << npostfix;
            alphabet_size = distance_alphabet_size(npostfix, ndirect, LARGE_MAX_DISTANCE_BITS);

            // No distance symbol may encode a distance above the allowed
            // maximum with all of its extra bits set.
            max_distance = if ndirect < bound {
                MAX_ALLOWED_DISTANCE - (bound - ndirect) as usize
            } else if ndirect >= bound + postfix {
                (3usize << 29) - 4 + (ndirect - bound) as usize
            } else {
                MAX_ALLOWED_DISTANCE
            };
        }

        Self {
            postfix_bits: npostfix,
            num_direct_codes: ndirect,
            alphabet_size,
            max_distance,
        }
    }

    /// Whether two parameterizations code distances identically.
    #[inline]
    pub fn same_coding(&self, other: &Self) -> bool {
        self.postfix_bits == other.postfix_bits && self.num_direct_codes == other.num_direct_codes
    }
}

impl Default for DistanceParams {
    fn default() -> Self {
        Self::compute(0, 0, false)
    }
}

/// Encoder-wide parameters consumed by metablock assembly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderParams {
    /// Encoder quality (0-11). Only the coarse splitter's refinement
    /// schedule depends on it here.
    pub quality: u32,
    /// Use a single literal histogram per block type.
    pub disable_literal_context_modeling: bool,
    /// Large-window distance coding.
    pub large_window: bool,
    /// Current distance parameterization. Metablock assembly replaces it
    /// with the cheapest one found.
    pub dist: DistanceParams,
}

impl EncoderParams {
    /// Create parameters with default settings.
    pub fn new() -> Self {
        Self {
            quality: MAX_QUALITY,
            disable_literal_context_modeling: false,
            large_window: false,
            dist: DistanceParams::default(),
        }
    }

    /// Set quality, clamped to 0-11.
    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality.min(MAX_QUALITY);
        self
    }

    /// Enable or disable literal context modeling.
    pub fn with_literal_context_modeling(mut self, enabled: bool) -> Self {
        self.disable_literal_context_modeling = !enabled;
        self
    }

    /// Switch large-window mode, re-deriving the distance limits.
    pub fn with_large_window(mut self, large_window: bool) -> Self {
        self.large_window = large_window;
        self.dist = DistanceParams::compute(
            self.dist.postfix_bits,
            self.dist.num_direct_codes,
            large_window,
        );
        self
    }

    /// Set the starting distance parameterization.
    pub fn with_distance_params(
        mut self,
        postfix_bits: u32,
        num_direct_codes: u32,
    ) -> Result<Self> {
        self.dist = DistanceParams::new(postfix_bits, num_direct_codes, self.large_window)?;
        Ok(self)
    }

    /// Refinement passes run by the coarse splitter.
    #[inline]
    pub fn block_splitting_passes(&self) -> usize {
        if self.quality < HQ_BLOCK_SPLITTING_QUALITY {
            3
        } else {
            10
        }
    }
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self::new()
    }
}
