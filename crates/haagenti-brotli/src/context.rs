//! Literal context modeling.
//!
//! A literal's context id (0-63) is derived from the two bytes that precede
//! it. The derivation is table driven: a [`ContextLut`] holds two 256-entry
//! halves, one indexed by the previous byte and one by the byte before
//! that, and the context is their bitwise OR.
//!
//! The greedy assembler can further fold the 64 context ids down to a
//! handful of clusters with a [`StaticContextMap`].

use haagenti_core::{Error, Result};

use crate::params::MAX_STATIC_CONTEXTS;

/// Number of literal context ids.
pub const NUM_LITERAL_CONTEXTS: usize = 64;

/// How literal context ids are derived from the preceding bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContextMode {
    /// Six least significant bits of the previous byte.
    Lsb6,
    /// Six most significant bits of the previous byte.
    Msb6,
    /// Character classes of UTF-8 text.
    #[default]
    Utf8,
    /// Magnitude buckets of signed integers.
    Signed,
}

/// Context lookup table: `context = lut[p1] | lut[256 + p2]`.
#[derive(Clone, PartialEq, Eq)]
pub struct ContextLut {
    table: [u8; 512],
}

const fn build_utf8_lut() -> [u8; 512] {
    // ASCII classes of the previous byte.
    const ASCII_P1: [u8; 128] = [
        0, 0, 0, 0, 0, 0, 0, 0, 0, 4, 4, 0, 0, 4, 0, 0, //
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
        8, 12, 16, 12, 12, 20, 12, 16, 24, 28, 12, 12, 32, 12, 36, 12, //
        44, 44, 44, 44, 44, 44, 44, 44, 44, 44, 32, 32, 24, 40, 28, 12, //
        12, 48, 52, 52, 52, 48, 52, 52, 52, 48, 52, 52, 52, 52, 52, 48, //
        52, 52, 52, 52, 52, 48, 52, 52, 52, 52, 52, 24, 12, 28, 12, 12, //
        12, 56, 60, 60, 60, 56, 60, 60, 60, 56, 60, 60, 60, 60, 60, 56, //
        60, 60, 60, 60, 60, 56, 60, 60, 60, 60, 60, 24, 12, 28, 12, 0, //
    ];
    // ASCII classes of the second previous byte.
    const ASCII_P2: [u8; 128] = [
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
        0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, //
        2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, //
        1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, //
        2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, //
        1, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, //
        3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 1, 1, 1, 1, 0, //
    ];

    let mut lut = [0u8; 512];
    let mut i = 0;
    while i < 128 {
        lut[i] = ASCII_P1[i];
        lut[256 + i] = ASCII_P2[i];
        i += 1;
    }
    while i < 256 {
        // Continuation bytes alternate 0/1, lead bytes alternate 2/3.
        lut[i] = if i < 192 { (i & 1) as u8 } else { 2 + (i & 1) as u8 };
        // Lead bytes (except 0xC0) count as class 2 for the second byte.
        lut[256 + i] = if i > 192 { 2 } else { 0 };
        i += 1;
    }
    lut
}

const fn signed_bucket(byte: usize) -> u8 {
    match byte {
        0 => 0,
        1..=15 => 1,
        16..=63 => 2,
        64..=127 => 3,
        128..=191 => 4,
        192..=239 => 5,
        240..=254 => 6,
        _ => 7,
    }
}

impl ContextLut {
    /// Build the lookup table for a context mode.
    pub fn new(mode: ContextMode) -> Self {
        let mut table = [0u8; 512];
        match mode {
            ContextMode::Lsb6 => {
                for (i, entry) in table[..256].iter_mut().enumerate() {
                    *entry = (i & 0x3F) as u8;
                }
            }
            ContextMode::Msb6 => {
                for (i, entry) in table[..256].iter_mut().enumerate() {
                    *entry = (i >> 2) as u8;
                }
            }
            ContextMode::Utf8 => table = build_utf8_lut(),
            ContextMode::Signed => {
                for i in 0..256 {
                    table[i] = signed_bucket(i) << 3;
                    table[256 + i] = signed_bucket(i);
                }
            }
        }
        Self { table }
    }

    /// Context id of a literal given the two preceding bytes.
    #[inline(always)]
    pub fn context(&self, prev_byte: u8, prev_byte2: u8) -> usize {
        (self.table[prev_byte as usize] | self.table[256 + prev_byte2 as usize]) as usize
    }
}

impl std::fmt::Debug for ContextLut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLut").finish_non_exhaustive()
    }
}

impl From<ContextMode> for ContextLut {
    fn from(mode: ContextMode) -> Self {
        Self::new(mode)
    }
}

/// Fixed reduction of the 64 literal context ids to a few clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticContextMap {
    num_contexts: usize,
    map: [u32; NUM_LITERAL_CONTEXTS],
}

const SIMPLE_UTF8_MAP: [u32; NUM_LITERAL_CONTEXTS] = {
    let mut map = [0u32; NUM_LITERAL_CONTEXTS];
    map[2] = 1;
    map[3] = 1;
    map
};

const CONTINUATION_MAP: [u32; NUM_LITERAL_CONTEXTS] = {
    let mut map = [0u32; NUM_LITERAL_CONTEXTS];
    map[0] = 1;
    map[1] = 1;
    map[2] = 2;
    map[3] = 2;
    map
};

const COMPLEX_UTF8_MAP: [u32; NUM_LITERAL_CONTEXTS] = [
    11, 11, 12, 12, // 0 special
    0, 0, 0, 0, // lf
    1, 1, 9, 9, // space
    2, 2, 2, 2, // !, first after space/lf and after something else
    1, 1, 1, 1, // "
    8, 3, 3, 3, // %
    1, 1, 1, 1, // ({[
    2, 2, 2, 2, // }])
    8, 4, 4, 4, // :;
    8, 7, 4, 4, // .
    8, 0, 0, 0, // >
    3, 3, 3, 3, // [0..9]
    5, 5, 10, 5, // [A-Z]
    5, 5, 10, 5, //
    6, 6, 6, 6, // [a-z]
    6, 6, 6, 6, //
];

impl StaticContextMap {
    /// Validate a caller-supplied context map.
    pub fn new(num_contexts: usize, map: [u32; NUM_LITERAL_CONTEXTS]) -> Result<Self> {
        if !(2..=MAX_STATIC_CONTEXTS).contains(&num_contexts) {
            return Err(Error::out_of_range(
                "static context count",
                num_contexts as i64,
                2,
                MAX_STATIC_CONTEXTS as i64,
            ));
        }
        if let Some((ctx, &cluster)) = map
            .iter()
            .enumerate()
            .find(|(_, cluster)| **cluster as usize >= num_contexts)
        {
            return Err(Error::invalid_context_map(format!(
                "context {} maps to cluster {} but only {} clusters exist",
                ctx, cluster, num_contexts
            )));
        }
        Ok(Self { num_contexts, map })
    }

    /// Two clusters: ASCII-like versus UTF-8 lead/continuation contexts.
    pub fn simple_utf8() -> Self {
        Self {
            num_contexts: 2,
            map: SIMPLE_UTF8_MAP,
        }
    }

    /// Three clusters separating UTF-8 continuation and lead contexts.
    pub fn continuation() -> Self {
        Self {
            num_contexts: 3,
            map: CONTINUATION_MAP,
        }
    }

    /// Thirteen clusters over UTF-8 character classes.
    pub fn complex_utf8() -> Self {
        Self {
            num_contexts: MAX_STATIC_CONTEXTS,
            map: COMPLEX_UTF8_MAP,
        }
    }

    /// Number of clusters.
    #[inline]
    pub fn num_contexts(&self) -> usize {
        self.num_contexts
    }

    /// Cluster of a context id.
    #[inline(always)]
    pub fn cluster(&self, context: usize) -> usize {
        self.map[context] as usize
    }

    /// The raw 64-entry table.
    #[inline]
    pub fn as_array(&self) -> &[u32; NUM_LITERAL_CONTEXTS] {
        &self.map
    }
}
