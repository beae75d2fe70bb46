//! Insert-and-copy commands and their prefix codes.
//!
//! The match finder emits one [`Command`] per (insert run, copy) pair. Each
//! command carries two prefix codes that the entropy coder models:
//!
//! - `cmd_prefix`: jointly buckets the insert and copy lengths (0-703).
//!   Values of 128 and above signal an explicitly coded distance.
//! - `dist_prefix`: the distance symbol in its low 10 bits and the number
//!   of extra bits in the high 6 bits.

use crate::params::{DistanceParams, NUM_DISTANCE_SHORT_CODES};

/// Mask of the distance symbol inside a packed distance prefix.
pub const DISTANCE_SYMBOL_MASK: u16 = 0x3FF;

/// Mask of the copy length inside the packed copy field.
const COPY_LEN_MASK: u32 = 0x1FF_FFFF;

/// One insert-and-copy command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Command {
    /// Literals preceding the copy.
    pub insert_len: u32,
    /// Copy length (low 25 bits) and copy-length code delta (high 7 bits).
    pub copy_len: u32,
    /// Distance extra-bit payload.
    pub dist_extra: u32,
    /// Insert-and-copy prefix code.
    pub cmd_prefix: u16,
    /// Distance symbol (low 10 bits) and extra-bit count (high 6 bits).
    pub dist_prefix: u16,
}

impl Command {
    /// Build a command that copies from an explicit distance code.
    ///
    /// `distance_code` is 0-15 for last-distance references, otherwise the
    /// distance plus 15.
    ///
    /// # Panics
    ///
    /// Panics if `copy_len + copy_len_code_delta` is below 2.
    pub fn new(
        dist: &DistanceParams,
        insert_len: usize,
        copy_len: usize,
        copy_len_code_delta: i32,
        distance_code: usize,
    ) -> Self {
        // The delta only needs 7 bits; store it two's complement in the
        // high bits of the copy field.
        let delta = (copy_len_code_delta as i8) as u8 as u32;
        let (dist_prefix, dist_extra) = prefix_encode_copy_distance(
            distance_code,
            dist.num_direct_codes as usize,
            dist.postfix_bits,
        );
        let cmd_prefix = length_code(
            insert_len,
            (copy_len as i64 + copy_len_code_delta as i64) as usize,
            dist_prefix & DISTANCE_SYMBOL_MASK == 0,
        );
        Self {
            insert_len: insert_len as u32,
            copy_len: copy_len as u32 | (delta << 25),
            dist_extra,
            cmd_prefix,
            dist_prefix,
        }
    }

    /// Build a command with literals only (no copy).
    pub fn insert_only(insert_len: usize) -> Self {
        Self {
            insert_len: insert_len as u32,
            copy_len: 4 << 25,
            dist_extra: 0,
            cmd_prefix: length_code(insert_len, 4, false),
            dist_prefix: NUM_DISTANCE_SHORT_CODES as u16,
        }
    }

    /// Number of bytes copied.
    #[inline(always)]
    pub fn copy_len(&self) -> u32 {
        self.copy_len & COPY_LEN_MASK
    }

    /// Copy length as seen by the length code (copy length plus delta).
    #[inline]
    pub fn copy_len_code(&self) -> u32 {
        let modifier = self.copy_len >> 25;
        let delta = (modifier | ((modifier & 0x40) << 1)) as u8 as i8;
        (self.copy_len() as i32 + delta as i32) as u32
    }

    /// Whether this command carries a coded distance.
    #[inline(always)]
    pub fn has_distance(&self) -> bool {
        self.copy_len() != 0 && self.cmd_prefix >= 128
    }

    /// Distance symbol without its extra-bit count.
    #[inline(always)]
    pub fn distance_symbol(&self) -> u16 {
        self.dist_prefix & DISTANCE_SYMBOL_MASK
    }

    /// Number of distance extra bits.
    #[inline(always)]
    pub fn distance_extra_bits(&self) -> u32 {
        (self.dist_prefix >> 10) as u32
    }

    /// Two-bit distance context derived from the command prefix.
    #[inline]
    pub fn distance_context(&self) -> usize {
        let r = self.cmd_prefix >> 6;
        let c = self.cmd_prefix & 7;
        if matches!(r, 0 | 2 | 4 | 7) && c <= 2 {
            c as usize
        } else {
            3
        }
    }

    /// Reconstruct the distance code from the stored prefix and extra bits.
    pub fn restore_distance_code(&self, dist: &DistanceParams) -> u32 {
        let dcode = self.distance_symbol() as u32;
        if dcode < NUM_DISTANCE_SHORT_CODES + dist.num_direct_codes {
            return dcode;
        }

        let nbits = self.distance_extra_bits();
        let extra = self.dist_extra;
        let postfix_mask = (1u32 << dist.postfix_bits) - 1;
        let shifted = dcode - dist.num_direct_codes - NUM_DISTANCE_SHORT_CODES;
        let hcode = shifted >> dist.postfix_bits;
        let lcode = shifted & postfix_mask;
        let offset = ((2 + (hcode & 1)) << nbits) - 4;
        ((offset + extra) << dist.postfix_bits) + lcode + dist.num_direct_codes
            + NUM_DISTANCE_SHORT_CODES
    }
}

/// Encode a distance code as `(prefix, extra)` under the given parameters.
///
/// The prefix packs the extra-bit count into its high 6 bits.
pub fn prefix_encode_copy_distance(
    distance_code: usize,
    num_direct_codes: usize,
    postfix_bits: u32,
) -> (u16, u32) {
    let short_and_direct = NUM_DISTANCE_SHORT_CODES as usize + num_direct_codes;
    if distance_code < short_and_direct {
        return (distance_code as u16, 0);
    }

    let dist = (1usize << (postfix_bits + 2)) + (distance_code - short_and_direct);
    let bucket = dist.ilog2() - 1;
    let postfix_mask = (1usize << postfix_bits) - 1;
    let postfix = dist & postfix_mask;
    let prefix = (dist >> bucket) & 1;
    let offset = (2 + prefix) << bucket;
    let nbits = (bucket - postfix_bits) as usize;
    let code = (nbits << 10)
        | (short_and_direct + ((2 * (nbits - 1) + prefix) << postfix_bits) + postfix);
    (code as u16, ((dist - offset) >> postfix_bits) as u32)
}

fn insert_length_code(insert_len: usize) -> u16 {
    if insert_len < 6 {
        insert_len as u16
    } else if insert_len < 130 {
        let nbits = (insert_len - 2).ilog2() - 1;
        ((nbits << 1) as usize + ((insert_len - 2) >> nbits) + 2) as u16
    } else if insert_len < 2114 {
        ((insert_len - 66).ilog2() + 10) as u16
    } else if insert_len < 6210 {
        21
    } else if insert_len < 22594 {
        22
    } else {
        23
    }
}

fn copy_length_code(copy_len: usize) -> u16 {
    assert!(copy_len >= 2, "copy length code {} is below 2", copy_len);
    if copy_len < 10 {
        (copy_len - 2) as u16
    } else if copy_len < 134 {
        let nbits = (copy_len - 6).ilog2() - 1;
        ((nbits << 1) as usize + ((copy_len - 6) >> nbits) + 4) as u16
    } else if copy_len < 2118 {
        ((copy_len - 70).ilog2() + 12) as u16
    } else {
        23
    }
}

fn combine_length_codes(inscode: u16, copycode: u16, use_last_distance: bool) -> u16 {
    let bits64 = (copycode & 0x7) | ((inscode & 0x7) << 3);
    if use_last_distance && inscode < 8 && copycode < 16 {
        if copycode < 8 { bits64 } else { bits64 | 64 }
    } else {
        // Cells are laid out 3x3 over (insert, copy) with the implicit
        // distance cells in front.
        let offset = 2 * ((copycode >> 3) + 3 * (inscode >> 3));
        let offset = (offset << 5) + 0x40 + ((0x520D40u32 >> offset) as u16 & 0xC0);
        offset | bits64
    }
}

/// Command prefix for an insert length, copy length code and distance kind.
///
/// # Panics
///
/// Panics if `copy_len_code` is below 2.
pub fn length_code(insert_len: usize, copy_len_code: usize, use_last_distance: bool) -> u16 {
    combine_length_codes(
        insert_length_code(insert_len),
        copy_length_code(copy_len_code),
        use_last_distance,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_codes_pass_through() {
        for code in 0..16 {
            assert_eq!(prefix_encode_copy_distance(code, 0, 0), (code as u16, 0));
        }
        assert_eq!(prefix_encode_copy_distance(20, 8, 1), (20, 0));
    }

    #[test]
    fn test_first_long_distance() {
        // distance 1 -> code 16 is the first bucket with one extra bit
        let (prefix, extra) = prefix_encode_copy_distance(16, 0, 0);
        assert_eq!(prefix & DISTANCE_SYMBOL_MASK, 16);
        assert_eq!(prefix >> 10, 1);
        assert_eq!(extra, 0);
    }

    #[test]
    fn test_restore_matches_encode() {
        for npostfix in 0..=3u32 {
            for msb in [0u32, 1, 5, 15] {
                let ndirect = msb << npostfix;
                let dist = DistanceParams::compute(npostfix, ndirect, false);
                for code in (0usize..5000).chain([65_535, 1 << 20, 1 << 24]) {
                    let (prefix, extra) =
                        prefix_encode_copy_distance(code, ndirect as usize, npostfix);
                    let cmd = Command {
                        insert_len: 0,
                        copy_len: 4,
                        dist_extra: extra,
                        cmd_prefix: 128,
                        dist_prefix: prefix,
                    };
                    assert_eq!(
                        cmd.restore_distance_code(&dist) as usize,
                        code,
                        "npostfix={} ndirect={}",
                        npostfix,
                        ndirect
                    );
                }
            }
        }
    }

    #[test]
    fn test_insert_only_command() {
        let cmd = Command::insert_only(1000);
        assert_eq!(cmd.insert_len, 1000);
        assert_eq!(cmd.copy_len(), 0);
        assert!(cmd.cmd_prefix >= 128);
        assert!(!cmd.has_distance());
        assert_eq!(cmd.copy_len_code(), 4);
    }

    #[test]
    fn test_copy_command() {
        let dist = DistanceParams::default();
        let cmd = Command::new(&dist, 3, 10, 0, 15 + 100);
        assert_eq!(cmd.insert_len, 3);
        assert_eq!(cmd.copy_len(), 10);
        assert!(cmd.has_distance());
        assert_eq!(cmd.restore_distance_code(&dist), 115);
    }

    #[test]
    fn test_last_distance_uses_implicit_cells() {
        let dist = DistanceParams::default();
        let cmd = Command::new(&dist, 2, 4, 0, 0);
        assert!(cmd.cmd_prefix < 128);
        assert!(!cmd.has_distance());
    }

    #[test]
    fn test_negative_copy_len_delta() {
        let dist = DistanceParams::default();
        let cmd = Command::new(&dist, 0, 12, -2, 200);
        assert_eq!(cmd.copy_len(), 12);
        assert_eq!(cmd.copy_len_code(), 10);
    }

    #[test]
    fn test_distance_context() {
        let mut cmd = Command::insert_only(0);
        cmd.cmd_prefix = 130; // r = 2, c = 2
        assert_eq!(cmd.distance_context(), 2);
        cmd.cmd_prefix = 131; // c = 3
        assert_eq!(cmd.distance_context(), 3);
        cmd.cmd_prefix = 0x40 * 3; // r = 3
        assert_eq!(cmd.distance_context(), 3);
    }

    #[test]
    fn test_length_code_ranges() {
        assert_eq!(insert_length_code(5), 5);
        assert_eq!(insert_length_code(6), 6);
        assert_eq!(insert_length_code(129), 15);
        assert_eq!(insert_length_code(130), 16);
        assert_eq!(insert_length_code(22594), 23);
        assert_eq!(copy_length_code(2), 0);
        assert_eq!(copy_length_code(10), 8);
        assert_eq!(copy_length_code(2118), 23);
    }

    #[test]
    #[should_panic(expected = "copy length code 1 is below 2")]
    fn test_copy_length_below_minimum() {
        let dist = DistanceParams::default();
        Command::new(&dist, 3, 4, -3, 20);
    }
}
