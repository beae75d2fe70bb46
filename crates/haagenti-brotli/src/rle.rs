//! Run-length friendly histogram smoothing.
//!
//! Prefix code lengths are themselves run-length coded. Nudging nearly
//! equal neighbouring counts to a common value makes their code lengths
//! equal too, which costs fewer header bits than the entropy it gives up.

/// Histograms with fewer populated symbols than this are left alone.
const MIN_NONZERO_FOR_RLE: usize = 16;

/// Rewrite `counts` so that runs of similar values become equal.
///
/// `good_for_rle` is scratch space of at least `counts.len()` bytes; on
/// return it marks the entries that were already part of a long run.
pub fn optimize_huffman_counts_for_rle(counts: &mut [u32], good_for_rle: &mut [u8]) {
    const STREAK_LIMIT: i64 = 1240;

    let nonzero_count = counts.iter().filter(|&&c| c != 0).count();
    if nonzero_count < MIN_NONZERO_FOR_RLE {
        return;
    }
    let Some(last) = counts.iter().rposition(|&c| c != 0) else {
        return;
    };
    let length = last + 1;
    let counts = &mut counts[..length];

    let nonzeros = counts.iter().filter(|&&c| c != 0).count();
    let smallest_nonzero = counts.iter().copied().filter(|&c| c != 0).min().unwrap_or(1 << 30);
    if nonzeros < 5 {
        return;
    }
    if smallest_nonzero < 4 && length - nonzeros < 6 {
        // Fill isolated zeros so the nonzero run is not interrupted.
        for i in 1..length - 1 {
            if counts[i - 1] != 0 && counts[i] == 0 && counts[i + 1] != 0 {
                counts[i] = 1;
            }
        }
    }
    if nonzeros < 28 {
        return;
    }

    // Mark runs that are already cheap to code: zeros of 5 or more and
    // equal nonzero values of 7 or more.
    let good_for_rle = &mut good_for_rle[..length];
    good_for_rle.fill(0);
    let mut symbol = counts[0];
    let mut step = 0usize;
    for i in 0..=length {
        if i == length || counts[i] != symbol {
            if (symbol == 0 && step >= 5) || (symbol != 0 && step >= 7) {
                good_for_rle[i - step..i].fill(1);
            }
            step = 1;
            if i != length {
                symbol = counts[i];
            }
        } else {
            step += 1;
        }
    }

    // Collapse strides whose counts stay close to their running average.
    // Averages are kept in 24.8 fixed point.
    let mut stride = 0usize;
    let mut limit = 256 * (counts[0] as usize + counts[1] as usize + counts[2] as usize) / 3 + 420;
    let mut sum = 0usize;
    for i in 0..=length {
        let ends_stride = i == length
            || good_for_rle[i] != 0
            || (i != 0 && good_for_rle[i - 1] != 0)
            || {
                let delta = 256 * counts[i] as i64 - limit as i64;
                !(-STREAK_LIMIT..STREAK_LIMIT).contains(&delta)
            };
        if ends_stride {
            if stride >= 4 || (stride >= 3 && sum == 0) {
                let count = if sum == 0 {
                    0
                } else {
                    ((sum + stride / 2) / stride).max(1)
                };
                // counts[i] already belongs to the next stride.
                counts[i - stride..i].fill(count as u32);
            }
            stride = 0;
            sum = 0;
            limit = if i + 2 < length {
                256 * (counts[i] as usize + counts[i + 1] as usize + counts[i + 2] as usize) / 3
                    + 420
            } else if i < length {
                256 * counts[i] as usize
            } else {
                0
            };
        }
        stride += 1;
        if i != length {
            sum += counts[i] as usize;
            if stride >= 4 {
                limit = (256 * sum + stride / 2) / stride;
            }
            if stride == 4 {
                limit += 120;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_histogram_untouched() {
        let mut counts = vec![0u32; 256];
        for (i, c) in counts.iter_mut().enumerate().take(15) {
            *c = (i as u32 * 37) % 11 + 1;
        }
        let before = counts.clone();
        let mut scratch = vec![0u8; 256];
        optimize_huffman_counts_for_rle(&mut counts, &mut scratch);
        assert_eq!(counts, before);
    }

    #[test]
    fn test_all_zero_histogram() {
        let mut counts = vec![0u32; 64];
        let mut scratch = vec![0u8; 64];
        optimize_huffman_counts_for_rle(&mut counts, &mut scratch);
        assert!(counts.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_isolated_zeros_filled() {
        let mut counts = vec![2u32; 20];
        counts[5] = 0;
        counts[12] = 0;
        let mut scratch = vec![0u8; 20];
        optimize_huffman_counts_for_rle(&mut counts, &mut scratch);
        assert_eq!(counts[5], 1);
        assert_eq!(counts[12], 1);
        assert_eq!(counts[0], 2);
    }

    #[test]
    fn test_noisy_stride_collapses_to_average() {
        let mut counts: Vec<u32> = (0..40).map(|i| 100 + (i % 3)).collect();
        counts.extend([0u32; 24]);
        let mut scratch = vec![0u8; 64];
        optimize_huffman_counts_for_rle(&mut counts, &mut scratch);
        assert!(counts[..40].iter().all(|&c| c == 101), "{:?}", &counts[..40]);
        assert!(counts[40..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_long_runs_preserved() {
        let mut counts = Vec::new();
        for value in [50u32, 900, 7, 300] {
            counts.extend(std::iter::repeat_n(value, 10));
        }
        let before = counts.clone();
        let mut scratch = vec![0u8; counts.len()];
        optimize_huffman_counts_for_rle(&mut counts, &mut scratch);
        assert_eq!(counts, before);
        assert!(scratch.iter().all(|&g| g == 1));
    }
}
