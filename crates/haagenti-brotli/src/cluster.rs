//! Histogram clustering.
//!
//! Every (block type, context) pair starts with its own histogram, but each
//! distinct histogram costs a prefix-code header in the output. Clustering
//! greedily merges the pair of histograms whose union saves the most bits,
//! until no merge saves anything and the cluster count is within budget.
//!
//! Candidate merges are kept in a bounded queue of [`HistogramPair`]s whose
//! head is always the best merge according to [`histogram_pair_is_less`].

use crate::entropy::fast_log2;
use crate::histogram::Histogram;

/// Histograms combined per batch before the global pass.
const MAX_INPUT_HISTOGRAMS: usize = 64;

/// A candidate merge of two histogram slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramPair {
    /// Lower slot index.
    pub idx1: u32,
    /// Higher slot index.
    pub idx2: u32,
    /// Population cost of the merged histogram.
    pub cost_combo: f64,
    /// Merged cost minus the separate costs; negative when merging helps.
    pub cost_diff: f64,
}

/// Queue ordering: `p1` ranks below `p2`.
///
/// Pairs with a smaller `cost_diff` (larger saving) rank higher; on an
/// exact tie the pair spanning more slots wins.
#[inline]
pub fn histogram_pair_is_less(p1: &HistogramPair, p2: &HistogramPair) -> bool {
    if p1.cost_diff != p2.cost_diff {
        return p1.cost_diff > p2.cost_diff;
    }
    (p1.idx2 - p1.idx1) > (p2.idx2 - p2.idx1)
}

/// Entropy reduction of the context map when two clusters of the given
/// sizes are combined.
#[inline]
pub fn cluster_cost_diff(size_a: usize, size_b: usize) -> f64 {
    let size_c = size_a + size_b;
    size_a as f64 * fast_log2(size_a) + size_b as f64 * fast_log2(size_b)
        - size_c as f64 * fast_log2(size_c)
}

/// Score the merge of `idx1` and `idx2` and queue it if it is worth
/// considering.
fn compare_and_push_to_queue<const N: usize>(
    out: &[Histogram<N>],
    cluster_size: &[u32],
    idx1: u32,
    idx2: u32,
    max_num_pairs: usize,
    pairs: &mut Vec<HistogramPair>,
) {
    if idx1 == idx2 {
        return;
    }
    let (idx1, idx2) = if idx2 < idx1 { (idx2, idx1) } else { (idx1, idx2) };
    let h1 = &out[idx1 as usize];
    let h2 = &out[idx2 as usize];

    let mut p = HistogramPair {
        idx1,
        idx2,
        cost_combo: 0.0,
        cost_diff: 0.5
            * cluster_cost_diff(
                cluster_size[idx1 as usize] as usize,
                cluster_size[idx2 as usize] as usize,
            )
            - h1.bit_cost
            - h2.bit_cost,
    };

    let is_good_pair = if h1.total_count() == 0 {
        p.cost_combo = h2.bit_cost;
        true
    } else if h2.total_count() == 0 {
        p.cost_combo = h1.bit_cost;
        true
    } else {
        let threshold = match pairs.first() {
            None => 1e99,
            Some(head) => head.cost_diff.max(0.0),
        };
        let mut combo = h1.clone();
        combo.add_histogram(h2);
        let cost_combo = combo.population_cost();
        if cost_combo < threshold - p.cost_diff {
            p.cost_combo = cost_combo;
            true
        } else {
            false
        }
    };

    if !is_good_pair {
        return;
    }
    p.cost_diff += p.cost_combo;
    if !pairs.is_empty() && histogram_pair_is_less(&pairs[0], &p) {
        // Replace the head, demoting it to the tail.
        if pairs.len() < max_num_pairs {
            let front = pairs[0];
            pairs.push(front);
        }
        pairs[0] = p;
    } else if pairs.len() < max_num_pairs {
        pairs.push(p);
    }
}

/// Merge clusters until no merge saves bits and at most `max_clusters`
/// remain.
///
/// `clusters[..num_clusters]` lists the live cluster slots in `out`;
/// `symbols` maps each input to its slot and is rewritten on every merge.
/// Returns the new cluster count.
#[allow(clippy::too_many_arguments)]
pub fn histogram_combine<const N: usize>(
    out: &mut [Histogram<N>],
    cluster_size: &mut [u32],
    symbols: &mut [u32],
    clusters: &mut [u32],
    pairs: &mut Vec<HistogramPair>,
    mut num_clusters: usize,
    max_clusters: usize,
    max_num_pairs: usize,
) -> usize {
    let mut cost_diff_threshold = 0.0;
    let mut min_cluster_size = 1;
    pairs.clear();

    for idx1 in 0..num_clusters {
        for idx2 in idx1 + 1..num_clusters {
            compare_and_push_to_queue(
                out,
                cluster_size,
                clusters[idx1],
                clusters[idx2],
                max_num_pairs,
                pairs,
            );
        }
    }

    while num_clusters > min_cluster_size {
        let Some(&best) = pairs.first() else {
            break;
        };
        if best.cost_diff >= cost_diff_threshold {
            // Nothing left that saves bits; keep merging only to get
            // under the cluster budget.
            cost_diff_threshold = 1e99;
            min_cluster_size = max_clusters;
            continue;
        }

        let (best_idx1, best_idx2) = (best.idx1, best.idx2);
        let (lo, hi) = out.split_at_mut(best_idx2 as usize);
        lo[best_idx1 as usize].add_histogram(&hi[0]);
        out[best_idx1 as usize].bit_cost = best.cost_combo;
        cluster_size[best_idx1 as usize] += cluster_size[best_idx2 as usize];

        for s in symbols.iter_mut() {
            if *s == best_idx2 {
                *s = best_idx1;
            }
        }
        if let Some(i) = clusters[..num_clusters].iter().position(|&c| c == best_idx2) {
            clusters.copy_within(i + 1..num_clusters, i);
        }
        num_clusters -= 1;

        // Drop pairs touching either merged slot, keeping the best
        // survivor at the head.
        let mut copy_to_idx = 0;
        for i in 0..pairs.len() {
            let p = pairs[i];
            if p.idx1 == best_idx1
                || p.idx2 == best_idx1
                || p.idx1 == best_idx2
                || p.idx2 == best_idx2
            {
                continue;
            }
            if histogram_pair_is_less(&pairs[0], &p) {
                let front = pairs[0];
                pairs[0] = p;
                pairs[copy_to_idx] = front;
            } else {
                pairs[copy_to_idx] = p;
            }
            copy_to_idx += 1;
        }
        pairs.truncate(copy_to_idx);

        for i in 0..num_clusters {
            compare_and_push_to_queue(
                out,
                cluster_size,
                best_idx1,
                clusters[i],
                max_num_pairs,
                pairs,
            );
        }
    }
    num_clusters
}

/// Extra bits needed to code `histogram` with `candidate`'s code.
pub fn histogram_bit_cost_distance<const N: usize>(
    histogram: &Histogram<N>,
    candidate: &Histogram<N>,
) -> f64 {
    if histogram.total_count() == 0 {
        return 0.0;
    }
    let mut tmp = histogram.clone();
    tmp.add_histogram(candidate);
    tmp.population_cost() - candidate.bit_cost
}

/// Move each input to its cheapest cluster, then rebuild the clusters
/// from their new members.
pub fn histogram_remap<const N: usize>(
    input: &[Histogram<N>],
    clusters: &[u32],
    out: &mut [Histogram<N>],
    symbols: &mut [u32],
) {
    for i in 0..input.len() {
        let mut best_out = if i == 0 { symbols[0] } else { symbols[i - 1] };
        let mut best_bits = histogram_bit_cost_distance(&input[i], &out[best_out as usize]);
        for &c in clusters {
            let cur_bits = histogram_bit_cost_distance(&input[i], &out[c as usize]);
            if cur_bits < best_bits {
                best_bits = cur_bits;
                best_out = c;
            }
        }
        symbols[i] = best_out;
    }

    for &c in clusters {
        out[c as usize].clear();
    }
    for (h, &s) in input.iter().zip(symbols.iter()) {
        out[s as usize].add_histogram(h);
    }
}

/// Renumber clusters densely in order of first use and compact `out`.
/// Returns the number of clusters.
pub fn histogram_reindex<const N: usize>(
    out: &mut Vec<Histogram<N>>,
    symbols: &mut [u32],
) -> usize {
    const INVALID_INDEX: u32 = u32::MAX;
    let mut new_index = vec![INVALID_INDEX; out.len()];
    let mut next_index = 0u32;
    for &s in symbols.iter() {
        if new_index[s as usize] == INVALID_INDEX {
            new_index[s as usize] = next_index;
            next_index += 1;
        }
    }

    let mut compacted = Vec::with_capacity(next_index as usize);
    for s in symbols.iter_mut() {
        if new_index[*s as usize] as usize == compacted.len() {
            compacted.push(out[*s as usize].clone());
        }
        *s = new_index[*s as usize];
    }
    *out = compacted;
    next_index as usize
}

/// Cluster `input` into at most `max_histograms` histograms.
///
/// Returns the clustered histograms and, for every input, the index of the
/// cluster it was assigned to.
pub fn cluster_histograms<const N: usize>(
    input: &[Histogram<N>],
    max_histograms: usize,
) -> (Vec<Histogram<N>>, Vec<u32>) {
    let in_size = input.len();
    let mut cluster_size = vec![1u32; in_size];
    let mut clusters = vec![0u32; in_size];
    let mut num_clusters = 0;
    let pairs_capacity = MAX_INPUT_HISTOGRAMS * MAX_INPUT_HISTOGRAMS / 2;
    let mut pairs = Vec::with_capacity(pairs_capacity + 1);

    let mut out: Vec<Histogram<N>> = input.to_vec();
    for h in out.iter_mut() {
        h.bit_cost = h.population_cost();
    }
    let mut symbols: Vec<u32> = (0..in_size as u32).collect();

    for i in (0..in_size).step_by(MAX_INPUT_HISTOGRAMS) {
        let num_to_combine = (in_size - i).min(MAX_INPUT_HISTOGRAMS);
        for j in 0..num_to_combine {
            clusters[num_clusters + j] = (i + j) as u32;
        }
        let num_new_clusters = histogram_combine(
            &mut out,
            &mut cluster_size,
            &mut symbols[i..i + num_to_combine],
            &mut clusters[num_clusters..num_clusters + num_to_combine],
            &mut pairs,
            num_to_combine,
            max_histograms,
            pairs_capacity,
        );
        num_clusters += num_new_clusters;
    }

    // Combine across batches.
    let max_num_pairs =
        (MAX_INPUT_HISTOGRAMS * num_clusters).min((num_clusters / 2) * num_clusters);
    pairs.reserve(max_num_pairs + 1);
    num_clusters = histogram_combine(
        &mut out,
        &mut cluster_size,
        &mut symbols,
        &mut clusters,
        &mut pairs,
        num_clusters,
        max_histograms,
        max_num_pairs,
    );

    histogram_remap(input, &clusters[..num_clusters], &mut out, &mut symbols);
    histogram_reindex(&mut out, &mut symbols);
    (out, symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::HistogramLiteral;

    fn pair(idx1: u32, idx2: u32, cost_diff: f64) -> HistogramPair {
        HistogramPair {
            idx1,
            idx2,
            cost_combo: 0.0,
            cost_diff,
        }
    }

    fn histogram_from(symbols: &[(usize, u32)]) -> HistogramLiteral {
        let mut h = HistogramLiteral::new();
        for &(s, n) in symbols {
            for _ in 0..n {
                h.add(s);
            }
        }
        h
    }

    #[test]
    fn test_cost_diff_symmetry_and_zero() {
        for (a, b) in [(1, 2), (7, 100), (1000, 3), (0, 0)] {
            assert_eq!(cluster_cost_diff(a, b), cluster_cost_diff(b, a));
        }
        for n in [0, 1, 2, 17, 4096] {
            assert_eq!(cluster_cost_diff(n, 0), 0.0);
        }
        // merging two populations always loses entropy headroom
        assert!(cluster_cost_diff(5, 9) < 0.0);
    }

    #[test]
    fn test_pair_ordering() {
        let saving = pair(0, 1, -10.0);
        let worse = pair(0, 1, -5.0);
        assert!(histogram_pair_is_less(&worse, &saving));
        assert!(!histogram_pair_is_less(&saving, &worse));

        // Exact tie: wider span ranks higher.
        let narrow = pair(3, 4, -7.0);
        let wide = pair(0, 9, -7.0);
        assert!(histogram_pair_is_less(&narrow, &wide));
        assert!(!histogram_pair_is_less(&wide, &narrow));
        assert!(!histogram_pair_is_less(&wide, &wide));
    }

    #[test]
    fn test_identical_histograms_merge() {
        let a = histogram_from(&[(1, 50), (2, 50), (3, 20), (4, 10), (5, 5)]);
        let input = vec![a.clone(), a.clone(), a];
        let (out, symbols) = cluster_histograms(&input, 256);
        assert_eq!(out.len(), 1);
        assert_eq!(symbols, vec![0, 0, 0]);
        assert_eq!(out[0].total_count(), 3 * 135);
    }

    #[test]
    fn test_disjoint_histograms_stay_apart() {
        let a = histogram_from(&[(1, 500), (2, 400), (3, 300), (4, 200), (5, 100)]);
        let b = histogram_from(&[(200, 500), (201, 400), (202, 300), (203, 200), (204, 100)]);
        let input = vec![a.clone(), b.clone(), a, b];
        let (out, symbols) = cluster_histograms(&input, 256);
        assert_eq!(out.len(), 2);
        assert_eq!(symbols, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_budget_forces_merges() {
        let input: Vec<HistogramLiteral> = (0..10)
            .map(|k| {
                histogram_from(&[
                    (k * 20, 300),
                    (k * 20 + 1, 200),
                    (k * 20 + 2, 100),
                    (k * 20 + 3, 50),
                    (k * 20 + 4, 25),
                ])
            })
            .collect();
        let (out, symbols) = cluster_histograms(&input, 3);
        assert!(out.len() <= 3);
        assert!(symbols.iter().all(|&s| (s as usize) < out.len()));
        let total: usize = out.iter().map(|h| h.total_count()).sum();
        assert_eq!(total, 10 * 675);
    }

    #[test]
    fn test_empty_histograms_merge_for_free() {
        let a = histogram_from(&[(10, 40), (11, 30), (12, 20), (13, 10), (14, 5)]);
        let input = vec![a, HistogramLiteral::new(), HistogramLiteral::new()];
        let (out, symbols) = cluster_histograms(&input, 256);
        assert_eq!(out.len(), 1);
        assert_eq!(symbols, vec![0, 0, 0]);
    }

    #[test]
    fn test_reindex_compacts_in_first_use_order() {
        let mut out: Vec<HistogramLiteral> = (0..4).map(|k| histogram_from(&[(k, 1)])).collect();
        let mut symbols = vec![3, 3, 1, 3, 1];
        let n = histogram_reindex(&mut out, &mut symbols);
        assert_eq!(n, 2);
        assert_eq!(symbols, vec![0, 0, 1, 0, 1]);
        assert_eq!(out[0].data()[3], 1);
        assert_eq!(out[1].data()[1], 1);
    }
}
