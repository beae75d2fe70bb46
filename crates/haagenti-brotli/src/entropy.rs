//! Entropy estimates used to score histograms.
//!
//! Two estimates are used throughout the splitters:
//!
//! - [`bits_entropy`]: Shannon cost of a population, ignoring the cost of
//!   describing the code itself. Cheap; used by the greedy splitter.
//! - [`population_cost`]: Shannon cost plus an estimate of the prefix-code
//!   header. Used when deciding whether two histograms should share a code.

/// Code length code alphabet size.
const CODE_LENGTH_CODES: usize = 18;

/// Code length code for a run of zeros.
const REPEAT_ZERO_CODE_LENGTH: usize = 17;

const ONE_SYMBOL_HISTOGRAM_COST: f64 = 12.0;
const TWO_SYMBOL_HISTOGRAM_COST: f64 = 20.0;
const THREE_SYMBOL_HISTOGRAM_COST: f64 = 28.0;
const FOUR_SYMBOL_HISTOGRAM_COST: f64 = 37.0;

/// Base-2 logarithm with `fast_log2(0) == 0`.
#[inline(always)]
pub fn fast_log2(v: usize) -> f64 {
    if v == 0 { 0.0 } else { (v as f64).log2() }
}

/// Shannon entropy of a population in bits, plus the population size.
#[inline]
pub fn shannon_entropy(population: &[u32]) -> (f64, usize) {
    let mut sum = 0usize;
    let mut retval = 0.0;
    for &p in population {
        let p = p as usize;
        sum += p;
        retval -= p as f64 * fast_log2(p);
    }
    if sum != 0 {
        retval += sum as f64 * fast_log2(sum);
    }
    (retval, sum)
}

/// Shannon entropy in bits, charging at least one bit per symbol.
#[inline]
pub fn bits_entropy(population: &[u32]) -> f64 {
    let (retval, sum) = shannon_entropy(population);
    retval.max(sum as f64)
}

/// Estimated cost in bits of coding a histogram, including its code header.
pub fn population_cost(data: &[u32], total_count: usize) -> f64 {
    if total_count == 0 {
        return ONE_SYMBOL_HISTOGRAM_COST;
    }

    let mut count = 0;
    let mut s = [0usize; 5];
    for (i, &d) in data.iter().enumerate() {
        if d > 0 {
            s[count] = i;
            count += 1;
            if count > 4 {
                break;
            }
        }
    }

    match count {
        1 => return ONE_SYMBOL_HISTOGRAM_COST,
        2 => return TWO_SYMBOL_HISTOGRAM_COST + total_count as f64,
        3 => {
            let (h0, h1, h2) = (data[s[0]], data[s[1]], data[s[2]]);
            let histomax = h0.max(h1).max(h2);
            return THREE_SYMBOL_HISTOGRAM_COST + (2 * (h0 + h1 + h2)) as f64
                - histomax as f64;
        }
        4 => {
            let mut histo = [data[s[0]], data[s[1]], data[s[2]], data[s[3]]];
            histo.sort_unstable_by(|a, b| b.cmp(a));
            let h23 = histo[2] + histo[3];
            let histomax = h23.max(histo[0]);
            return FOUR_SYMBOL_HISTOGRAM_COST + (3 * h23) as f64
                + (2 * (histo[0] + histo[1])) as f64
                - histomax as f64;
        }
        _ => {}
    }

    // Estimate the code length histogram the prefix code would produce
    // and charge for describing it.
    let mut bits = 0.0;
    let mut max_depth = 1;
    let mut depth_histo = [0u32; CODE_LENGTH_CODES];
    let log2total = fast_log2(total_count);
    let mut i = 0;
    while i < data.len() {
        if data[i] > 0 {
            let log2p = log2total - fast_log2(data[i] as usize);
            // Round to the nearest code length.
            let depth = ((log2p + 0.5) as usize).min(15);
            bits += data[i] as f64 * log2p;
            max_depth = max_depth.max(depth);
            depth_histo[depth] += 1;
            i += 1;
        } else {
            let mut reps = 1u32;
            let mut k = i + 1;
            while k < data.len() && data[k] == 0 {
                reps += 1;
                k += 1;
            }
            i += reps as usize;
            if i == data.len() {
                // Trailing zeros cost nothing.
                break;
            }
            if reps < 3 {
                depth_histo[0] += reps;
            } else {
                reps -= 2;
                while reps > 0 {
                    depth_histo[REPEAT_ZERO_CODE_LENGTH] += 1;
                    // Extra bits of the repeat code.
                    bits += 3.0;
                    reps >>= 3;
                }
            }
        }
    }
    bits += (18 + 2 * max_depth) as f64;
    bits += bits_entropy(&depth_histo);
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_log2() {
        assert_eq!(fast_log2(0), 0.0);
        assert_eq!(fast_log2(1), 0.0);
        assert_eq!(fast_log2(1024), 10.0);
    }

    #[test]
    fn test_shannon_uniform() {
        let population = [4u32; 16];
        let (bits, total) = shannon_entropy(&population);
        assert_eq!(total, 64);
        assert!((bits - 64.0 * 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_bits_entropy_floor() {
        // One symbol has zero Shannon entropy but still costs a bit each.
        let mut population = [0u32; 256];
        population[7] = 100;
        assert_eq!(bits_entropy(&population), 100.0);
        assert_eq!(bits_entropy(&[0u32; 8]), 0.0);
    }

    #[test]
    fn test_population_cost_small_alphabets() {
        let mut data = [0u32; 256];
        assert_eq!(population_cost(&data, 0), 12.0);

        data[3] = 10;
        assert_eq!(population_cost(&data, 10), 12.0);

        data[9] = 5;
        assert_eq!(population_cost(&data, 15), 20.0 + 15.0);

        data[20] = 1;
        assert_eq!(population_cost(&data, 16), 28.0 + 32.0 - 10.0);

        data[40] = 2;
        // sorted: 10, 5, 2, 1 -> h23 = 3, histomax = 10
        assert_eq!(population_cost(&data, 18), 37.0 + 9.0 + 30.0 - 10.0);
    }

    #[test]
    fn test_population_cost_grows_with_spread() {
        let mut narrow = [0u32; 256];
        for v in narrow.iter_mut().take(8) {
            *v = 32;
        }
        let mut wide = [0u32; 256];
        for v in wide.iter_mut().step_by(4).take(64) {
            *v = 4;
        }
        let narrow_cost = population_cost(&narrow, 256);
        let wide_cost = population_cost(&wide, 256);
        assert!(narrow_cost < wide_cost, "{} vs {}", narrow_cost, wide_cost);
    }
}
