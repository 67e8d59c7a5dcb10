//! Note- and sequence-level aggregation of degrees

/// Fuzzy quantifier "almost all": 0 below 0.5, 1 from 1.0, linear in between
pub fn almost_all(proportion: f64) -> f64 {
    const LOW: f64 = 0.5;
    const HIGH: f64 = 1.0;
    if proportion >= HIGH {
        1.0
    } else if proportion < LOW {
        0.0
    } else {
        (proportion - LOW) / (HIGH - LOW)
    }
}

/// Conjunctive aggregation; 1.0 for no degrees
pub fn minimum(degrees: &[f64]) -> f64 {
    degrees.iter().copied().fold(1.0, f64::min)
}

/// Yager's ordered aggregation under the "almost all" quantifier
///
/// For every distinct degree `a`, the notes graded at least `a` form the
/// a-cut; its weight is `almost_all(sum(cut) / n)`. The result is the best
/// `min(a, weight)` over all cuts. Empty input aggregates to 0.0.
pub fn yager_almost_all(degrees: &[f64]) -> f64 {
    if degrees.is_empty() {
        return 0.0;
    }
    let n = degrees.len() as f64;

    // descending, so each cut is a prefix and sums do not depend on input order
    let mut sorted = degrees.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut best: f64 = 0.0;
    let mut cut_sum = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let alpha = sorted[i];
        while i < sorted.len() && sorted[i] == alpha {
            cut_sum += sorted[i];
            i += 1;
        }
        best = best.max(alpha.min(almost_all(cut_sum / n)));
    }
    best
}
