//! Cross-correlation shift search.
//!
//! A shift `s` pairs `a[i]` with `b[i - s]`: a positive shift means the
//! events of `b` happen `s` samples before those of `a`, so `b` has to be
//! moved later to line up.

use crate::processing::stats::pearson_finite;

/// Winning candidate of [`search_shift`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftCandidate {
    pub shift: i64,
    pub correlation: f64,
    pub pairs: usize,
}

/// Pearson correlation of `a[i]` with `b[i - shift]` over finite pairs.
///
/// `None` when fewer than three pairs overlap or either side is flat.
pub fn correlation_at(a: &[f64], b: &[f64], shift: i64) -> Option<(f64, usize)> {
    let lo = shift.max(0);
    let hi = (a.len() as i64).min(b.len() as i64 + shift);
    if hi <= lo {
        return None;
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = (lo..hi)
        .map(|i| (a[i as usize], b[(i - shift) as usize]))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip();
    let pairs = xs.len();
    pearson_finite(&xs, &ys).map(|r| (r, pairs))
}

/// Candidate shifts in evaluation order: `0, -1, 1, -2, 2, ...`.
fn candidate_order(max_shift: usize) -> impl Iterator<Item = i64> {
    std::iter::once(0).chain((1..=max_shift as i64).flat_map(|k| [-k, k]))
}

/// Shift in `[-max_shift, max_shift]` with the largest absolute correlation.
///
/// Candidates without a correlation are skipped. Ties keep the earlier
/// candidate in evaluation order, i.e. the smaller `|shift|`, then the
/// negative one. `None` when no candidate has a correlation.
///
/// `max_shift` is capped at the longer input's length; larger shifts leave
/// no overlap.
pub fn search_shift(a: &[f64], b: &[f64], max_shift: usize) -> Option<ShiftCandidate> {
    let max_shift = max_shift.min(a.len().max(b.len()));
    let mut best: Option<ShiftCandidate> = None;
    for shift in candidate_order(max_shift) {
        let Some((correlation, pairs)) = correlation_at(a, b, shift) else {
            continue;
        };
        if best.map_or(true, |current| correlation.abs() > current.correlation.abs()) {
            best = Some(ShiftCandidate {
                shift,
                correlation,
                pairs,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                (x / 7.0).sin() + 0.5 * (x / 3.1).cos() + 0.2 * (x / 1.3).sin()
            })
            .collect()
    }

    #[test]
    fn test_identical_copy_gives_zero_shift() {
        let a = wave(200);
        let best = search_shift(&a, &a, 20).unwrap();
        assert_eq!(best.shift, 0);
        assert!((best.correlation - 1.0).abs() < 1e-12);
        assert_eq!(best.pairs, 200);
    }

    #[test]
    fn test_recovers_known_lag() {
        let base = wave(260);
        // a lags b by 7 samples: a[i] = b[i - 7]
        let a = base[..250].to_vec();
        let b = base[7..257].to_vec();
        let best = search_shift(&a, &b, 20).unwrap();
        assert_eq!(best.shift, 7);
        assert!(best.correlation > 0.999);
        let best = search_shift(&b, &a, 20).unwrap();
        assert_eq!(best.shift, -7);
    }

    #[test]
    fn test_oversized_window_is_capped() {
        let base = wave(260);
        let a = base[..250].to_vec();
        let b = base[7..257].to_vec();
        let capped = search_shift(&a, &b, usize::MAX).unwrap();
        assert_eq!(Some(capped), search_shift(&a, &b, 250));
        assert_ne!(capped.shift, 0);
    }

    #[test]
    fn test_anticorrelation_can_win() {
        let a = wave(120);
        let b: Vec<f64> = a.iter().map(|v| -v).collect();
        let best = search_shift(&a, &b, 5).unwrap();
        assert_eq!(best.shift, 0);
        assert!((best.correlation + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tie_prefers_smaller_then_negative_shift() {
        // Period-4 signal: shifts 0 and +-4 correlate perfectly
        let a: Vec<f64> = (0..40).map(|i| [0.0, 1.0, 0.0, -1.0][i % 4]).collect();
        let best = search_shift(&a, &a, 8).unwrap();
        assert_eq!(best.shift, 0);

        let order: Vec<i64> = candidate_order(2).collect();
        assert_eq!(order, vec![0, -1, 1, -2, 2]);
        assert_eq!(candidate_order(0).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_gaps_and_flat_data() {
        let a = vec![f64::NAN; 50];
        assert!(search_shift(&a, &wave(50), 5).is_none());
        let flat = vec![3.0; 50];
        assert!(search_shift(&flat, &wave(50), 5).is_none());
        assert!(correlation_at(&wave(5), &wave(5), 4).is_none());
    }
}
