//! Centred rolling windows over regularly sampled channels.
//!
//! A window of `w` samples around index `i` covers
//! `[i - (w - 1) / 2, i + w / 2]`, clipped at both ends of the channel.
//! `NaN` samples are skipped; a window with no finite sample yields `NaN`.

use std::collections::VecDeque;

use super::ProcessingError;

fn window_bounds(i: usize, window: usize, len: usize) -> (usize, usize) {
    let left = i.saturating_sub((window - 1) / 2);
    let right = (i + window / 2).min(len - 1);
    (left, right)
}

fn check_window(window: usize) -> Result<(), ProcessingError> {
    if window == 0 {
        return Err(ProcessingError::InvalidArgument(
            "rolling window must be at least 1 sample".to_string(),
        ));
    }
    Ok(())
}

/// Centred rolling maximum.
pub fn rolling_max(values: &[f64], window: usize) -> Result<Vec<f64>, ProcessingError> {
    check_window(window)?;
    let n = values.len();
    let mut out = Vec::with_capacity(n);
    // Indices of finite samples with decreasing values
    let mut deque: VecDeque<usize> = VecDeque::new();
    let mut next = 0;

    for i in 0..n {
        let (left, right) = window_bounds(i, window, n);
        while next <= right {
            let v = values[next];
            if v.is_finite() {
                while deque.back().is_some_and(|&j| values[j] <= v) {
                    deque.pop_back();
                }
                deque.push_back(next);
            }
            next += 1;
        }
        while deque.front().is_some_and(|&j| j < left) {
            deque.pop_front();
        }
        out.push(deque.front().map_or(f64::NAN, |&j| values[j]));
    }
    Ok(out)
}

/// Centred rolling mean. Edges use the shrunken window.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<f64>, ProcessingError> {
    check_window(window)?;
    let n = values.len();
    let mut sums = vec![0.0f64; n + 1];
    let mut counts = vec![0usize; n + 1];
    for (i, v) in values.iter().enumerate() {
        let (s, c) = if v.is_finite() { (*v, 1) } else { (0.0, 0) };
        sums[i + 1] = sums[i] + s;
        counts[i + 1] = counts[i] + c;
    }

    Ok((0..n)
        .map(|i| {
            let (left, right) = window_bounds(i, window, n);
            let count = counts[right + 1] - counts[left];
            if count == 0 {
                f64::NAN
            } else {
                (sums[right + 1] - sums[left]) / count as f64
            }
        })
        .collect())
}

/// Window length in samples for a duration on a grid of `interval_secs`.
pub fn window_samples(duration_secs: f64, interval_secs: f64) -> usize {
    if interval_secs <= 0.0 || !duration_secs.is_finite() {
        return 1;
    }
    ((duration_secs / interval_secs).round() as usize).max(1)
}
