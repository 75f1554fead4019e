//! Per-series window computations
//!
//! All functions operate on one node's values in time order. `None` marks a
//! missing observation and is skipped by the rolling statistics, the same
//! way a minimum-periods policy of one behaves.

/// First difference; undefined for the first sample
pub fn diff(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for (i, current) in values.iter().enumerate() {
        let previous = if i == 0 { None } else { values[i - 1] };
        out.push(match (previous, current) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        });
    }
    out
}

/// Values shifted forward by `periods`; the first `periods` entries are undefined
pub fn shift(values: &[Option<f64>], periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| if i >= periods { values[i - periods] } else { None })
        .collect()
}

/// Rolling mean over the last `window` samples using whatever is available
///
/// A window of zero yields no values.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |present| {
        if present.is_empty() {
            return None;
        }
        Some(present.iter().sum::<f64>() / present.len() as f64)
    })
}

/// Rolling sample standard deviation (Bessel's correction)
///
/// Needs at least two observations in the window, so it is undefined at the
/// start of every series.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |present| {
        if present.len() < 2 {
            return None;
        }
        let n = present.len() as f64;
        let mean = present.iter().sum::<f64>() / n;
        let sum_sq: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
        Some((sum_sq / (n - 1.0)).sqrt())
    })
}

fn rolling<F>(values: &[Option<f64>], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut present = Vec::with_capacity(window);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            present.clear();
            present.extend(values[start..=i].iter().flatten().copied());
            stat(&present)
        })
        .collect()
}
