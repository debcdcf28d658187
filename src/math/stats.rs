//! Small descriptive statistics used by the guess heuristics and fit metrics.

/// Percentile with linear interpolation between order statistics (`q` in `[0, 100]`).
///
/// Returns `None` for an empty slice. Non-finite values are ignored.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 100.0) / 100.0;
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `(min, max)` of the finite entries.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo.is_finite() && hi.is_finite() {
        Some((lo, hi))
    } else {
        None
    }
}

/// `n` evenly spaced points over `[start, end]` (inclusive).
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n as f64 - 1.0);
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Ordinary least-squares line `y = a + b x`. Returns `(a, b)`.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let xbar = mean(x)?;
    let ybar = mean(y)?;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - xbar;
        cov += dx * (yi - ybar);
        var += dx * dx;
    }
    if var <= 1e-300 || !cov.is_finite() {
        return None;
    }
    let b = cov / var;
    Some((ybar - b * xbar, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        let v = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&v, 0.0), Some(1.0));
        assert_eq!(percentile(&v, 50.0), Some(3.0));
        assert_eq!(percentile(&v, 100.0), Some(5.0));
        assert!((percentile(&v, 20.0).unwrap() - 1.8).abs() < 1e-12);
    }

    #[test]
    fn linspace_hits_both_endpoints() {
        let g = linspace(-1.0, 2.0, 7);
        assert_eq!(g.len(), 7);
        assert_eq!(g[0], -1.0);
        assert_eq!(g[6], 2.0);
        assert!((g[1] - -0.5).abs() < 1e-15);
    }

    #[test]
    fn regression_recovers_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y: Vec<f64> = x.iter().map(|v| 1.5 - 2.0 * v).collect();
        let (a, b) = linear_regression(&x, &y).unwrap();
        assert!((a - 1.5).abs() < 1e-12);
        assert!((b + 2.0).abs() < 1e-12);
    }
}
