use nalgebra::{Matrix3, Vector3};
use ndarray::Array1;

/// Savitzky-Golay smoothing, polynomial order 2.
///
/// Interior samples use the closed-form convolution weights
/// c_i = (3(3m^2+3m-1) - 15 i^2) / ((2m+1)(4m^2+4m-3)), i in [-m, m].
/// The first and last m samples are replaced by a least-squares quadratic
/// fitted over the first/last full window. Windows wider than the series
/// shrink to the largest odd length that fits; below 3 samples the series
/// is returned unchanged.
pub fn savgol_filter(x: &Array1<f64>, window: usize) -> Array1<f64> {
    let n = x.len();
    if n < 3 {
        return x.clone();
    }
    let mut w = window.min(n);
    if w % 2 == 0 {
        w -= 1;
    }
    if w < 3 {
        return x.clone();
    }
    let m = w / 2;

    let weights = center_weights(m);
    let mut out = Array1::zeros(n);
    for j in m..n - m {
        let mut acc = 0.0;
        for (k, &c) in weights.iter().enumerate() {
            acc += c * x[j + k - m];
        }
        out[j] = acc;
    }

    if let Some(c) = fit_quadratic(x, 0, w) {
        for j in 0..m {
            out[j] = eval_quadratic(&c, j as f64);
        }
    } else {
        for j in 0..m {
            out[j] = x[j];
        }
    }
    if let Some(c) = fit_quadratic(x, n - w, w) {
        for j in 0..m {
            out[n - m + j] = eval_quadratic(&c, (w - m + j) as f64);
        }
    } else {
        for j in 0..m {
            out[n - m + j] = x[n - m + j];
        }
    }
    out
}

fn center_weights(m: usize) -> Vec<f64> {
    let mf = m as f64;
    let denom = (2.0 * mf + 1.0) * (4.0 * mf * mf + 4.0 * mf - 3.0);
    (-(m as isize)..=m as isize)
        .map(|i| {
            let i2 = (i * i) as f64;
            (3.0 * (3.0 * mf * mf + 3.0 * mf - 1.0) - 15.0 * i2) / denom
        })
        .collect()
}

/// Least-squares fit of a0 + a1*t + a2*t^2 over x[start..start+len],
/// with t counted from the window start. Solves the 3x3 normal equations.
fn fit_quadratic(x: &Array1<f64>, start: usize, len: usize) -> Option<Vector3<f64>> {
    let mut s = [0.0f64; 5];
    let mut b = Vector3::zeros();
    for t in 0..len {
        let v = x[start + t];
        let t = t as f64;
        let t2 = t * t;
        s[0] += 1.0;
        s[1] += t;
        s[2] += t2;
        s[3] += t2 * t;
        s[4] += t2 * t2;
        b[0] += v;
        b[1] += t * v;
        b[2] += t2 * v;
    }
    let a = Matrix3::new(s[0], s[1], s[2], s[1], s[2], s[3], s[2], s[3], s[4]);
    a.lu().solve(&b)
}

fn eval_quadratic(c: &Vector3<f64>, t: f64) -> f64 {
    c[0] + c[1] * t + c[2] * t * t
}

/// Trailing moving average over up to `window` samples ending at each
/// position. The first samples average over what is available so far.
pub fn rolling_mean(x: &Array1<f64>, window: usize) -> Array1<f64> {
    let n = x.len();
    let w = window.max(1);
    let mut out = Array1::zeros(n);
    let mut sum = 0.0;
    for i in 0..n {
        sum += x[i];
        if i >= w {
            sum -= x[i - w];
        }
        out[i] = sum / (i + 1).min(w) as f64;
    }
    out
}

/// Local maxima with at least `prominence` of topographic prominence and
/// at least `distance` samples between survivors.
///
/// Plateaus report their midpoint. Distance pruning runs first, keeping
/// the higher peak of any pair closer than `distance` (ties go to the
/// leftmost); a gap of exactly `distance` survives. The prominence test
/// is inclusive.
pub fn find_peaks(x: &Array1<f64>, prominence: f64, distance: usize) -> Vec<usize> {
    let candidates = local_maxima(x);
    let spaced = select_by_distance(x, candidates, distance);
    spaced
        .into_iter()
        .filter(|&p| peak_prominence(x, p) >= prominence)
        .collect()
}

fn local_maxima(x: &Array1<f64>) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut i_ahead = i + 1;
            while i_ahead < i_max && x[i_ahead] == x[i] {
                i_ahead += 1;
            }
            if x[i_ahead] < x[i] {
                let left_edge = i;
                let right_edge = i_ahead - 1;
                peaks.push((left_edge + right_edge) / 2);
                i = i_ahead;
            }
        }
        i += 1;
    }
    peaks
}

fn select_by_distance(x: &Array1<f64>, peaks: Vec<usize>, distance: usize) -> Vec<usize> {
    if distance <= 1 || peaks.len() < 2 {
        return peaks;
    }
    let mut keep = vec![true; peaks.len()];
    // Highest first; equal heights resolve to the lower index
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| {
        x[peaks[b]]
            .total_cmp(&x[peaks[a]])
            .then_with(|| a.cmp(&b))
    });
    for &k in &order {
        if !keep[k] {
            continue;
        }
        let mut j = k;
        while j > 0 {
            j -= 1;
            if peaks[k] - peaks[j] >= distance {
                break;
            }
            keep[j] = false;
        }
        let mut j = k + 1;
        while j < peaks.len() {
            if peaks[j] - peaks[k] >= distance {
                break;
            }
            keep[j] = false;
            j += 1;
        }
    }
    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

/// Height above the higher of the two bases. Each base is the minimum
/// between the peak and the nearest higher ground (or the series edge).
fn peak_prominence(x: &Array1<f64>, peak: usize) -> f64 {
    let i_max = x.len() - 1;
    let peak_val = x[peak];

    let mut left_min = peak_val;
    let mut i = peak;
    while i > 0 && x[i] <= peak_val {
        i -= 1;
        if x[i] < left_min {
            left_min = x[i];
        }
    }

    let mut right_min = peak_val;
    let mut i = peak;
    while i < i_max && x[i] <= peak_val {
        i += 1;
        if x[i] < right_min {
            right_min = x[i];
        }
    }

    peak_val - left_min.max(right_min)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divisor n, not n-1).
pub fn std_population(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_savgol_preserves_quadratic() {
        // A degree-2 polynomial is inside the model space, so smoothing
        // must reproduce it exactly, edges included.
        let x: Array1<f64> = (0..20)
            .map(|t| {
                let t = t as f64;
                2.0 * t * t - 3.0 * t + 1.0
            })
            .collect();
        let y = savgol_filter(&x, 11);
        for (i, (&a, &b)) in x.iter().zip(y.iter()).enumerate() {
            assert!((a - b).abs() < 1e-6, "index {}: {} != {}", i, a, b);
        }
    }

    #[test]
    fn test_savgol_five_point_weights() {
        let w = center_weights(2);
        let expected = [-3.0 / 35.0, 12.0 / 35.0, 17.0 / 35.0, 12.0 / 35.0, -3.0 / 35.0];
        for (a, b) in w.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12, "{} != {}", a, b);
        }
    }

    #[test]
    fn test_savgol_short_series_unchanged() {
        let x = Array1::from(vec![1.0, 5.0]);
        let y = savgol_filter(&x, 11);
        assert_eq!(y, x);
    }

    #[test]
    fn test_savgol_window_shrinks_to_odd() {
        // 4 samples force a 3-point window; a line survives it exactly
        let x = Array1::from(vec![0.0, 1.0, 2.0, 3.0]);
        let y = savgol_filter(&x, 11);
        for (a, b) in x.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rolling_mean_trailing_window() {
        let x = Array1::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = rolling_mean(&x, 3);
        let expected = [1.0, 1.5, 2.0, 3.0, 4.0];
        for (a, b) in y.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12, "{} != {}", a, b);
        }
    }

    #[test]
    fn test_rolling_mean_window_wider_than_series() {
        let x = Array1::from(vec![2.0, 4.0]);
        let y = rolling_mean(&x, 30);
        assert!((y[0] - 2.0).abs() < 1e-12);
        assert!((y[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_find_peaks_simple() {
        let x = Array1::from(vec![0.0, 1.0, 0.0, 2.0, 0.0]);
        let peaks = find_peaks(&x, 0.0, 1);
        assert_eq!(peaks, vec![1, 3]);
    }

    #[test]
    fn test_find_peaks_plateau_midpoint() {
        let x = Array1::from(vec![0.0, 1.0, 1.0, 1.0, 0.0]);
        assert_eq!(find_peaks(&x, 0.0, 1), vec![2]);
        // Even-length plateau rounds the midpoint down
        let x = Array1::from(vec![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(find_peaks(&x, 0.0, 1), vec![1]);
    }

    #[test]
    fn test_find_peaks_distance_prunes_lower() {
        let x = Array1::from(vec![0.0, 1.0, 0.0, 5.0, 0.0]);
        // Gap of 2 < 3, so the lower peak goes
        assert_eq!(find_peaks(&x, 0.0, 3), vec![3]);
    }

    #[test]
    fn test_find_peaks_distance_boundary_kept() {
        let x = Array1::from(vec![0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
        // Gap of exactly 4 is allowed at distance 4
        assert_eq!(find_peaks(&x, 0.0, 4), vec![1, 5]);
    }

    #[test]
    fn test_find_peaks_equal_height_keeps_leftmost() {
        let x = Array1::from(vec![0.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(find_peaks(&x, 0.0, 3), vec![1]);
    }

    #[test]
    fn test_find_peaks_prominence_inclusive() {
        let x = Array1::from(vec![0.0, 0.5, 0.0]);
        assert_eq!(find_peaks(&x, 0.5, 1), vec![1], "equal prominence must pass");
        assert!(find_peaks(&x, 0.51, 1).is_empty());
    }

    #[test]
    fn test_find_peaks_prominence_stops_at_higher_ground() {
        let x = Array1::from(vec![0.0, 3.0, 1.0, 2.0, 0.0]);
        // Peak at 3 has bases 1 (left, capped by the taller peak) and 0
        let peaks = find_peaks(&x, 1.5, 1);
        assert_eq!(peaks, vec![1], "prominence 1.0 < 1.5 must drop the smaller peak");
    }

    #[test]
    fn test_std_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_population(&values) - 2.0).abs() < 1e-12);
        assert_eq!(std_population(&[]), 0.0);
    }
}
