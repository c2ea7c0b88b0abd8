//! Robust (location, scale) estimation with Hampel's redescending M-estimator.
//!
//! Used wherever a plain mean/stdev would be corrupted by outlier
//! correspondences: the zoom estimate, the invariant gates, and the residual
//! statistics. The estimator seeds from the median and MAD, then runs Newton
//! iterations on the location with the scale held fixed.

/// Hampel influence-function knots: linear to `A`, flat to `B`, linearly
/// decaying to zero at `C`, zero beyond.
const HAMPEL_A: f64 = 1.7;
const HAMPEL_B: f64 = 3.4;
const HAMPEL_C: f64 = 8.5;

/// MAD → sigma conversion for a normal distribution.
const MAD_TO_SIGMA: f64 = 0.6745;

const MAX_ITERATIONS: usize = 50;

/// Hampel's redescending ψ and its derivative at standardized residual `r`.
fn hampel_psi(r: f64) -> (f64, f64) {
    let x = r.abs();
    let s = r.signum();
    if x <= HAMPEL_A {
        (r, 1.0)
    } else if x <= HAMPEL_B {
        (HAMPEL_A * s, 0.0)
    } else if x <= HAMPEL_C {
        (
            HAMPEL_A * s * (HAMPEL_C - x) / (HAMPEL_C - HAMPEL_B),
            -HAMPEL_A / (HAMPEL_C - HAMPEL_B),
        )
    } else {
        (0.0, 0.0)
    }
}

/// Median of a sample, reordering a private copy.
fn median(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Robust `(location, scale)` estimate of a sample.
///
/// Returns `None` for an empty sample. A single sample returns `(x, 0.0)`.
/// Otherwise seeds from the median with scale MAD/0.6745 and iterates Newton
/// steps on Hampel's ψ; if the MAD is (near) zero the plain
/// `(median, rms-about-median)` is returned instead.
///
/// Pure function of the input: only private copies are reordered.
pub(crate) fn robust_mean(samples: &[f64]) -> Option<(f64, f64)> {
    let n = samples.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some((samples[0], 0.0));
    }

    let med = median(samples);
    let deviations: Vec<f64> = samples.iter().map(|&x| (x - med).abs()).collect();
    let scale = median(&deviations) / MAD_TO_SIGMA;

    let rms = (samples.iter().map(|&x| (x - med) * (x - med)).sum::<f64>() / n as f64).sqrt();
    if scale <= 1e-10 * med.abs().max(1.0) {
        return Some((med, rms));
    }

    let nf = n as f64;
    let mut location = med;
    let mut variance = scale * scale;

    for _ in 0..MAX_ITERATIONS {
        let mut sum_psi = 0.0;
        let mut sum_dpsi = 0.0;
        let mut sum_psi2 = 0.0;
        for &x in samples {
            let (psi, dpsi) = hampel_psi((x - location) / scale);
            sum_psi += psi;
            sum_dpsi += dpsi;
            sum_psi2 += psi * psi;
        }

        // All residuals past the redescending cutoff: nothing left to pull on.
        if sum_dpsi.abs() < 1e-12 {
            break;
        }

        let step = scale * sum_psi / sum_dpsi;
        location += step;
        variance = scale * scale * nf * nf / (nf - 1.0) * sum_psi2 / (sum_dpsi * sum_dpsi);

        if step * step < 1e-4 * variance || step.abs() < 10.0 * f64::EPSILON {
            break;
        }
    }

    Some((location, variance.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_sample_is_none() {
        assert!(robust_mean(&[]).is_none());
    }

    #[test]
    fn single_sample_has_zero_scale() {
        assert_eq!(robust_mean(&[4.2]), Some((4.2, 0.0)));
    }

    #[test]
    fn constant_sample_returns_median_with_zero_spread() {
        let (loc, dev) = robust_mean(&[2.0, 2.0, 2.0]).unwrap();
        assert_eq!(loc, 2.0);
        assert_eq!(dev, 0.0);
    }

    #[test]
    fn clean_gaussian_like_sample_recovers_center() {
        let samples = [9.8, 10.1, 9.9, 10.2, 10.0, 9.95, 10.05];
        let (loc, dev) = robust_mean(&samples).unwrap();
        assert_relative_eq!(loc, 10.0, epsilon = 0.05);
        assert!(dev > 0.0 && dev < 0.5);
    }

    #[test]
    fn outliers_do_not_corrupt_location() {
        // A plain mean would be dragged to ~175 by the two outliers.
        let samples = [10.0, 10.1, 9.9, 10.05, 9.95, 10.02, 9.98, 1000.0, 500.0];
        let (loc, _) = robust_mean(&samples).unwrap();
        assert_relative_eq!(loc, 10.0, epsilon = 0.1);
    }

    #[test]
    fn hampel_psi_regions() {
        assert_eq!(hampel_psi(1.0), (1.0, 1.0));
        assert_eq!(hampel_psi(2.0), (HAMPEL_A, 0.0));
        let (psi, dpsi) = hampel_psi(-2.0);
        assert_eq!(psi, -HAMPEL_A);
        assert_eq!(dpsi, 0.0);
        // Midway down the descending flank.
        let (psi, _) = hampel_psi(0.5 * (HAMPEL_B + HAMPEL_C));
        assert_relative_eq!(psi, 0.5 * HAMPEL_A, epsilon = 1e-12);
        assert_eq!(hampel_psi(9.0), (0.0, 0.0));
    }
}
