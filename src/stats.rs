/// Summary statistics shared by the band-pass decomposer, curve subtractor,
/// and plan-line generator.
///
/// Variance is population variance (divides by N, not N−1) to match the
/// RMS-centric framing of the source material, which never treats a trace
/// as a sample drawn from a larger population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub mean: f64,
    pub variance: f64,
    pub stddev: f64,
    pub rms: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
}

impl Statistics {
    /// Compute statistics in a single pass over `values`.
    ///
    /// Returns all-zero statistics for an empty slice rather than erroring;
    /// callers that need at least one sample validate that separately.
    pub fn compute(values: &[f64]) -> Statistics {
        let n = values.len();
        if n == 0 {
            return Statistics {
                mean: 0.0,
                variance: 0.0,
                stddev: 0.0,
                rms: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let mut sum = 0.0_f64;
        let mut sum_sq = 0.0_f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for &v in values {
            sum += v;
            sum_sq += v * v;
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }

        let count = n as f64;
        let mean = sum / count;
        let mean_sq = sum_sq / count;
        // Clamp against floating-point cancellation when mean_sq ~ mean^2.
        let variance = (mean_sq - mean * mean).max(0.0);
        let stddev = variance.sqrt();
        let rms = mean_sq.max(0.0).sqrt();

        Statistics {
            mean,
            variance,
            stddev,
            rms,
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slice_is_all_zero() {
        let s = Statistics::compute(&[]);
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.rms, 0.0);
        assert_eq!(s.peak_to_peak, 0.0);
    }

    #[test]
    fn constant_signal_has_zero_variance() {
        let s = Statistics::compute(&[3.0; 50]);
        assert!((s.mean - 3.0).abs() < 1e-12);
        assert!(s.variance.abs() < 1e-12);
        assert!((s.rms - 3.0).abs() < 1e-9);
        assert_eq!(s.peak_to_peak, 0.0);
    }

    #[test]
    fn sine_wave_rms_is_sqrt_half_amplitude_squared() {
        let n = 10_000;
        let values: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 37.0).sin())
            .collect();
        let s = Statistics::compute(&values);
        // RMS of a unit sine over many periods approaches 1/sqrt(2).
        assert!((s.rms - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);
    }

    #[test]
    fn min_max_and_peak_to_peak() {
        let s = Statistics::compute(&[-2.0, 5.0, 1.0, -1.0]);
        assert_eq!(s.min, -2.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.peak_to_peak, 7.0);
    }
}
