use std::f64::consts::PI;

/// Analysis window applied before a DFT, matching the cosine-taper
/// construction style of `BandpassFilter::build_gain_curve` in spirit:
/// a closed-form per-sample weight, computed once and cached by the
/// caller rather than recomputed per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    #[default]
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}

impl Window {
    /// Generate the `n`-point window coefficients.
    pub fn coefficients(self, n: usize) -> Vec<f64> {
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![1.0];
        }

        let m = (n - 1) as f64;
        (0..n)
            .map(|i| {
                let x = i as f64 / m;
                match self {
                    Window::Hann => 0.5 * (1.0 - (2.0 * PI * x).cos()),
                    Window::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
                    Window::Blackman => {
                        0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
                    }
                    Window::Rectangular => 1.0,
                }
            })
            .collect()
    }

    /// Apply the window to `signal` in place.
    pub fn apply(self, signal: &mut [f64]) {
        let coeffs = self.coefficients(signal.len());
        for (s, w) in signal.iter_mut().zip(coeffs.iter()) {
            *s *= w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_endpoints_are_zero() {
        let c = Window::Hann.coefficients(16);
        assert!(c[0].abs() < 1e-12);
        assert!(c[15].abs() < 1e-12);
    }

    #[test]
    fn hann_peak_is_near_center() {
        let c = Window::Hann.coefficients(17);
        let peak_idx = c
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(peak_idx, 8);
        assert!((c[8] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rectangular_is_all_ones() {
        let c = Window::Rectangular.coefficients(10);
        assert!(c.iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn hamming_endpoints_are_nonzero() {
        let c = Window::Hamming.coefficients(16);
        assert!((c[0] - 0.08).abs() < 1e-9);
    }

    #[test]
    fn blackman_endpoints_are_near_zero() {
        let c = Window::Blackman.coefficients(16);
        assert!(c[0].abs() < 1e-6);
    }

    #[test]
    fn apply_scales_signal_in_place() {
        let mut signal = vec![1.0; 8];
        Window::Hann.apply(&mut signal);
        assert!(signal[0].abs() < 1e-12);
        assert!(signal[4] > 0.5);
    }

    #[test]
    fn single_sample_window_is_unity() {
        assert_eq!(Window::Hann.coefficients(1), vec![1.0]);
        assert_eq!(Window::Blackman.coefficients(0), Vec::<f64>::new());
    }
}
