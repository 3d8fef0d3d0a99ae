use num_complex::Complex;
use std::f64::consts::PI;

pub type Complex64 = Complex<f64>;

/// Round `n` up to the next power of two. `0` and `1` both map to `1`.
pub fn next_pow2(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    n.next_power_of_two()
}

/// Forward radix-2 Cooley-Tukey DFT.
///
/// Zero-pads `real` on the right to `M = next_pow2(N)` and returns the
/// length-`M` complex spectrum. Recursive decimation-in-time.
pub fn fft(real: &[f64]) -> Vec<Complex64> {
    let m = next_pow2(real.len());
    let mut buf: Vec<Complex64> = (0..m)
        .map(|i| Complex::new(*real.get(i).unwrap_or(&0.0), 0.0))
        .collect();
    fft_inplace(&mut buf);
    buf
}

/// Inverse DFT. Expects a length that is a power of two (as produced by
/// `fft`). Returns the real part of the result, scaled by `1/M`.
///
/// Implemented as conjugate -> forward FFT -> conjugate -> scale, which
/// reuses the forward transform verbatim instead of a second code path.
pub fn ifft(spectrum: &[Complex64]) -> Vec<f64> {
    let m = spectrum.len();
    if m == 0 {
        return Vec::new();
    }
    debug_assert!(m.is_power_of_two());

    let mut buf: Vec<Complex64> = spectrum.iter().map(|c| c.conj()).collect();
    fft_inplace(&mut buf);

    let scale = 1.0 / m as f64;
    buf.iter().map(|c| c.conj().re * scale).collect()
}

/// In-place recursive radix-2 decimation-in-time FFT. `buf.len()` must be
/// a power of two.
fn fft_inplace(buf: &mut [Complex64]) {
    let n = buf.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two());

    let mut evens: Vec<Complex64> = buf.iter().step_by(2).copied().collect();
    let mut odds: Vec<Complex64> = buf.iter().skip(1).step_by(2).copied().collect();

    fft_inplace(&mut evens);
    fft_inplace(&mut odds);

    let half = n / 2;
    for k in 0..half {
        // Twiddle factor W_k = exp(-2*pi*i*k/N).
        let angle = -2.0 * PI * k as f64 / n as f64;
        let twiddle = Complex::new(angle.cos(), angle.sin());
        let t = twiddle * odds[k];
        buf[k] = evens[k] + t;
        buf[k + half] = evens[k] - t;
    }
}
