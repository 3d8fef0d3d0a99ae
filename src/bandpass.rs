use crate::diagnostics::Diagnostics;
use crate::error::{RestorationError, Result};
use crate::fft::{fft, ifft, next_pow2};
use crate::stats::Statistics;
use crate::trace::{round_mm, Trace};
use crate::window::Window;

/// Relative priority of a band in a multi-band composite, driving the
/// weighting applied before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandPriority {
    High,
    Medium,
    Low,
}

impl BandPriority {
    fn weight(self) -> f64 {
        match self {
            BandPriority::High => 1.0,
            BandPriority::Medium => 0.7,
            BandPriority::Low => 0.4,
        }
    }
}

/// A named wavelength band, e.g. `("short", 1.0, 10.0, High)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSpec {
    pub name: String,
    pub wavelength_min_m: f64,
    pub wavelength_max_m: f64,
    pub priority: BandPriority,
}

impl BandSpec {
    pub fn new(
        name: impl Into<String>,
        wavelength_min_m: f64,
        wavelength_max_m: f64,
        priority: BandPriority,
    ) -> Result<BandSpec> {
        if !(wavelength_min_m > 0.0 && wavelength_min_m < wavelength_max_m) {
            return Err(RestorationError::InvalidInput(format!(
                "band must satisfy 0 < min < max, got min={wavelength_min_m} max={wavelength_max_m}"
            )));
        }
        Ok(BandSpec {
            name: name.into(),
            wavelength_min_m,
            wavelength_max_m,
            priority,
        })
    }
}

/// Result of decomposing a trace into a single wavelength band.
#[derive(Debug, Clone)]
pub struct BandResult {
    pub name: String,
    pub trace: Trace,
    pub statistics: Statistics,
}

/// Result of a multi-band decomposition: per-band results plus a
/// priority-weighted composite.
#[derive(Debug, Clone)]
pub struct MultiBandResult {
    pub bands: Vec<BandResult>,
    pub composite: Trace,
    pub composite_statistics: Statistics,
}

/// Decompose `trace` into a single wavelength band `[wavelength_min_m,
/// wavelength_max_m]` using a raised-cosine mask in the DFT domain.
pub fn decompose_band(
    trace: &Trace,
    window: Window,
    band: &BandSpec,
) -> Result<(BandResult, Diagnostics)> {
    let mut diagnostics = Diagnostics::new();
    let n = trace.len();
    let radius = band.wavelength_max_m / trace.spacing();
    if (n as f64) < 2.0 * radius {
        diagnostics.push_warning(format!(
            "trace length {n} is short relative to band '{}' (max wavelength {} m); \
             band-pass result may be unreliable",
            band.name, band.wavelength_max_m
        ));
    }

    let delta = trace.spacing();
    let values = trace.values();
    let m = next_pow2(n);

    let coeffs = window.coefficients(n);
    let mut windowed = values.clone();
    for (s, w) in windowed.iter_mut().zip(coeffs.iter()) {
        *s *= w;
    }

    let spectrum = fft(&windowed);
    let masked = apply_bandpass_mask(&spectrum, m, delta, band);
    let recovered = ifft(&masked);

    // The window attenuates RMS by its own RMS value (mean of w^2, not mean
    // of w) since the mask round-trip reproduces `w[n] * x[n]` exactly for a
    // pass-all mask. Divide the scalar back out so band amplitude is
    // reported on the original trace's scale rather than the windowed one.
    let window_rms = (coeffs.iter().map(|&w| w * w).sum::<f64>() / n.max(1) as f64).sqrt();
    let gain = if window_rms > 1e-9 { window_rms } else { 1.0 };

    let band_values: Vec<f64> = recovered[..n]
        .iter()
        .map(|&v| round_mm(v / gain))
        .collect();
    let band_trace = trace.with_values(&band_values);
    let statistics = Statistics::compute(&band_values);

    Ok((
        BandResult {
            name: band.name.clone(),
            trace: band_trace,
            statistics,
        },
        diagnostics,
    ))
}

/// Build the raised-cosine band-pass mask over a length-`m` spectrum and
/// multiply it in (mirrored onto the negative-frequency half).
fn apply_bandpass_mask(
    spectrum: &[num_complex::Complex<f64>],
    m: usize,
    delta: f64,
    band: &BandSpec,
) -> Vec<num_complex::Complex<f64>> {
    let f_lo = delta / band.wavelength_max_m;
    let f_hi = delta / band.wavelength_min_m;

    let mut masked = vec![num_complex::Complex::new(0.0, 0.0); m];
    for k in 0..m {
        // Fold k into [0, m/2] to get the cycles/sample frequency;
        // negative-frequency bins mirror the same weight.
        let k_folded = if k <= m / 2 { k } else { m - k };
        let f_k = k_folded as f64 / m as f64;

        let weight = if f_k >= f_lo && f_k <= f_hi && f_hi > f_lo {
            0.5 * (1.0 - (2.0 * std::f64::consts::PI * (f_k - f_lo) / (f_hi - f_lo)).cos())
        } else {
            0.0
        };

        masked[k] = spectrum[k] * weight;
    }
    masked
}

/// Run several bands in one pass and produce a priority-weighted,
/// normalized composite.
pub fn decompose_multi_band(
    trace: &Trace,
    window: Window,
    bands: &[BandSpec],
) -> Result<(MultiBandResult, Diagnostics)> {
    if bands.is_empty() {
        return Err(RestorationError::InvalidInput(
            "at least one band is required".to_string(),
        ));
    }

    let mut diagnostics = Diagnostics::new();
    let mut results = Vec::with_capacity(bands.len());
    let mut weighted_sum = vec![0.0; trace.len()];
    let mut max_weight = 0.0_f64;

    for band in bands {
        let (result, band_diag) = decompose_band(trace, window, band)?;
        diagnostics.warnings.extend(band_diag.warnings);
        diagnostics.issues.extend(band_diag.issues);

        let w = band.priority.weight();
        max_weight = max_weight.max(w);
        for (acc, &v) in weighted_sum.iter_mut().zip(result.trace.values().iter()) {
            *acc += w * v;
        }
        results.push(result);
    }

    // Bands cover disjoint wavelength ranges, so the composite is a sum of
    // priority-weighted contributions, not an average of them — dividing
    // by the summed weights would attenuate the composite by the band
    // count even when every band carries the same (e.g. High) priority.
    // Normalizing by the highest weight present keeps full-priority bands
    // at unit strength while still de-emphasizing lower-priority ones
    // relative to them.
    let composite_values: Vec<f64> = weighted_sum
        .iter()
        .map(|&v| round_mm(v / max_weight.max(1e-9)))
        .collect();
    let composite = trace.with_values(&composite_values);
    let composite_statistics = Statistics::compute(&composite_values);

    Ok((
        MultiBandResult {
            bands: results,
            composite,
            composite_statistics,
        },
        diagnostics,
    ))
}
