use crate::diagnostics::Diagnostics;
use crate::error::{RestorationError, Result};
use crate::trace::{round_mm, Trace};

/// Rail gauge family, driving the default chord length used by
/// `versine_to_eccentric`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailType {
    Conventional,
    Shinkansen,
}

impl RailType {
    /// Default eccentric-versine chord length in meters.
    pub fn default_chord_m(self) -> f64 {
        match self {
            RailType::Conventional => 20.0,
            RailType::Shinkansen => 40.0,
        }
    }
}

/// Configuration for the inverse (restoration) filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub lower_wavelength_m: f64,
    pub upper_wavelength_m: f64,
    pub filter_order: usize,
    pub stopband_att: f64,
    pub transition_width: f64,
    pub rail_type: RailType,
}

impl Default for FilterSpec {
    fn default() -> FilterSpec {
        FilterSpec {
            lower_wavelength_m: 3.0,
            upper_wavelength_m: 25.0,
            filter_order: 101,
            stopband_att: 0.01,
            transition_width: 0.2,
            rail_type: RailType::Conventional,
        }
    }
}

impl FilterSpec {
    fn validate(&self) -> Result<()> {
        if self.filter_order < 3 {
            return Err(RestorationError::InvalidInput(format!(
                "filter_order must be >= 3, got {}",
                self.filter_order
            )));
        }
        if self.lower_wavelength_m <= 0.0 || self.upper_wavelength_m <= 0.0 {
            return Err(RestorationError::InvalidInput(
                "restoration band bounds must be positive".to_string(),
            ));
        }
        if self.lower_wavelength_m >= self.upper_wavelength_m {
            return Err(RestorationError::InvalidInput(format!(
                "lower_wavelength_m ({}) must be < upper_wavelength_m ({})",
                self.lower_wavelength_m, self.upper_wavelength_m
            )));
        }
        if !(0.0..1.0).contains(&self.stopband_att) {
            return Err(RestorationError::InvalidInput(
                "stopband_att must be in (0,1)".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.transition_width) {
            return Err(RestorationError::InvalidInput(
                "transition_width must be in (0,1)".to_string(),
            ));
        }
        Ok(())
    }

    /// Auto-correct an even filter order to the next odd one, recording a
    /// diagnostic notice. Called by `InverseFilter::new`.
    fn normalized(&self, diagnostics: &mut Diagnostics) -> FilterSpec {
        let mut spec = *self;
        if spec.filter_order % 2 == 0 {
            diagnostics.push_warning(format!(
                "filter_order {} is even, rounded up to {}",
                spec.filter_order,
                spec.filter_order + 1
            ));
            spec.filter_order += 1;
        }
        spec
    }
}

/// An inverse filter built once from a `FilterSpec` and sample spacing,
/// reusable across many traces (the symmetric impulse response only
/// depends on the spec and `Δ`, not on the signal being restored).
#[derive(Debug, Clone)]
pub struct InverseFilter {
    spec: FilterSpec,
    delta: f64,
    impulse_response: Vec<f64>,
}

impl InverseFilter {
    /// Build the impulse response for `spec` at sample spacing `delta`.
    pub fn new(spec: FilterSpec, delta: f64) -> Result<(InverseFilter, Diagnostics)> {
        spec.validate()?;
        if delta <= 0.0 {
            return Err(RestorationError::InvalidInput(
                "sample spacing must be positive".to_string(),
            ));
        }

        let mut diagnostics = Diagnostics::new();
        let spec = spec.normalized(&mut diagnostics);
        let impulse_response = build_impulse_response(&spec, delta);

        log::debug!(
            "built inverse filter: order={} band=[{}, {}] m delta={delta}",
            spec.filter_order,
            spec.lower_wavelength_m,
            spec.upper_wavelength_m
        );

        Ok((
            InverseFilter {
                spec,
                delta,
                impulse_response,
            },
            diagnostics,
        ))
    }

    pub fn impulse_response(&self) -> &[f64] {
        &self.impulse_response
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Deconvolve `trace` over the restoration band. Boundary samples
    /// attenuate naturally since out-of-range taps are treated as zero
    /// (truncation, not reflection — see SPEC_FULL.md §5 open question).
    pub fn restore(&self, trace: &Trace) -> Result<Trace> {
        if (trace.spacing() - self.delta).abs() > 1e-6 {
            return Err(RestorationError::InvalidInput(format!(
                "trace spacing {} does not match filter spacing {}",
                trace.spacing(),
                self.delta
            )));
        }

        let x = trace.values();
        let y = convolve_centered(&x, &self.impulse_response);
        let rounded: Vec<f64> = y.iter().map(|&v| round_mm(v)).collect();
        Ok(trace.with_values(&rounded))
    }
}

/// Linear convolution `y[n] = sum_k I[k] * x[n - k + floor(N/2)]`, zero
/// outside `x`'s bounds.
fn convolve_centered(x: &[f64], impulse: &[f64]) -> Vec<f64> {
    let n = impulse.len();
    let center = n / 2;
    let len = x.len();
    let mut y = vec![0.0; len];

    for (n_idx, y_n) in y.iter_mut().enumerate() {
        let mut sum = 0.0;
        for (k, &ik) in impulse.iter().enumerate() {
            let x_idx = n_idx as isize - k as isize + center as isize;
            if x_idx >= 0 && (x_idx as usize) < len {
                sum += ik * x[x_idx as usize];
            }
        }
        *y_n = sum;
    }
    y
}

/// Amplitude of the piecewise KANA3-style frequency response at DFT
/// index `k` of an `n`-point transform, per SPEC_FULL.md §4.2.
/// `lambda = delta * n / k` is the wavelength in meters; `delta` is the
/// trace's sample spacing.
fn amplitude_at(k: usize, n: usize, delta: f64, spec: &FilterSpec) -> f64 {
    if k == 0 {
        // k=0 maps to infinite wavelength, which always falls in the
        // outer stopband.
        return spec.stopband_att;
    }

    let lambda = delta * n as f64 / k as f64;
    let t = spec.transition_width;
    let lambda_sl = spec.lower_wavelength_m * (1.0 - t);
    let lambda_rl = spec.lower_wavelength_m;
    let lambda_ru = spec.upper_wavelength_m;
    let lambda_su = spec.upper_wavelength_m * (1.0 + t);
    let alpha = spec.stopband_att;

    if lambda < lambda_sl || lambda > lambda_su {
        alpha
    } else if lambda < lambda_rl {
        let u = (lambda - lambda_sl) / (lambda_rl - lambda_sl);
        alpha + (1.0 - alpha) * (1.0 + (std::f64::consts::PI * (1.0 - u)).cos()) / 2.0
    } else if lambda <= lambda_ru {
        let m = 1.0 - (10.0 * std::f64::consts::PI / lambda).cos();
        if m.abs() < 1e-3 {
            1.0
        } else {
            1.0 / m
        }
    } else {
        let u = (lambda - lambda_ru) / (lambda_su - lambda_ru);
        1.0 + (alpha - 1.0) * (1.0 + (std::f64::consts::PI * u).cos()) / 2.0
    }
}

fn phase_at(k: usize, n: usize) -> f64 {
    -std::f64::consts::PI * (n as f64 - 1.0) * k as f64 / n as f64
}

/// Build the symmetric, linear-phase impulse response of length
/// `spec.filter_order` (odd), mapping DFT index `k` to wavelength via
/// `lambda = delta * N / k`.
fn build_impulse_response(spec: &FilterSpec, delta: f64) -> Vec<f64> {
    let n = spec.filter_order;

    let half = (n - 1) / 2;
    let mut h_mag = vec![0.0; half + 1];
    let mut theta = vec![0.0; half + 1];
    for k in 0..=half {
        h_mag[k] = amplitude_at(k, n, delta, spec);
        theta[k] = phase_at(k, n);
    }

    let mut impulse = vec![0.0; n];
    for (n_idx, i_n) in impulse.iter_mut().enumerate() {
        let mut sum = 0.0;
        for k in 1..=half {
            sum += h_mag[k]
                * (theta[k] + 2.0 * std::f64::consts::PI * k as f64 * n_idx as f64 / n as f64)
                    .cos();
        }
        *i_n = (2.0 / n as f64) * sum + (1.0 / n as f64) * h_mag[0] * theta[0].cos();
    }
    impulse
}

/// Forward 10 m-chord mid-ordinate response `M(lambda) = 1 - cos(10*pi/lambda)`,
/// the un-inverted sensor transfer function whose reciprocal appears in
/// `amplitude_at`'s restoration-band branch. `lambda = delta * n / k`.
/// `k = 0` (infinite wavelength) maps to zero gain: a chord instrument is
/// blind to absolute elevation.
fn chord_amplitude_at(k: usize, n: usize, delta: f64) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let lambda = delta * n as f64 / k as f64;
    1.0 - (10.0 * std::f64::consts::PI / lambda).cos()
}

/// Symmetric, linear-phase impulse response of the forward 10 m-chord
/// sensor, built the same way as `build_impulse_response` but from the
/// un-inverted chord gain at every wavelength rather than the piecewise
/// restoration-band gain.
fn build_chord_response(filter_order: usize, delta: f64) -> Vec<f64> {
    let n = filter_order;
    let half = (n - 1) / 2;
    let mut h_mag = vec![0.0; half + 1];
    let mut theta = vec![0.0; half + 1];
    for k in 0..=half {
        h_mag[k] = chord_amplitude_at(k, n, delta);
        theta[k] = phase_at(k, n);
    }

    let mut impulse = vec![0.0; n];
    for (n_idx, i_n) in impulse.iter_mut().enumerate() {
        let mut sum = 0.0;
        for k in 1..=half {
            sum += h_mag[k]
                * (theta[k] + 2.0 * std::f64::consts::PI * k as f64 * n_idx as f64 / n as f64)
                    .cos();
        }
        *i_n = (2.0 / n as f64) * sum + (1.0 / n as f64) * h_mag[0] * theta[0].cos();
    }
    impulse
}

/// Run `trace` through the forward 10 m-chord sensor response, simulating
/// what a chord-based versine instrument measures from a true centerline.
/// `InverseFilter::restore`'s restoration-band gain is this operator's
/// reciprocal, so applying the two in sequence recovers the input within
/// the restoration band.
pub fn apply_chord_response(trace: &Trace, filter_order: usize) -> Result<Trace> {
    if filter_order < 3 {
        return Err(RestorationError::InvalidInput(
            "filter_order must be >= 3".to_string(),
        ));
    }
    let filter_order = if filter_order % 2 == 0 {
        filter_order + 1
    } else {
        filter_order
    };
    let impulse = build_chord_response(filter_order, trace.spacing());
    let y = convolve_centered(&trace.values(), &impulse);
    let rounded: Vec<f64> = y.iter().map(|&v| round_mm(v)).collect();
    Ok(trace.with_values(&rounded))
}

/// Convert raw versines to eccentric versines: `e[i] = v[i] -
/// (v[i-o] + v[i+o]) / 2` where `o = round((chord/2)/delta)`. Boundary
/// samples (where `i-o` or `i+o` is out of range) pass through unchanged.
pub fn versine_to_eccentric(trace: &Trace, chord_m: f64) -> Result<Trace> {
    if chord_m <= 0.0 {
        return Err(RestorationError::InvalidInput(
            "chord length must be positive".to_string(),
        ));
    }
    let delta = trace.spacing();
    let offset = ((chord_m / 2.0) / delta).round() as isize;
    let v = trace.values();
    let n = v.len() as isize;

    let e: Vec<f64> = (0..n)
        .map(|i| {
            let lo = i - offset;
            let hi = i + offset;
            if lo < 0 || hi >= n {
                v[i as usize]
            } else {
                v[i as usize] - (v[lo as usize] + v[hi as usize]) / 2.0
            }
        })
        .collect();

    Ok(trace.with_values(&e))
}

/// Vertical-curve correction: subtract `delta^2 / (2R) * 1000` mm from
/// interior samples. `adjacent_gradient_change_permille` selects
/// `R = 4000` m when it exceeds 10 permille, else `R = 3000` m.
pub fn vertical_curve_correction(
    trace: &Trace,
    adjacent_gradient_change_permille: f64,
) -> Trace {
    let delta = trace.spacing();
    let radius = if adjacent_gradient_change_permille > 10.0 {
        4000.0
    } else {
        3000.0
    };
    let correction = delta * delta / (2.0 * radius) * 1000.0;

    let v = trace.values();
    let n = v.len();
    let corrected: Vec<f64> = v
        .iter()
        .enumerate()
        .map(|(i, &val)| {
            if i == 0 || i == n - 1 {
                val
            } else {
                val - correction
            }
        })
        .collect();

    trace.with_values(&corrected)
}

/// MTT derivative: `m[i] = r[i] - (w*r[i-b-c] + (1-w)*r[i-c])` where `b`,
/// `c` are BC/CD point offsets in samples and `w = BC/(BC+CD)`.
/// Samples without a full `i-b-c` history pass through unchanged.
pub fn mtt_derivative(trace: &Trace, bc_m: f64, cd_m: f64) -> Result<Trace> {
    if bc_m <= 0.0 || cd_m <= 0.0 {
        return Err(RestorationError::InvalidInput(
            "BC and CD spans must be positive".to_string(),
        ));
    }
    let delta = trace.spacing();
    let b = (bc_m / delta).round() as isize;
    let c = (cd_m / delta).round() as isize;
    let w = bc_m / (bc_m + cd_m);
    let r = trace.values();
    let n = r.len() as isize;

    let m: Vec<f64> = (0..n)
        .map(|i| {
            let idx_bc = i - b - c;
            let idx_c = i - c;
            if idx_bc < 0 || idx_c < 0 {
                r[i as usize]
            } else {
                r[i as usize] - (w * r[idx_bc as usize] + (1.0 - w) * r[idx_c as usize])
            }
        })
        .collect();

    Ok(trace.with_values(&m))
}

/// Cross-adjustment preview: for each displacement `d[i]`, add `d[i]` at
/// `i` and `-d[i]/2` at `i ± 1` (the "one point moves, neighbors
/// compensate by half" rule). Returns a new displacement trace; the
/// input is not mutated.
pub fn cross_adjustment_preview(displacement: &Trace) -> Trace {
    let d = displacement.values();
    let n = d.len();
    let mut out = vec![0.0; n];

    for (i, &di) in d.iter().enumerate() {
        out[i] += di;
        if i > 0 {
            out[i - 1] -= di / 2.0;
        }
        if i + 1 < n {
            out[i + 1] -= di / 2.0;
        }
    }

    displacement.with_values(&out)
}
