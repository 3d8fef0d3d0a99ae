use crate::diagnostics::{Diagnostics, Issue};
use crate::error::{RestorationError, Result};
use crate::stats::Statistics;
use crate::trace::{round_mm, Trace};

/// A zero crossing between two adjacent samples, interpolated to
/// fractional position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroCrossing {
    pub position_m: f64,
    pub index: usize,
}

/// Find every interior sign change, reporting the interpolated crossing
/// position `x_i + Δ·|v_i| / (|v_i| + |v_{i+1}|)`.
pub fn detect_zero_crossings(trace: &Trace) -> Vec<ZeroCrossing> {
    let values = trace.values();
    let positions = trace.positions();
    let delta = trace.spacing();
    let mut crossings = Vec::new();

    for i in 0..values.len().saturating_sub(1) {
        let (vi, vi1) = (values[i], values[i + 1]);
        if (vi > 0.0 && vi1 < 0.0) || (vi < 0.0 && vi1 > 0.0) {
            let frac = vi.abs() / (vi.abs() + vi1.abs());
            crossings.push(ZeroCrossing {
                position_m: positions[i] + delta * frac,
                index: i,
            });
        } else if vi == 0.0 && i > 0 {
            crossings.push(ZeroCrossing {
                position_m: positions[i],
                index: i,
            });
        }
    }
    crossings
}

/// Movement-clamp limits applied after smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementLimits {
    pub max_up_mm: f64,
    pub max_down_mm: f64,
}

impl Default for MovementLimits {
    fn default() -> MovementLimits {
        MovementLimits {
            max_up_mm: 50.0,
            max_down_mm: 10.0,
        }
    }
}

/// Optional convex-mode bias, emulating a single-direction MTT lift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvexBias {
    pub mm_per_10_segments: f64,
    pub smoothing: f64,
}

impl Default for ConvexBias {
    fn default() -> ConvexBias {
        ConvexBias {
            mm_per_10_segments: 20.0,
            smoothing: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanLineConfig {
    pub long_wavelength_m: f64,
    pub smoothing_fraction: f64,
    pub limits: MovementLimits,
    pub convex: Option<ConvexBias>,
}

impl Default for PlanLineConfig {
    fn default() -> PlanLineConfig {
        PlanLineConfig {
            long_wavelength_m: 40.0,
            smoothing_fraction: 0.1,
            limits: MovementLimits::default(),
            convex: None,
        }
    }
}

impl PlanLineConfig {
    fn validate(&self) -> Result<()> {
        if self.long_wavelength_m <= 0.0 {
            return Err(RestorationError::InvalidInput(
                "long_wavelength_m must be positive".to_string(),
            ));
        }
        if !(self.smoothing_fraction > 0.0 && self.smoothing_fraction <= 1.0) {
            return Err(RestorationError::InvalidInput(
                "smoothing_fraction must be in (0, 1]".to_string(),
            ));
        }
        if self.limits.max_up_mm < 0.0 || self.limits.max_down_mm < 0.0 {
            return Err(RestorationError::InvalidInput(
                "movement limits must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanLineStatistics {
    pub raise_ratio: f64,
    pub lower_ratio: f64,
    pub max_raise_mm: f64,
    pub max_lower_mm: f64,
    pub avg_raise_mm: f64,
    pub avg_lower_mm: f64,
    pub movement_variance: f64,
}

#[derive(Debug, Clone)]
pub struct PlanLineResult {
    pub plan_line: Trace,
    pub movement: Trace,
    pub statistics: PlanLineStatistics,
}

/// Gaussian smoothing kernel of radius `radius` with weight
/// `exp(-j^2 * 9 / (2 * radius^2))`.
fn gaussian_smooth(values: &[f64], radius: usize) -> Vec<f64> {
    let n = values.len();
    let mut weights = Vec::with_capacity(radius + 1);
    for j in 0..=radius {
        let j2 = (j * j) as f64;
        weights.push((-j2 * 9.0 / (2.0 * (radius as f64) * (radius as f64))).exp());
    }

    let mut out = vec![0.0; n];
    for i in 0..n {
        let mut acc = 0.0;
        let mut weight_total = 0.0;
        for j in 0..=radius {
            let w = weights[j];
            if let Some(idx) = i.checked_sub(j) {
                acc += w * values[idx];
                weight_total += w;
            }
            if j > 0 {
                let idx = i + j;
                if idx < n {
                    acc += w * values[idx];
                    weight_total += w;
                }
            }
        }
        out[i] = acc / weight_total;
    }
    out
}

/// Taper the first/last `edge` samples of `movement` toward zero, so the
/// plan line matches the raw line at both ends of the section.
fn apply_edge_taper(movement: &mut [f64], edge: usize) {
    let n = movement.len();
    let edge = edge.min(n / 2);
    for i in 0..edge {
        let factor = (i as f64 + 1.0) / (edge as f64 + 1.0);
        movement[i] *= factor;
        movement[n - 1 - i] *= factor;
    }
}

/// Bias the movement with a triangular wave peaking at `mm_per_10_segments`
/// at the center of each of 10 equal segments, then smooth with `s =
/// bias.smoothing`.
fn apply_convex_bias(movement: &mut [f64], bias: ConvexBias) {
    let n = movement.len();
    if n == 0 {
        return;
    }
    let segment_len = n as f64 / 10.0;

    let mut biased: Vec<f64> = (0..n)
        .map(|i| {
            let segment_pos = (i as f64 % segment_len) / segment_len;
            let triangle = 1.0 - (2.0 * segment_pos - 1.0).abs();
            movement[i] + bias.mm_per_10_segments * triangle
        })
        .collect();

    let radius = (n as f64 * bias.smoothing * 0.1).floor().max(1.0) as usize;
    biased = gaussian_smooth(&biased, radius);
    movement.copy_from_slice(&biased);
}

/// Generate a restored plan line for `trace` (a versine/offset trace with
/// an implied zero-crossing structure).
pub fn generate_plan_line(trace: &Trace, config: PlanLineConfig) -> Result<(PlanLineResult, Diagnostics)> {
    config.validate()?;
    trace.require_len(5, "plan-line generation")?;

    log::debug!(
        "generating plan line for trace len={} delta={}",
        trace.len(),
        trace.spacing()
    );

    let raw = trace.values();
    let n = raw.len();
    let delta = trace.spacing();

    let short_radius = (n as f64 * config.smoothing_fraction * 0.1).floor().max(3.0) as usize;
    let smoothed = gaussian_smooth(&raw, short_radius.max(1));

    let long_radius = ((config.long_wavelength_m / delta).round() as usize).max(1);
    let mut plan = gaussian_smooth(&smoothed, long_radius);

    let mut movement: Vec<f64> = plan
        .iter()
        .zip(raw.iter())
        .map(|(&p, &r)| p - r)
        .collect();

    for m in movement.iter_mut() {
        *m = m.clamp(-config.limits.max_down_mm, config.limits.max_up_mm);
    }

    let edge = (20usize).min((n as f64 * 0.05).floor() as usize).max(1);
    apply_edge_taper(&mut movement, edge);

    if let Some(bias) = config.convex {
        apply_convex_bias(&mut movement, bias);
        for m in movement.iter_mut() {
            *m = m.clamp(-config.limits.max_down_mm, config.limits.max_up_mm);
        }
    }

    for (p, (&r, &m)) in plan.iter_mut().zip(raw.iter().zip(movement.iter())) {
        *p = round_mm(r + m);
    }

    let movement: Vec<f64> = movement.iter().map(|&m| round_mm(m)).collect();

    let raises: Vec<f64> = movement.iter().cloned().filter(|&m| m > 0.0).collect();
    let lowers: Vec<f64> = movement.iter().cloned().filter(|&m| m < 0.0).collect();

    let raise_ratio = raises.len() as f64 / n as f64;
    let lower_ratio = lowers.len() as f64 / n as f64;
    let max_raise_mm = raises.iter().cloned().fold(0.0_f64, f64::max);
    let max_lower_mm = lowers.iter().cloned().fold(0.0_f64, f64::min).abs();
    let avg_raise_mm = if raises.is_empty() {
        0.0
    } else {
        raises.iter().sum::<f64>() / raises.len() as f64
    };
    let avg_lower_mm = if lowers.is_empty() {
        0.0
    } else {
        lowers.iter().sum::<f64>() / lowers.len() as f64
    };
    let movement_variance = Statistics::compute(&movement).variance;

    let mut diagnostics = Diagnostics::new();
    if raise_ratio < 0.3 {
        diagnostics.push_issue(Issue::Error(format!(
            "raise ratio {raise_ratio:.2} is below 0.3; plan line is under-correcting"
        )));
    } else if raise_ratio < 0.5 {
        diagnostics.push_warning(format!(
            "raise ratio {raise_ratio:.2} is below 0.5"
        ));
    }
    if max_raise_mm > 60.0 {
        diagnostics.push_warning(format!("max raise {max_raise_mm:.1} mm exceeds 60 mm"));
    }
    if max_lower_mm > 20.0 {
        diagnostics.push_warning(format!("max lower {max_lower_mm:.1} mm exceeds 20 mm"));
    }
    if movement_variance < 1.0 {
        diagnostics.push_warning("movement is essentially flat across the section".to_string());
    }

    let plan_trace = trace.with_values(&plan);
    let movement_trace = trace.with_values(&movement);

    Ok((
        PlanLineResult {
            plan_line: plan_trace,
            movement: movement_trace,
            statistics: PlanLineStatistics {
                raise_ratio,
                lower_ratio,
                max_raise_mm,
                max_lower_mm,
                avg_raise_mm,
                avg_lower_mm,
                movement_variance,
            },
        },
        diagnostics,
    ))
}
