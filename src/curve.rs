use crate::diagnostics::Diagnostics;
use crate::error::{RestorationError, Result};
use crate::trace::{round_mm, Trace};

/// Theoretical versine is computed on this chord length regardless of the
/// inverse filter's configured rail chord — it is the sensor chord the
/// original versine measurement was taken on.
const CHORD_M: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionType {
    Clothoid,
    Cubic,
    Sine,
    Linear,
}

impl TransitionType {
    /// Shape function `f(p)` for `p` in `[0, 1]`.
    pub(crate) fn weight(self, p: f64) -> f64 {
        match self {
            TransitionType::Clothoid => p * p,
            TransitionType::Cubic => p * p * (3.0 - 2.0 * p),
            TransitionType::Sine => (1.0 - (std::f64::consts::PI * p).cos()) / 2.0,
            TransitionType::Linear => p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub start_m: f64,
    pub length_m: f64,
    pub end_m: f64,
    pub transition_type: TransitionType,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveElement {
    pub start_m: f64,
    pub end_m: f64,
    pub radius_m: f64,
    pub transition: Option<Transition>,
}

impl CurveElement {
    pub fn validate(&self) -> Result<()> {
        if self.start_m >= self.end_m {
            return Err(RestorationError::GeometryError(format!(
                "curve start_m ({}) must be < end_m ({})",
                self.start_m, self.end_m
            )));
        }
        if self.radius_m <= 0.0 {
            return Err(RestorationError::GeometryError(format!(
                "curve radius_m must be positive, got {}",
                self.radius_m
            )));
        }
        if let Some(t) = self.transition {
            let half_length = (self.end_m - self.start_m) / 2.0;
            if t.length_m > half_length {
                return Err(RestorationError::GeometryError(format!(
                    "transition length {} exceeds half the curve span {}",
                    t.length_m, half_length
                )));
            }
        }
        Ok(())
    }

    fn theoretical_versine(&self) -> f64 {
        (CHORD_M * CHORD_M * 1000.0) / (8.0 * self.radius_m)
    }

    /// Theoretical versine value at `position`, or `0.0` outside the
    /// curve's span.
    fn versine_at(&self, position: f64) -> f64 {
        if position < self.start_m || position > self.end_m {
            return 0.0;
        }
        let v_c = self.theoretical_versine();

        let Some(t) = self.transition else {
            return v_c;
        };

        let entry_end = self.start_m + t.length_m;
        let exit_start = self.end_m - t.length_m;

        if position < entry_end {
            let p = (position - self.start_m) / t.length_m;
            v_c * t.transition_type.weight(p)
        } else if position > exit_start {
            let p = 1.0 - (position - exit_start) / t.length_m;
            v_c * t.transition_type.weight(p)
        } else {
            v_c
        }
    }
}

/// Validate a list of curve elements. Invariant violations per element
/// are hard errors; overlap between two curves is a warning only.
pub fn validate_curves(curves: &[CurveElement], diagnostics: &mut Diagnostics) -> Result<()> {
    for curve in curves {
        curve.validate()?;
    }

    for i in 0..curves.len() {
        for j in (i + 1)..curves.len() {
            let (a, b) = (&curves[i], &curves[j]);
            if a.start_m < b.end_m && b.start_m < a.end_m {
                diagnostics.push_warning(format!(
                    "curve {i} [{}, {}] overlaps curve {j} [{}, {}]",
                    a.start_m, a.end_m, b.start_m, b.end_m
                ));
            }
        }
    }
    Ok(())
}

/// Weights applied to the two neighbor samples on each side of a
/// transition endpoint in the D/6 correction. The source's heuristic
/// default is `(0.7, 0.4)` (SPEC_FULL.md §9 open question); exposed here
/// as configuration rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct D6Config {
    pub neighbor_factors: [f64; 2],
}

impl Default for D6Config {
    fn default() -> D6Config {
        D6Config {
            neighbor_factors: [0.7, 0.4],
        }
    }
}

/// Result of subtracting theoretical curve versine from a trace.
#[derive(Debug, Clone)]
pub struct CurveSubtractResult {
    pub trace: Trace,
    pub rms_before: f64,
    pub rms_after: f64,
    pub fraction_in_curves: f64,
    pub improvement_ratio: f64,
}

/// Subtract the theoretical versine contribution of `curves` from
/// `trace`, with the D/6 chord-endpoint correction applied at every
/// transition boundary.
pub fn subtract_curves(
    trace: &Trace,
    curves: &[CurveElement],
    d6: D6Config,
) -> Result<(CurveSubtractResult, Diagnostics)> {
    let mut diagnostics = Diagnostics::new();
    validate_curves(curves, &mut diagnostics)?;

    let positions = trace.positions();
    let delta = trace.spacing();
    let n = positions.len();

    let mut theoretical = vec![0.0; n];
    let mut in_curve = vec![false; n];

    for (i, &pos) in positions.iter().enumerate() {
        let mut sum = 0.0;
        let mut inside = false;
        for curve in curves {
            if pos >= curve.start_m && pos <= curve.end_m {
                inside = true;
            }
            sum += curve.versine_at(pos);
        }
        theoretical[i] = sum;
        in_curve[i] = inside;
    }

    for curve in curves {
        if let Some(t) = curve.transition {
            apply_d6_correction(&mut theoretical, &positions, delta, t.start_m, d6, true);
            apply_d6_correction(&mut theoretical, &positions, delta, curve.end_m, d6, false);
        }
    }

    let original = trace.values();
    let subtracted: Vec<f64> = original
        .iter()
        .zip(theoretical.iter())
        .map(|(&o, &t)| round_mm(o - t))
        .collect();

    let rms_before = rms(&original);
    let rms_after = rms(&subtracted);
    let improvement_ratio = if rms_before > 1e-12 {
        1.0 - rms_after / rms_before
    } else {
        0.0
    };
    let fraction_in_curves = in_curve.iter().filter(|&&b| b).count() as f64 / n as f64;

    Ok((
        CurveSubtractResult {
            trace: trace.with_values(&subtracted),
            rms_before,
            rms_after,
            fraction_in_curves,
            improvement_ratio,
        },
        diagnostics,
    ))
}

/// Apply the D/6 endpoint correction at a transition boundary located at
/// `boundary_m`. `is_entry` selects whether the correction adds forward
/// (entry transition, start of curve) or is mirrored (exit transition,
/// end of curve) — the source treats both ends symmetrically, so this
/// only affects which neighbor offsets are used.
fn apply_d6_correction(
    theoretical: &mut [f64],
    positions: &[f64],
    delta: f64,
    boundary_m: f64,
    d6: D6Config,
    is_entry: bool,
) {
    let Some(i) = nearest_index(positions, boundary_m) else {
        return;
    };
    let span = (5.0_f64 / delta).ceil() as usize;
    let j = if is_entry {
        i.checked_add(span)
    } else {
        i.checked_sub(span)
    };
    let Some(j) = j else { return };
    if j >= theoretical.len() {
        return;
    }

    let d = theoretical[j] - theoretical[i];
    theoretical[i] += d / 6.0;

    for (k, &factor) in d6.neighbor_factors.iter().enumerate() {
        let offset = k + 1;
        let neighbor = if is_entry {
            i.checked_add(offset)
        } else {
            i.checked_sub(offset)
        };
        if let Some(idx) = neighbor {
            if idx < theoretical.len() {
                theoretical[idx] += (d / 6.0) * factor;
            }
        }
    }
}

fn nearest_index(positions: &[f64], target: f64) -> Option<usize> {
    if positions.is_empty() {
        return None;
    }
    let delta = positions[1] - positions[0];
    let idx = ((target - positions[0]) / delta).round();
    if idx < 0.0 {
        return None;
    }
    let idx = idx as usize;
    if idx >= positions.len() {
        return None;
    }
    Some(idx)
}

fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| v * v).sum();
    (sum_sq / values.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_trace(values: &[f64], delta: f64) -> Trace {
        let pairs: Vec<(f64, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64 * delta, v))
            .collect();
        Trace::from_pairs(&pairs).unwrap()
    }

    #[test]
    fn rejects_invalid_curve_ordering() {
        let curve = CurveElement {
            start_m: 10.0,
            end_m: 5.0,
            radius_m: 600.0,
            transition: None,
        };
        assert!(curve.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_radius() {
        let curve = CurveElement {
            start_m: 0.0,
            end_m: 10.0,
            radius_m: 0.0,
            transition: None,
        };
        assert!(curve.validate().is_err());
    }

    #[test]
    fn rejects_transition_longer_than_half_span() {
        let curve = CurveElement {
            start_m: 0.0,
            end_m: 10.0,
            radius_m: 600.0,
            transition: Some(Transition {
                start_m: 0.0,
                length_m: 6.0,
                end_m: 6.0,
                transition_type: TransitionType::Cubic,
            }),
        };
        assert!(curve.validate().is_err());
    }

    #[test]
    fn overlap_is_a_warning_not_an_error() {
        let curves = vec![
            CurveElement {
                start_m: 0.0,
                end_m: 50.0,
                radius_m: 600.0,
                transition: None,
            },
            CurveElement {
                start_m: 40.0,
                end_m: 90.0,
                radius_m: 800.0,
                transition: None,
            },
        ];
        let mut diagnostics = Diagnostics::new();
        assert!(validate_curves(&curves, &mut diagnostics).is_ok());
        assert_eq!(diagnostics.warnings.len(), 1);
    }

    #[test]
    fn s3_curve_subtraction_removes_theoretical_versine() {
        // S3: a 600 m-radius curve from 100 to 200 m with 20 m clothoids;
        // build the input trace as *exactly* the theoretical versine, so
        // subtraction should leave RMS below 0.05 mm.
        let delta = 1.0;
        let n = 300;
        let curve = CurveElement {
            start_m: 100.0,
            end_m: 200.0,
            radius_m: 600.0,
            transition: Some(Transition {
                start_m: 100.0,
                length_m: 20.0,
                end_m: 120.0,
                transition_type: TransitionType::Clothoid,
            }),
        };

        let positions: Vec<f64> = (0..n).map(|i| i as f64 * delta).collect();
        let values: Vec<f64> = positions.iter().map(|&p| curve.versine_at(p)).collect();
        let trace = uniform_trace(&values, delta);

        let (result, _) = subtract_curves(&trace, &[curve], D6Config::default()).unwrap();
        assert!(
            result.rms_after < 0.05,
            "rms_after should be < 0.05, got {}",
            result.rms_after
        );
    }

    #[test]
    fn transition_weight_functions_span_zero_to_one() {
        for t in [
            TransitionType::Clothoid,
            TransitionType::Cubic,
            TransitionType::Sine,
            TransitionType::Linear,
        ] {
            assert!(t.weight(0.0).abs() < 1e-9, "{t:?} at p=0 should be 0");
            assert!((t.weight(1.0) - 1.0).abs() < 1e-9, "{t:?} at p=1 should be 1");
        }
    }

    #[test]
    fn constant_arc_versine_matches_closed_form() {
        let curve = CurveElement {
            start_m: 0.0,
            end_m: 100.0,
            radius_m: 500.0,
            transition: None,
        };
        let expected = (10.0_f64 * 10.0 * 1000.0) / (8.0 * 500.0);
        assert!((curve.versine_at(50.0) - expected).abs() < 1e-9);
        assert_eq!(curve.versine_at(-1.0), 0.0);
        assert_eq!(curve.versine_at(101.0), 0.0);
    }
}
