use crate::curve::TransitionType;
use crate::error::{RestorationError, Result};
use crate::trace::{round_mm, Trace};

/// Blend weight `w(t)` for `t` in `[0, 1]`. The blender's shape-to-formula
/// table differs from the curve subtractor's (`curve::TransitionType::weight`):
/// cubic and clothoid trade formulas between the two components, matching
/// the source's per-component tables rather than a single shared one.
fn blend_weight(shape: TransitionType, t: f64) -> f64 {
    match shape {
        TransitionType::Cubic => 3.0 * t * t - 2.0 * t * t * t,
        TransitionType::Sine => (1.0 - (std::f64::consts::PI * t).cos()) / 2.0,
        TransitionType::Clothoid => t * t * (3.0 - 2.0 * t),
        TransitionType::Linear => t,
    }
}

/// Blend `a` into `b` across `[start_m, start_m + length_m]` using `shape`
/// as the weight function. Outside the window the output equals `a`
/// before the window and `b` after it, so the splice is exact at both
/// endpoints regardless of shape.
pub fn blend_traces(
    a: &Trace,
    b: &Trace,
    start_m: f64,
    length_m: f64,
    shape: TransitionType,
) -> Result<Trace> {
    if length_m <= 0.0 {
        return Err(RestorationError::InvalidInput(
            "length_m must be positive".to_string(),
        ));
    }
    if (a.spacing() - b.spacing()).abs() > 1e-9 {
        return Err(RestorationError::InvalidInput(
            "a and b must share the same sample spacing".to_string(),
        ));
    }
    if (a.start() - b.start()).abs() > 1e-9 || (a.end() - b.end()).abs() > 1e-9 {
        return Err(RestorationError::InvalidInput(
            "a and b must share the same position grid".to_string(),
        ));
    }

    let end_m = start_m + length_m;
    let positions = a.positions();
    let a_values = a.values();
    let b_values = b.values();

    let blended: Vec<f64> = positions
        .iter()
        .enumerate()
        .map(|(i, &pos)| {
            if pos <= start_m {
                a_values[i]
            } else if pos >= end_m {
                b_values[i]
            } else {
                let p = (pos - start_m) / length_m;
                let w = blend_weight(shape, p);
                round_mm(a_values[i] * (1.0 - w) + b_values[i] * w)
            }
        })
        .collect();

    Ok(a.with_values(&blended))
}

/// A waypoint in an auto-connect chain: a target value held constant at
/// `position_m` until the next waypoint's transition begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position_m: f64,
    pub value_mm: f64,
}

/// Connect `K` waypoints end to end, placing a transition of `length_m`
/// centered on the midpoint between each adjacent pair. Values hold flat
/// between transitions.
pub fn auto_connect(
    waypoints: &[Waypoint],
    positions: &[f64],
    spacing: f64,
    length_m: f64,
    shape: TransitionType,
) -> Result<Trace> {
    if waypoints.len() < 2 {
        return Err(RestorationError::InvalidInput(
            "auto_connect requires at least 2 waypoints".to_string(),
        ));
    }
    if length_m <= 0.0 {
        return Err(RestorationError::InvalidInput(
            "length_m must be positive".to_string(),
        ));
    }

    let mut midpoints = Vec::with_capacity(waypoints.len() - 1);
    for w in waypoints.windows(2) {
        let mid = (w[0].position_m + w[1].position_m) / 2.0;
        let half = length_m / 2.0;
        if w[1].position_m - w[0].position_m < length_m {
            return Err(RestorationError::GeometryError(format!(
                "waypoints at {} and {} are too close for transition length {}",
                w[0].position_m, w[1].position_m, length_m
            )));
        }
        midpoints.push((mid - half, mid + half, w[0].value_mm, w[1].value_mm));
    }

    let values: Vec<f64> = positions
        .iter()
        .map(|&pos| {
            for &(start, end, v_a, v_b) in &midpoints {
                if pos < start {
                    continue;
                }
                if pos > end {
                    continue;
                }
                let p = (pos - start) / (end - start);
                let w = blend_weight(shape, p);
                return round_mm(v_a * (1.0 - w) + v_b * w);
            }
            // Outside every transition window: hold the nearest waypoint
            // that has already been passed, or the first if none has.
            let mut held = waypoints[0].value_mm;
            for wp in waypoints {
                if wp.position_m <= pos {
                    held = wp.value_mm;
                }
            }
            round_mm(held)
        })
        .collect();

    if positions.len() >= 2 {
        let observed = positions[1] - positions[0];
        if (observed - spacing).abs() > 1e-9 {
            return Err(RestorationError::InvalidInput(format!(
                "positions spacing {observed} does not match declared spacing {spacing}"
            )));
        }
    }

    let pairs: Vec<(f64, f64)> = positions.iter().cloned().zip(values.into_iter()).collect();
    Trace::from_pairs(&pairs)
}

/// Minimum transition length from the cant-gradient limit:
/// `L = min(200, 1067^2 / radius_m / 15) / cant_gradient_mm_per_m`,
/// clamped to `[20, 100]` metres.
pub fn required_transition_length(radius_m: f64, cant_gradient_mm_per_m: f64) -> Result<f64> {
    if radius_m <= 0.0 {
        return Err(RestorationError::InvalidInput(
            "radius_m must be positive".to_string(),
        ));
    }
    if cant_gradient_mm_per_m <= 0.0 {
        return Err(RestorationError::InvalidInput(
            "cant_gradient_mm_per_m must be positive".to_string(),
        ));
    }

    let length = 200.0_f64.min(1067.0 * 1067.0 / radius_m / 15.0) / cant_gradient_mm_per_m;
    Ok(length.clamp(20.0, 100.0))
}

/// Curvature `kappa(s) = kappa_0 + (kappa_1 - kappa_0) * s / length_m` at
/// `n` evenly spaced arc-length samples over `[0, length_m]`, plus the
/// cumulative deflection angle from trapezoidal integration.
pub fn clothoid_curvature_profile(
    length_m: f64,
    kappa_0: f64,
    kappa_1: f64,
    n: usize,
) -> Result<(Vec<f64>, Vec<f64>)> {
    if length_m <= 0.0 {
        return Err(RestorationError::InvalidInput(
            "length_m must be positive".to_string(),
        ));
    }
    if n < 2 {
        return Err(RestorationError::InvalidInput(
            "n must be at least 2".to_string(),
        ));
    }

    let ds = length_m / (n - 1) as f64;
    let curvature: Vec<f64> = (0..n)
        .map(|i| {
            let s = i as f64 * ds;
            kappa_0 + (kappa_1 - kappa_0) * s / length_m
        })
        .collect();

    let mut deflection = vec![0.0; n];
    for i in 1..n {
        deflection[i] = deflection[i - 1] + 0.5 * (curvature[i] + curvature[i - 1]) * ds;
    }

    Ok((curvature, deflection))
}

/// Curvature profile for an arc entry/exit transition from tangent
/// (`kappa = 0`) to a circular arc of `radius_m`, the common case of
/// [`clothoid_curvature_profile`] with `kappa_0 = 0`, `kappa_1 = 1/radius_m`.
pub fn clothoid_entry_profile(length_m: f64, radius_m: f64, n: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    if radius_m <= 0.0 {
        return Err(RestorationError::InvalidInput(
            "radius_m must be positive".to_string(),
        ));
    }
    clothoid_curvature_profile(length_m, 0.0, 1.0 / radius_m, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_trace(value: f64, n: usize, delta: f64) -> Trace {
        let pairs: Vec<(f64, f64)> = (0..n).map(|i| (i as f64 * delta, value)).collect();
        Trace::from_pairs(&pairs).unwrap()
    }

    #[test]
    fn blend_matches_a_and_b_exactly_at_endpoints() {
        let a = constant_trace(0.0, 200, 0.5);
        let b = constant_trace(20.0, 200, 0.5);
        for shape in [
            TransitionType::Clothoid,
            TransitionType::Cubic,
            TransitionType::Sine,
            TransitionType::Linear,
        ] {
            let blended = blend_traces(&a, &b, 40.0, 20.0, shape).unwrap();
            let idx_before = (20.0 / 0.5) as usize;
            let idx_after = (65.0 / 0.5) as usize;
            assert!((blended.values()[idx_before] - 0.0).abs() < 1e-6);
            assert!((blended.values()[idx_after] - 20.0).abs() < 1e-6);
        }
    }

    #[test]
    fn blend_rejects_mismatched_grids() {
        let a = constant_trace(0.0, 100, 0.5);
        let b = constant_trace(20.0, 100, 0.25);
        assert!(blend_traces(&a, &b, 10.0, 5.0, TransitionType::Cubic).is_err());
    }

    #[test]
    fn blend_derivative_at_endpoints_is_flat_for_smooth_shapes() {
        // blend_weight(t) near t=0 and t=1 should change slowly for the
        // smooth shapes (cubic/sine/clothoid), giving near-zero slope
        // there; linear has constant (non-zero) slope throughout by design.
        let eps = 1e-4;
        for shape in [TransitionType::Cubic, TransitionType::Sine, TransitionType::Clothoid] {
            let d_start = (blend_weight(shape, eps) - blend_weight(shape, 0.0)) / eps;
            let d_end = (blend_weight(shape, 1.0) - blend_weight(shape, 1.0 - eps)) / eps;
            assert!(d_start.abs() < 0.05, "{shape:?} start derivative too steep: {d_start}");
            assert!(d_end.abs() < 0.05, "{shape:?} end derivative too steep: {d_end}");
        }
    }

    #[test]
    fn auto_connect_rejects_too_few_waypoints() {
        let positions: Vec<f64> = (0..100).map(|i| i as f64 * 1.0).collect();
        assert!(auto_connect(
            &[Waypoint {
                position_m: 0.0,
                value_mm: 0.0
            }],
            &positions,
            1.0,
            10.0,
            TransitionType::Cubic
        )
        .is_err());
    }

    #[test]
    fn auto_connect_holds_flat_between_transitions_and_hits_waypoints() {
        let positions: Vec<f64> = (0..400).map(|i| i as f64 * 1.0).collect();
        let waypoints = vec![
            Waypoint {
                position_m: 0.0,
                value_mm: 0.0,
            },
            Waypoint {
                position_m: 100.0,
                value_mm: 30.0,
            },
            Waypoint {
                position_m: 300.0,
                value_mm: 0.0,
            },
        ];
        let result = auto_connect(&waypoints, &positions, 1.0, 20.0, TransitionType::Cubic).unwrap();
        assert!((result.interpolate(5.0) - 0.0).abs() < 1e-6);
        assert!((result.interpolate(150.0) - 30.0).abs() < 1e-6);
    }

    #[test]
    fn required_transition_length_matches_cant_gradient_formula() {
        let radius_m = 600.0;
        let cant_gradient = 1.0;
        let expected = (200.0_f64.min(1067.0 * 1067.0 / radius_m / 15.0) / cant_gradient).clamp(20.0, 100.0);
        let got = required_transition_length(radius_m, cant_gradient).unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn required_transition_length_is_clamped_to_20_100() {
        // Small radius / small gradient and large radius / large gradient
        // both push the raw formula outside [20, 100]; the clamp must hold.
        let tiny_radius = required_transition_length(10.0, 0.01).unwrap();
        assert!((20.0..=100.0).contains(&tiny_radius));
        let huge_radius = required_transition_length(100_000.0, 10.0).unwrap();
        assert!((20.0..=100.0).contains(&huge_radius));
    }

    #[test]
    fn required_transition_length_rejects_non_positive_inputs() {
        assert!(required_transition_length(0.0, 1.0).is_err());
        assert!(required_transition_length(600.0, 0.0).is_err());
    }

    #[test]
    fn clothoid_curvature_profile_is_linear_in_arc_length() {
        let (curvature, deflection) = clothoid_curvature_profile(100.0, 0.0, 100.0 / 600.0, 101).unwrap();
        assert!((curvature[0]).abs() < 1e-12);
        let expected_end = 100.0 / 600.0;
        assert!((curvature[100] - expected_end).abs() < 1e-9);
        assert!(deflection[100] > deflection[50]);
        assert!(deflection[0].abs() < 1e-12);
    }

    #[test]
    fn clothoid_curvature_profile_supports_nonzero_start_curvature() {
        // Reverse curve: kappa runs from +1/r1 to -1/r2.
        let (curvature, _) = clothoid_curvature_profile(50.0, 1.0 / 400.0, -1.0 / 300.0, 51).unwrap();
        assert!((curvature[0] - 1.0 / 400.0).abs() < 1e-9);
        assert!((curvature[50] - (-1.0 / 300.0)).abs() < 1e-9);
    }

    #[test]
    fn clothoid_curvature_profile_rejects_bad_inputs() {
        assert!(clothoid_curvature_profile(0.0, 0.0, 1.0 / 600.0, 10).is_err());
        assert!(clothoid_curvature_profile(100.0, 0.0, 1.0 / 600.0, 1).is_err());
    }

    #[test]
    fn clothoid_entry_profile_matches_general_profile_with_kappa_0() {
        let (entry_curvature, entry_deflection) = clothoid_entry_profile(100.0, 600.0, 51).unwrap();
        let (general_curvature, general_deflection) =
            clothoid_curvature_profile(100.0, 0.0, 1.0 / 600.0, 51).unwrap();
        assert_eq!(entry_curvature, general_curvature);
        assert_eq!(entry_deflection, general_deflection);
        assert!(clothoid_entry_profile(100.0, 0.0, 10).is_err());
    }
}
