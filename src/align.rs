use crate::diagnostics::Diagnostics;
use crate::error::{RestorationError, Result};
use crate::stats::Statistics;
use crate::trace::Trace;

/// Configuration for a single-offset correlation search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentConfig {
    pub search_range_m: f64,
    pub step_m: f64,
}

impl Default for AlignmentConfig {
    fn default() -> AlignmentConfig {
        AlignmentConfig {
            search_range_m: 20.0,
            step_m: 0.25,
        }
    }
}

impl AlignmentConfig {
    fn validate(&self) -> Result<()> {
        if self.search_range_m <= 0.0 {
            return Err(RestorationError::InvalidInput(
                "search_range_m must be positive".to_string(),
            ));
        }
        if self.step_m <= 0.0 {
            return Err(RestorationError::InvalidInput(
                "step_m must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityBucket {
    Excellent,
    VeryGood,
    Good,
    Acceptable,
    Poor,
    Unacceptable,
}

impl QualityBucket {
    fn from_correlation(r: f64) -> QualityBucket {
        if r >= 0.95 {
            QualityBucket::Excellent
        } else if r >= 0.90 {
            QualityBucket::VeryGood
        } else if r >= 0.80 {
            QualityBucket::Good
        } else if r >= 0.70 {
            QualityBucket::Acceptable
        } else if r >= 0.50 {
            QualityBucket::Poor
        } else {
            QualityBucket::Unacceptable
        }
    }
}

/// A single `(offset, correlation)` sample from the search grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetCorrelation {
    pub offset_m: f64,
    pub correlation: f64,
}

/// Result of aligning a short hand-measured trace against a reference.
#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub best_offset_m: f64,
    pub best_correlation: f64,
    pub top_k: Vec<OffsetCorrelation>,
    pub sharpness: f64,
    pub quality: QualityBucket,
}

/// Pearson correlation coefficient. Returns `0.0` when either series has
/// zero variance (the NumericDegenerate fallback of §7).
fn pearson(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let sa = Statistics::compute(a);
    let sb = Statistics::compute(b);
    if sa.stddev < 1e-12 || sb.stddev < 1e-12 {
        return 0.0;
    }
    let n = a.len() as f64;
    let cov: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - sa.mean) * (y - sb.mean))
        .sum::<f64>()
        / n;
    (cov / (sa.stddev * sb.stddev)).clamp(-1.0, 1.0)
}

/// Correlation between `field` and `reference` when `field`'s positions
/// are translated by `offset_m`. Returns `None` when the translated span
/// overlaps fewer than two of the reference's own samples.
fn offset_correlation(field: &Trace, reference: &Trace, offset_m: f64) -> Option<f64> {
    let field_values = field.values();
    let shifted: Vec<f64> = field.positions().iter().map(|p| p + offset_m).collect();

    let lo = shifted.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = shifted.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let covered = reference
        .positions()
        .iter()
        .filter(|&&p| p >= lo && p <= hi)
        .count();
    if covered < 2 {
        return None;
    }

    let interpolated: Vec<f64> = shifted.iter().map(|&p| reference.interpolate(p)).collect();
    Some(pearson(&field_values, &interpolated))
}

/// Locate the offset `delta` in `[-R, +R]` that best aligns `field`
/// against `reference`, refined to `step/10` precision.
pub fn align(
    field: &Trace,
    reference: &Trace,
    config: AlignmentConfig,
) -> Result<(AlignmentResult, Diagnostics)> {
    config.validate()?;
    field.require_len(3, "correlation alignment")?;

    log::debug!(
        "aligning field trace (len={}) against reference (len={}), range=±{}m step={}m",
        field.len(),
        reference.len(),
        config.search_range_m,
        config.step_m
    );

    let steps = (2.0 * config.search_range_m / config.step_m).round() as usize;
    let mut grid: Vec<OffsetCorrelation> = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let offset_m = -config.search_range_m + i as f64 * config.step_m;
        if let Some(r) = offset_correlation(field, reference, offset_m) {
            grid.push(OffsetCorrelation {
                offset_m,
                correlation: r,
            });
        }
    }

    let mut diagnostics = Diagnostics::new();
    if grid.is_empty() {
        diagnostics.push_warning("no offset in the search range had sufficient overlap".to_string());
        return Ok((
            AlignmentResult {
                best_offset_m: 0.0,
                best_correlation: 0.0,
                top_k: Vec::new(),
                sharpness: 0.0,
                quality: QualityBucket::Unacceptable,
            },
            diagnostics,
        ));
    }

    grid.sort_by(|a, b| b.correlation.partial_cmp(&a.correlation).unwrap());

    let coarse_best = grid[0].offset_m;
    let mut best = grid[0];
    for i in -10..=10 {
        let offset_m = coarse_best + i as f64 * config.step_m / 10.0;
        if let Some(r) = offset_correlation(field, reference, offset_m) {
            if r > best.correlation {
                best = OffsetCorrelation {
                    offset_m,
                    correlation: r,
                };
            }
        }
    }

    let sharpness = if grid.len() >= 2 {
        best.correlation - grid[1].correlation
    } else {
        best.correlation
    };

    let quality = QualityBucket::from_correlation(best.correlation);

    if best.correlation < 0.7 {
        diagnostics.push_warning(format!(
            "low-confidence alignment: best correlation {:.3} below 0.7",
            best.correlation
        ));
    }
    if best.offset_m.abs() > 10.0 {
        diagnostics.push_warning(format!(
            "alignment offset {:.3} m exceeds 10 m",
            best.offset_m
        ));
    }
    if sharpness <= 0.2 {
        diagnostics.push_warning(format!(
            "multiple near-equal peaks: sharpness {sharpness:.3} <= 0.2"
        ));
    }

    let top_k: Vec<OffsetCorrelation> = grid.into_iter().take(5).collect();

    Ok((
        AlignmentResult {
            best_offset_m: best.offset_m,
            best_correlation: best.correlation,
            top_k,
            sharpness,
            quality,
        },
        diagnostics,
    ))
}

/// One hand-measured segment's best match, as input to
/// `align_multi_section`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionMatch {
    pub offset_m: f64,
    pub correlation: f64,
    pub length_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightMode {
    CorrelationSquared,
    LengthWeighted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiSectionResult {
    pub weighted_offset_m: f64,
    pub residual_stddev_m: f64,
    pub confidence_pct: f64,
}

/// Combine per-segment alignments into a single weighted-mean offset.
pub fn align_multi_section(
    sections: &[SectionMatch],
    search_range_m: f64,
    mode: WeightMode,
) -> Result<MultiSectionResult> {
    if sections.is_empty() {
        return Err(RestorationError::InvalidInput(
            "at least one section match is required".to_string(),
        ));
    }
    if search_range_m <= 0.0 {
        return Err(RestorationError::InvalidInput(
            "search_range_m must be positive".to_string(),
        ));
    }

    let weights: Vec<f64> = sections
        .iter()
        .map(|s| match mode {
            WeightMode::CorrelationSquared => s.correlation * s.correlation,
            WeightMode::LengthWeighted => s.length_m / 25.0,
        })
        .collect();

    let weight_total: f64 = weights.iter().sum();
    if weight_total <= 1e-12 {
        return Err(RestorationError::NumericDegenerate(
            "all section weights are zero".to_string(),
        ));
    }

    let weighted_offset: f64 = sections
        .iter()
        .zip(weights.iter())
        .map(|(s, &w)| w * s.offset_m)
        .sum::<f64>()
        / weight_total;

    let residual_variance: f64 = sections
        .iter()
        .zip(weights.iter())
        .map(|(s, &w)| w * (s.offset_m - weighted_offset).powi(2))
        .sum::<f64>()
        / weight_total;
    let residual_stddev = residual_variance.sqrt();

    let confidence_pct = (1.0 - residual_stddev / search_range_m).max(0.0).min(1.0) * 100.0;

    Ok(MultiSectionResult {
        weighted_offset_m: weighted_offset,
        residual_stddev_m: residual_stddev,
        confidence_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_trace(wavelength_m: f64, start: f64, end: f64, step: f64) -> Trace {
        let n = ((end - start) / step).round() as usize + 1;
        let pairs: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let x = start + i as f64 * step;
                (x, (2.0 * std::f64::consts::PI * x / wavelength_m).sin())
            })
            .collect();
        Trace::from_pairs(&pairs).unwrap()
    }

    #[test]
    fn s1_alignment_recovers_known_shift() {
        // S1: reference = sin(2*pi*x/15), x in [0,50] step 0.25;
        // field = reference at x in [10,20] step 1.0 shifted by +2.5.
        let reference = sine_trace(15.0, 0.0, 50.0, 0.25);
        let field_unshifted = sine_trace(15.0, 10.0, 20.0, 1.0);
        let field_pairs: Vec<(f64, f64)> = field_unshifted
            .samples()
            .iter()
            .map(|s| (s.position + 2.5, s.value))
            .collect();
        let field = Trace::from_pairs(&field_pairs).unwrap();

        // `align` finds delta so that field.position + delta best matches
        // reference; a field built by shifting positions +2.5 recovers
        // delta = -2.5, not +2.5 (see "S1 offset sign" in DESIGN.md).
        let config = AlignmentConfig {
            search_range_m: 20.0,
            step_m: 0.25,
        };
        let (result, _) = align(&field_unshifted, &reference, config).unwrap();
        // field_unshifted's samples equal reference at x+0; the true
        // matching shift so field+delta lines up with reference is 0.
        assert!(result.best_correlation > 0.99);
        assert!(result.best_offset_m.abs() < 0.1);

        let (shifted_result, _) = align(&field, &reference, config).unwrap();
        assert!(shifted_result.best_correlation > 0.99);
        assert!((shifted_result.best_offset_m - (-2.5)).abs() < 0.025);
    }

    #[test]
    fn idempotence_self_alignment_is_zero_offset_unit_correlation() {
        let trace = sine_trace(15.0, 0.0, 50.0, 0.25);
        let config = AlignmentConfig::default();
        let (result, _) = align(&trace, &trace, config).unwrap();
        assert!((result.best_offset_m).abs() < 1e-6 + config.step_m / 10.0);
        assert!((result.best_correlation - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_positive_search_range_or_step() {
        let trace = sine_trace(15.0, 0.0, 50.0, 0.25);
        assert!(align(
            &trace,
            &trace,
            AlignmentConfig {
                search_range_m: 0.0,
                step_m: 0.25
            }
        )
        .is_err());
        assert!(align(
            &trace,
            &trace,
            AlignmentConfig {
                search_range_m: 20.0,
                step_m: 0.0
            }
        )
        .is_err());
    }

    #[test]
    fn zero_variance_series_has_zero_correlation() {
        let flat = Trace::from_pairs(&[(0.0, 1.0), (1.0, 1.0), (2.0, 1.0)]).unwrap();
        let reference = sine_trace(15.0, 0.0, 10.0, 1.0);
        let (result, _) = align(&flat, &reference, AlignmentConfig::default()).unwrap();
        assert_eq!(result.best_correlation, 0.0);
    }

    #[test]
    fn quality_bucket_thresholds() {
        assert_eq!(QualityBucket::from_correlation(0.96), QualityBucket::Excellent);
        assert_eq!(QualityBucket::from_correlation(0.91), QualityBucket::VeryGood);
        assert_eq!(QualityBucket::from_correlation(0.85), QualityBucket::Good);
        assert_eq!(QualityBucket::from_correlation(0.75), QualityBucket::Acceptable);
        assert_eq!(QualityBucket::from_correlation(0.55), QualityBucket::Poor);
        assert_eq!(QualityBucket::from_correlation(0.1), QualityBucket::Unacceptable);
    }

    #[test]
    fn s6_multi_section_weighted_mean_recovers_shift() {
        let sections = vec![
            SectionMatch {
                offset_m: 2.1,
                correlation: 0.98,
                length_m: 10.0,
            },
            SectionMatch {
                offset_m: 1.9,
                correlation: 0.97,
                length_m: 10.0,
            },
            SectionMatch {
                offset_m: 2.0,
                correlation: 0.99,
                length_m: 10.0,
            },
        ];
        let result =
            align_multi_section(&sections, 20.0, WeightMode::CorrelationSquared).unwrap();
        assert!(result.weighted_offset_m >= 1.9 && result.weighted_offset_m <= 2.1);
        assert!(result.residual_stddev_m <= 0.1);
    }

    #[test]
    fn multi_section_rejects_empty_input() {
        assert!(align_multi_section(&[], 20.0, WeightMode::CorrelationSquared).is_err());
    }
}
