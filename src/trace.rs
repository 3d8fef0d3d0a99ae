use crate::error::{RestorationError, Result};

/// A single `(position, value)` measurement. Position in meters, value in
/// millimeters (a versine, an eccentric versine, or a derived geometry
/// value, depending on the producing stage).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(position: f64, value: f64) -> Sample {
        Sample { position, value }
    }
}

/// An ordered sequence of samples on a uniform grid of spacing `Δ`.
///
/// Construction validates strictly increasing, uniformly spaced positions
/// (tolerance `1e-6`) up front; every later stage can then assume a valid
/// grid instead of re-checking it.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    samples: Vec<Sample>,
    spacing: f64,
}

/// Tolerance (in meters) for uniform-spacing validation.
pub const SPACING_TOLERANCE: f64 = 1e-6;

impl Trace {
    /// Build a trace from samples, validating strictly increasing and
    /// uniformly spaced positions.
    pub fn new(samples: Vec<Sample>) -> Result<Trace> {
        if samples.len() < 2 {
            return Err(RestorationError::InvalidInput(format!(
                "trace must have at least 2 samples, got {}",
                samples.len()
            )));
        }

        let spacing = samples[1].position - samples[0].position;
        if spacing <= 0.0 {
            return Err(RestorationError::InvalidInput(
                "trace positions must be strictly increasing".to_string(),
            ));
        }

        for w in samples.windows(2) {
            let d = w[1].position - w[0].position;
            if (d - spacing).abs() > SPACING_TOLERANCE {
                return Err(RestorationError::InvalidInput(format!(
                    "non-uniform spacing: expected {spacing}, got {d}"
                )));
            }
        }

        Ok(Trace { samples, spacing })
    }

    /// Build a trace from `(position, value)` pairs without pre-built
    /// `Sample`s.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Trace> {
        let samples = pairs.iter().map(|&(p, v)| Sample::new(p, v)).collect();
        Trace::new(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn positions(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.position).collect()
    }

    pub fn start(&self) -> f64 {
        self.samples[0].position
    }

    pub fn end(&self) -> f64 {
        self.samples[self.samples.len() - 1].position
    }

    /// Validates the trace has at least `min_len` samples.
    pub fn require_len(&self, min_len: usize, context: &str) -> Result<()> {
        if self.len() < min_len {
            return Err(RestorationError::InvalidInput(format!(
                "{context}: trace length {} below required minimum {min_len}",
                self.len()
            )));
        }
        Ok(())
    }

    /// Build a new trace with the same positions as `self` but replaced
    /// values. `values.len()` must equal `self.len()`.
    pub fn with_values(&self, values: &[f64]) -> Trace {
        debug_assert_eq!(values.len(), self.samples.len());
        let samples = self
            .samples
            .iter()
            .zip(values.iter())
            .map(|(s, &v)| Sample::new(s.position, v))
            .collect();
        Trace {
            samples,
            spacing: self.spacing,
        }
    }

    /// Linearly interpolate the trace's value at an arbitrary position.
    /// Out-of-range positions clamp to the nearest endpoint value.
    pub fn interpolate(&self, position: f64) -> f64 {
        let n = self.samples.len();
        if position <= self.samples[0].position {
            return self.samples[0].value;
        }
        if position >= self.samples[n - 1].position {
            return self.samples[n - 1].value;
        }

        // Uniform grid lets us index directly instead of binary-searching.
        let idx = ((position - self.samples[0].position) / self.spacing).floor() as usize;
        let idx = idx.min(n - 2);
        let a = self.samples[idx];
        let b = self.samples[idx + 1];
        let t = (position - a.position) / (b.position - a.position);
        a.value + t * (b.value - a.value)
    }
}

/// Round a millimeter value to 3 decimal places (millimeter-tenth
/// precision), per the stage-boundary rounding policy of §5.
pub fn round_mm(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
