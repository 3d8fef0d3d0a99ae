//! Signal-processing core for restoring railway track geometry from
//! hand-measured versine data: inverse-filtered back to a true centerline,
//! decomposed into wavelength bands, corrected for known curve geometry,
//! aligned against prior survey data, and reduced to a correction plan a
//! tamper can execute.
//!
//! Every stage is a free function over a [`trace::Trace`] (a validated,
//! uniformly spaced position/value series) returning a typed result plus a
//! [`diagnostics::Diagnostics`] record of soft findings. Hard failures are
//! [`error::RestorationError`]; the library never panics on bad input.

pub mod align;
pub mod bandpass;
pub mod blend;
pub mod curve;
pub mod diagnostics;
pub mod error;
pub mod fft;
pub mod inverse_filter;
pub mod planline;
pub mod stats;
pub mod trace;
pub mod window;

pub use align::{
    align, align_multi_section, AlignmentConfig, AlignmentResult, MultiSectionResult,
    OffsetCorrelation, QualityBucket, SectionMatch, WeightMode,
};
pub use bandpass::{
    decompose_band, decompose_multi_band, BandPriority, BandResult, BandSpec, MultiBandResult,
};
pub use blend::{
    auto_connect, blend_traces, clothoid_curvature_profile, clothoid_entry_profile,
    required_transition_length, Waypoint,
};
pub use curve::{
    subtract_curves, validate_curves, CurveElement, CurveSubtractResult, D6Config, Transition,
    TransitionType,
};
pub use diagnostics::{Diagnostics, Issue};
pub use error::{RestorationError, Result};
pub use fft::{fft, ifft, next_pow2};
pub use inverse_filter::{
    apply_chord_response, cross_adjustment_preview, mtt_derivative, vertical_curve_correction,
    versine_to_eccentric, FilterSpec, InverseFilter, RailType,
};
pub use planline::{
    detect_zero_crossings, generate_plan_line, ConvexBias, MovementLimits, PlanLineConfig,
    PlanLineResult, PlanLineStatistics, ZeroCrossing,
};
pub use stats::Statistics;
pub use trace::{round_mm, Sample, Trace};
pub use window::Window;
