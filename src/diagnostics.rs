/// A single validation finding attached to a result, distinct from a hard
/// `RestorationError`: the operation still produced output, but the
/// caller should know about this.
#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    /// Best correlation, raise ratio, etc. fell below a soft quality
    /// threshold — not wrong, just worth flagging.
    LowConfidence(String),
    /// A non-fatal validation condition was detected (e.g. overlapping
    /// curve elements, a flat plan line).
    Warning(String),
    /// A condition serious enough to call out even though the pipeline
    /// did not abort (e.g. raise ratio far below target).
    Error(String),
}

/// Diagnostics threaded through every result, replacing the "nested
/// callbacks for validation warnings" pattern of the distilled source
/// with a flat, inspectable record (§9).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub issues: Vec<Issue>,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn push_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.warnings.push(message);
    }

    pub fn push_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.warnings.is_empty()
    }
}
