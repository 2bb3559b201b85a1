//! Non-fatal diagnostic stream produced by the pipeline.
//!
//! Binaries routinely contain functions with no discoverable entry, several
//! exits, or unreachable code; none of that aborts analysis. Instead each
//! stage appends structured [`Diagnostic`] entries to a [`Diagnostics`]
//! collector that downstream consumers can inspect, and mirrors them through
//! the [`log`] facade for whoever has a logger installed.

use strum::Display;

/// Severity of a diagnostic entry.
///
/// Nothing in the pipeline is fatal; warnings flag best-effort results,
/// informational entries flag oddities that need no action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum Severity {
    /// Structurally unusual but fully handled (e.g. multiple exits)
    Info,
    /// Analysis produced a degraded, best-effort result (e.g. no entry found)
    Warning,
}

/// One structured diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity of the condition.
    pub severity: Severity,
    /// What the diagnostic is about, usually a function name.
    pub subject: String,
    /// Human-readable description of the condition.
    pub message: String,
}

/// Collector for the pipeline's non-fatal diagnostics.
///
/// # Example
///
/// ```rust
/// use elfscope::analysis::{Diagnostics, Severity};
///
/// let mut diagnostics = Diagnostics::new();
/// diagnostics.warn("fcn_08048100", "no exit found");
///
/// assert_eq!(diagnostics.entries().len(), 1);
/// assert_eq!(diagnostics.entries()[0].severity, Severity::Warning);
/// ```
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning: analysis continued with a degraded result.
    pub fn warn(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        let subject = subject.into();
        let message = message.into();
        log::warn!("{subject}: {message}");
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            subject,
            message,
        });
    }

    /// Records an informational entry.
    pub fn info(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        let subject = subject.into();
        let message = message.into();
        log::info!("{subject}: {message}");
        self.entries.push(Diagnostic {
            severity: Severity::Info,
            subject,
            message,
        });
    }

    /// All recorded entries, in emission order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Iterator over warning-severity entries only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_in_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.info("f", "multiple exits");
        diagnostics.warn("g", "no entry found");

        let entries = diagnostics.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, Severity::Info);
        assert_eq!(entries[1].severity, Severity::Warning);
        assert_eq!(entries[1].subject, "g");
    }

    #[test]
    fn test_warnings_filter() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.info("f", "multiple entries");
        diagnostics.warn("f", "no exit found");
        diagnostics.warn("h", "no entry found");

        assert_eq!(diagnostics.warnings().count(), 2);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
    }
}
