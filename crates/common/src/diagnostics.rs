//! # Diagnostics
//!
//! Sink for configuration warnings and data errors raised while rendering.
//! Nothing raised here ever aborts a render pass.

use std::collections::HashSet;
use std::fmt;
use tracing::{error, info, warn};

use crate::value::InstanceId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// Instance the diagnostic is attached to
    pub context: Option<InstanceId>,
}

/// Host-provided destination for diagnostics
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Routes diagnostics to `tracing`
#[derive(Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        let context = diagnostic.context.map(|c| c.to_string()).unwrap_or_default();
        match diagnostic.severity {
            Severity::Info => info!(%context, "{}", diagnostic.message),
            Severity::Warning => warn!(%context, "{}", diagnostic.message),
            Severity::Error => error!(%context, "{}", diagnostic.message),
        }
    }
}

/// Keeps every diagnostic in memory
#[derive(Default, Debug)]
pub struct CollectingSink {
    pub entries: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.severity == severity)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|d| d.message.contains(needle))
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }
}

/// Front end used by the renderer. Configuration warnings are reported once
/// per (instance, message) until [`Diagnostics::clear`]; data errors are
/// reported every time they are observed.
#[derive(Default, Debug)]
pub struct Diagnostics {
    reported: HashSet<(Option<InstanceId>, String)>,
}

impl Diagnostics {
    pub fn config_warning(&mut self, sink: &mut dyn DiagnosticSink, context: Option<InstanceId>, message: String) {
        if self.reported.insert((context, message.clone())) {
            sink.report(Diagnostic { message, severity: Severity::Warning, context });
        }
    }

    pub fn data_error(&mut self, sink: &mut dyn DiagnosticSink, context: Option<InstanceId>, message: String) {
        sink.report(Diagnostic { message, severity: Severity::Error, context });
    }

    pub fn info(&mut self, sink: &mut dyn DiagnosticSink, context: Option<InstanceId>, message: String) {
        sink.report(Diagnostic { message, severity: Severity::Info, context });
    }

    /// Forget warnings raised for one instance
    pub fn forget(&mut self, instance: InstanceId) {
        self.reported.retain(|(context, _)| *context != Some(instance));
    }

    pub fn clear(&mut self) {
        self.reported.clear();
    }
}
