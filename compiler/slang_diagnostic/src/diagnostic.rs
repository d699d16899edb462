use std::fmt;

use crate::{ErrorCode, SourceLocation};

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A backend diagnostic.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    /// Error code for searchability.
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    /// Where the problem was found, when it relates to a declaration.
    pub location: Option<SourceLocation>,
    /// Additional notes providing context.
    pub notes: Vec<String>,
}

impl Diagnostic {
    fn new_with_severity(code: ErrorCode, severity: Severity) -> Self {
        Diagnostic {
            code,
            severity,
            message: String::new(),
            location: None,
            notes: Vec::new(),
        }
    }

    /// Create a new error diagnostic.
    pub fn error(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Error)
    }

    /// Create a new warning diagnostic.
    pub fn warning(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Warning)
    }

    /// Set the main message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach a resolved source location.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Add a note providing additional context.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Check if this is an error (vs warning/note).
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{location}: ")?;
        }
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;

        for note in &self.notes {
            write!(f, "\n  = note: {note}")?;
        }

        Ok(())
    }
}

// Helper constructors for the backend's diagnostics.

/// A full function definition uses the reserved name prefix.
pub fn reserved_function_prefix(
    prefix: &str,
    name: &str,
    location: SourceLocation,
) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1001)
        .with_message(format!(
            "invalid function name prefix, \"{prefix}\" is reserved: '{name}'"
        ))
        .with_location(location)
}

/// The module's target triple does not resolve to a registered target.
pub fn unable_to_create_target(reason: impl fmt::Display) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2001)
        .with_message(format!("unable to create target: '{reason}'"))
}

/// The target machine refused to populate the codegen pipeline.
pub fn unable_to_interface_with_target(reason: impl fmt::Display) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2002)
        .with_message("unable to interface with target machine")
        .with_note(reason.to_string())
}

/// Emitting the artifact failed with an I/O error.
pub fn output_write_failed(error: impl fmt::Display) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2003).with_message(format!("failed to write output: {error}"))
}

/// The configured target description does not parse as a data layout.
pub fn invalid_target_description(description: &str, reason: impl fmt::Display) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2004)
        .with_message(format!("invalid target description: {reason}"))
        .with_note(format!("target description is '{description}'"))
}

/// The generator handed over a different module than the one it initialized.
pub fn module_identity_mismatch(expected: &str, found: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E9001)
        .with_message("module handed over by IR generation is not the initialized module")
        .with_note(format!("expected '{expected}', found '{found}'"))
}
