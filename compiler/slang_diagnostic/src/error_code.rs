use std::fmt;

/// Error codes for all backend diagnostics.
///
/// Format: E#### where first digit indicates phase:
/// - E1xxx: Declaration policy errors
/// - E2xxx: Target and code generation errors
/// - E9xxx: Internal compiler errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Policy Errors (E1xxx)
    /// Function name uses the reserved prefix
    E1001,

    // Target Errors (E2xxx)
    /// Unable to create target
    E2001,
    /// Unable to interface with target machine
    E2002,
    /// Failed to write output
    E2003,
    /// Target description is not a valid data layout
    E2004,

    // Internal Errors (E9xxx)
    /// Module handed over does not match the initialized module
    E9001,
}

impl ErrorCode {
    /// Get the string representation of this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "E1001",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E9001 => "E9001",
        }
    }

    /// Check if this is an internal compiler error (E9xxx range).
    pub fn is_internal(&self) -> bool {
        self.as_str().starts_with("E9")
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
