//! Diagnostic system for the Slang backend.
//!
//! - Error codes for searchability
//! - Clear messages (what went wrong)
//! - Resolved source locations (where it went wrong)
//! - A sink trait so drivers decide how diagnostics are rendered

mod diagnostic;
mod error_code;
pub mod queue;
mod source_map;

pub use diagnostic::{
    invalid_target_description, module_identity_mismatch, output_write_failed, reserved_function_prefix,
    unable_to_create_target, unable_to_interface_with_target, Diagnostic, Severity,
};
pub use error_code::ErrorCode;
pub use queue::{DiagnosticQueue, DiagnosticSink};
pub use source_map::{SourceLocation, SourceMap};
