//! Reserved function-name prefix policy.
//!
//! User code may not define functions whose names start with [`RESERVED_PREFIX`];
//! those names belong to the runtime. Only full definitions are checked:
//! forward declarations of runtime functions are how user code calls them.

use slang_diagnostic::{reserved_function_prefix, DiagnosticSink, SourceMap};
use slang_ir::{DeclGroup, FunctionDecl};
use tracing::debug;

/// Function-name prefix reserved for the runtime.
pub const RESERVED_PREFIX: &str = "rs";

/// Checks top-level declaration groups against the reserved prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedPrefixPolicy {
    prefix: &'static str,
    allowed: bool,
}

impl ReservedPrefixPolicy {
    /// Policy for the standard prefix; `allowed` disables the check.
    pub fn new(allowed: bool) -> Self {
        Self {
            prefix: RESERVED_PREFIX,
            allowed,
        }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Function definitions in `group` that violate the policy, in order.
    pub fn violations<'g>(&self, group: &'g DeclGroup) -> impl Iterator<Item = &'g FunctionDecl> {
        let prefix = self.prefix;
        let allowed = self.allowed;
        group
            .iter()
            .filter_map(|decl| decl.as_function())
            .filter(move |f| !allowed && f.is_definition && f.name.starts_with(prefix))
    }

    /// Report every violation in `group`. Returns the number reported.
    pub fn check_group(
        &self,
        group: &DeclGroup,
        source_map: &SourceMap,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> usize {
        let mut reported = 0;
        for function in self.violations(group) {
            debug!(name = %function.name, "reserved function name prefix");
            let location = source_map.location(function.span);
            diagnostics.report(reserved_function_prefix(
                self.prefix,
                &function.name,
                location,
            ));
            reported += 1;
        }
        reported
    }
}

impl Default for ReservedPrefixPolicy {
    fn default() -> Self {
        Self::new(false)
    }
}
