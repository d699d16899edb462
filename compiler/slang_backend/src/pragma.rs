//! Pragma metadata injection.

use slang_ir::{MetadataNode, Module};
use tracing::trace;

/// Ordered `(name, value)` pragmas collected by the front end.
pub type PragmaList = Vec<(String, String)>;

/// Name of the module metadata table holding pragmas.
pub const PRAGMA_METADATA_NAME: &str = "#pragma";

/// Append one `(name, value)` node per pragma to the `#pragma` table.
///
/// An empty list leaves the module untouched. Returns the number of nodes
/// added.
pub fn inject_pragmas(module: &mut Module, pragmas: &[(String, String)]) -> usize {
    if pragmas.is_empty() {
        return 0;
    }

    let table = module.get_or_insert_named_metadata(PRAGMA_METADATA_NAME);
    for (name, value) in pragmas {
        trace!(%name, %value, "injecting pragma");
        table.add_operand(MetadataNode::new([name.as_str(), value.as_str()]));
    }
    pragmas.len()
}
