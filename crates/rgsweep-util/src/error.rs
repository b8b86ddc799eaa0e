//! Error formatting helpers

use std::error::Error;
use std::fmt::Write;

/// Render an error followed by every cause in its `source()` chain,
/// separated by `": "`.
///
/// HTTP client errors keep the interesting part (connect refused, TLS
/// failure, DNS) in their sources, which `Display` alone leaves out.
pub fn error_chain(err: &dyn Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // Some wrappers repeat their cause in their own message
        if !rendered.ends_with(&text) {
            let _ = write!(rendered, ": {}", text);
        }
        source = cause.source();
    }
    rendered
}
