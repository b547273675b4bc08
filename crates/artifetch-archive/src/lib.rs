//! Tar extraction with entry path sanitization.
//!
//! - `sanitize.rs` - Entry and symlink target containment checks
//! - `extract.rs` - Streaming `.tar` unpacking with a per-entry report

pub use error::{Error, Result};
pub use extract::{ExtractReport, extract_tar, is_tar};
pub use sanitize::{sanitize_entry_path, sanitize_symlink_target};

mod error;
mod extract;
mod sanitize;
