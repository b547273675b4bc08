//! Pure decisions: where items land, which patterns apply, how long to back off.

mod layout;
mod patterns;
mod retry;

pub use layout::{artifact_dir, relative_to_root};
pub use patterns::{effective_patterns, scope_patterns};
pub use retry::retry_delay;
