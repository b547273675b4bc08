//! Ordered include/exclude glob filtering over relative artifact paths.
//!
//! # Architecture
//!
//! - `options.rs` - Match flags (case, dot files, braces, comments, negation)
//! - `brace.rs` - `{a,b}` alternation expansion
//! - `glob.rs` - Single glob compiled to an anchored regex
//! - `filter.rs` - Pattern list evaluation against a path universe
//!
//! Every pattern is evaluated against the full path universe in list order.
//! Includes union their hits into the result, excludes remove theirs, so a
//! later pattern always has the final say over the paths it matches.
//!
//! ```
//! use artifetch_filter::{filter, MatchOptions};
//!
//! let paths = ["a/build.log", "a/app.zip"];
//! let selected = filter(&paths, &["**", "!**/*.log"], &MatchOptions::default());
//! assert!(selected.contains("a/app.zip"));
//! assert!(!selected.contains("a/build.log"));
//! ```

pub use brace::expand_braces;
pub use error::{Error, Result};
pub use filter::{CompiledPattern, Filter, PatternKind, SkippedPattern, filter};
pub use glob::Glob;
pub use options::MatchOptions;

mod brace;
mod error;
mod filter;
mod glob;
mod options;
