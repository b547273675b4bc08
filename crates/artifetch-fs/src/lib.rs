//! Filesystem primitives for materializing artifact trees.
//!
//! Many transfer workers write into one target tree at once. Each worker owns
//! a disjoint file path, so the only shared operation is directory creation,
//! which is idempotent here and safe to race.

mod copy;
mod dir;
mod error;
mod moves;
mod path;
mod staging;
mod walk;

pub use copy::copy_file;
pub use dir::{ensure_dir, ensure_dir_async};
pub use error::{Error, Result};
pub use moves::move_dir_contents;
pub use path::{join_relative, relative_slash_path};
pub use staging::StagingDir;
pub use walk::{WalkEntry, walk_files};
