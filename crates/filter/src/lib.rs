//! Ignore patterns in the conventional ignore-file syntax.
//!
//! Patterns come from ignore files (`.luauignore` by default), the project's
//! `globIgnorePaths`, and user configuration. They are matched relative to
//! the project root; negated (`!`) lines are reported and skipped.

mod error;
mod ignore_file;
mod pattern;

pub use error::{FilterError, Result};
pub use ignore_file::{read_ignore_file, read_ignore_files, DEFAULT_IGNORE_FILE};
pub use pattern::{IgnoreFilter, IgnorePattern};
