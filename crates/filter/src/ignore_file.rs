use crate::{FilterError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const DEFAULT_IGNORE_FILE: &str = ".luauignore";

/// Raw lines of an ignore file. A missing file is an empty pattern list.
pub fn read_ignore_file(path: &Path) -> Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text.lines().map(str::to_string).collect()),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            log::debug!("No ignore file at {}", path.display());
            Ok(Vec::new())
        }
        Err(source) => Err(FilterError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Concatenated lines of every named ignore file under `root`.
pub fn read_ignore_files<S: AsRef<str>>(root: &Path, names: &[S]) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for name in names {
        lines.extend(read_ignore_file(&root.join(name.as_ref()))?);
    }
    Ok(lines)
}
