use crate::runner::ReportedDiagnostic;
use crate::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Sibling file the problems list is staged in before the rename.
pub fn staging_path(path: &Path) -> PathBuf {
    match path.file_name() {
        Some(name) => {
            let mut staged = OsString::from(name);
            staged.push(".tmp");
            path.with_file_name(staged)
        }
        None => path.with_extension("tmp"),
    }
}

/// Write one `file(line,col): message` entry per diagnostic, replacing the
/// previous file atomically. An empty list still produces an (empty) file.
pub async fn write_problems_file(path: &Path, diagnostics: &[ReportedDiagnostic]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut body = String::new();
    for reported in diagnostics {
        body.push_str(&reported.diagnostic.to_string());
        body.push('\n');
    }

    let tmp = staging_path(path);
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    log::debug!(
        "Wrote {} problems to {}",
        diagnostics.len(),
        path.display()
    );
    Ok(())
}
