use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProjectError>;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid project JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Not a project file (expected *.project.json): {}", .0.display())]
    InvalidProjectFile(PathBuf),

    #[error("Project file has no `tree` object: {}", .0.display())]
    MissingTree(PathBuf),
}
