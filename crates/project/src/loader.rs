use crate::glob::normalize_path;
use crate::{ProjectError, Result, TreeEntry};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROJECT_FILE_SUFFIX: &str = ".project.json";

/// A parsed Rojo project description.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub file: PathBuf,
    pub tree: TreeEntry,
    /// `globIgnorePaths` from the project file, verbatim.
    pub glob_ignore_paths: Vec<String>,
}

pub fn load_project(path: impl AsRef<Path>) -> Result<Project> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if !file_name.ends_with(PROJECT_FILE_SUFFIX) || file_name.len() == PROJECT_FILE_SUFFIX.len()
    {
        return Err(ProjectError::InvalidProjectFile(path.to_path_buf()));
    }

    let text = fs::read_to_string(path)?;
    let mut project = parse_project(&text, path)?;
    if project.name.is_empty() {
        project.name = file_name
            .trim_end_matches(PROJECT_FILE_SUFFIX)
            .to_string();
    }
    log::debug!(
        "Loaded project `{}` from {} ({} nodes)",
        project.name,
        path.display(),
        project.tree.node_count()
    );
    Ok(project)
}

/// Parse project JSON. `origin` is only used for error messages.
pub fn parse_project(text: &str, origin: &Path) -> Result<Project> {
    let value: Value = serde_json::from_str(text)?;
    let Some(tree) = value.get("tree").and_then(Value::as_object) else {
        return Err(ProjectError::MissingTree(origin.to_path_buf()));
    };

    let name = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let glob_ignore_paths = value
        .get("globIgnorePaths")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Project {
        name,
        file: origin.to_path_buf(),
        tree: parse_entry(tree),
        glob_ignore_paths,
    })
}

fn parse_entry(object: &Map<String, Value>) -> TreeEntry {
    let mut entry = TreeEntry {
        class_name: object
            .get("$className")
            .and_then(Value::as_str)
            .map(str::to_string),
        path: object.get("$path").and_then(parse_path_value),
        children: Vec::new(),
    };

    for (key, value) in object {
        // `$className`, `$properties`, `$ignoreUnknownInstances`, ... are node metadata.
        if key.starts_with('$') {
            continue;
        }
        let Some(child) = value.as_object() else {
            log::debug!("Skipping non-object tree key `{key}`");
            continue;
        };
        let child = parse_entry(child);
        if child.is_empty() {
            continue;
        }
        entry.children.push((key.clone(), child));
    }

    entry
}

fn parse_path_value(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(path) => path.as_str(),
        Value::Object(object) => object.get("optional").and_then(Value::as_str)?,
        _ => return None,
    };
    let normalized = normalize_path(raw);
    // `"."` and `"./"` legitimately point at the project root.
    (!raw.trim().is_empty()).then_some(normalized)
}
