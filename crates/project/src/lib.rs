//! # rojo-check project model
//!
//! Turns a Rojo project description into per-context path globs.
//!
//! ## Pipeline
//!
//! ```text
//! *.project.json
//!     │
//!     ├──> Loader
//!     │      └─> TreeEntry (service tree)
//!     │
//!     ├──> Classifier (configuration → service metadata → fallback)
//!     │      └─> Classification (entries per runtime context)
//!     │
//!     ├──> Path Extractor
//!     │      └─> PathMap (raw `dir/**` globs)
//!     │
//!     └──> Consolidator
//!            └─> PathMap (minimal globs)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use rojo_check_project::{load_project, Classifier, ConfiguredPaths, Consolidator, PathMap, ServiceMetadata};
//!
//! fn main() -> rojo_check_project::Result<()> {
//!     let project = load_project("default.project.json")?;
//!     let configured = ConfiguredPaths::default();
//!     let classification = Classifier::new(&configured, ServiceMetadata::builtin()).classify(&project.tree);
//!     let paths = PathMap::from_classification(&classification).consolidated(&Consolidator::default());
//!
//!     for (context, globs) in paths.iter() {
//!         println!("{context}: {globs:?}");
//!     }
//!     Ok(())
//! }
//! ```

mod classifier;
mod consolidate;
mod context;
mod error;
mod extract;
pub mod glob;
mod loader;
mod path_map;
mod tree;

pub use classifier::{
    classify, Assignment, AssignmentSource, Classification, Classifier, ConfiguredPaths,
};
pub use consolidate::{consolidate, Consolidator, DEFAULT_GROUPABLE_ROOTS};
pub use context::{ContextMap, RuntimeContext, ServiceMetadata};
pub use error::{ProjectError, Result};
pub use extract::extract_paths;
pub use loader::{load_project, parse_project, Project, PROJECT_FILE_SUFFIX};
pub use path_map::PathMap;
pub use tree::{NodeId, TreeEntry};
