//! # rojo-check analyzer runs
//!
//! Drives the external Luau analyzer once per runtime context and collects
//! what it reports.
//!
//! ```text
//! PathMap + ignore globs
//!     │
//!     ├──> plan_invocations ──> Invocation per context
//!     │
//!     ├──> run_all (JoinSet, bounded by a semaphore)
//!     │      └─> RunResult { exit code, parsed diagnostics }
//!     │
//!     └──> merge_diagnostics ──> write_problems_file
//! ```

mod diagnostics;
mod error;
mod plan;
mod problems;
mod runner;

pub use diagnostics::{parse_output, strip_ansi, Diagnostic, Severity};
pub use error::{AnalyzerError, Result};
pub use plan::{plan_invocations, AnalyzerConfig, ContextAnalyzerConfig, Invocation, UnknownPolicy};
pub use problems::{staging_path, write_problems_file};
pub use runner::{invoke, merge_diagnostics, run_all, ReportedDiagnostic, RunResult};
