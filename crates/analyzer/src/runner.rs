use crate::diagnostics::{parse_output, strip_ansi, Diagnostic, Severity};
use crate::plan::{AnalyzerConfig, Invocation};
use crate::{AnalyzerError, Result};
use rojo_check_project::RuntimeContext;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome of one analyzer process.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub context: RuntimeContext,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub duration_ms: u64,
}

impl RunResult {
    /// Abnormal exit without a single parsable report.
    pub fn crashed(&self) -> bool {
        self.diagnostics.is_empty() && !matches!(self.exit_code, Some(0) | Some(1))
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }
}

/// A diagnostic tagged with the context whose run reported it first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedDiagnostic {
    pub context: RuntimeContext,
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

/// Run the analyzer once, from `root`, and parse what it prints.
pub async fn invoke(
    root: &Path,
    config: &AnalyzerConfig,
    invocation: &Invocation,
) -> Result<RunResult> {
    let args = invocation.args(config);
    log::debug!(
        "Analyzing {} context: {} {}",
        invocation.context,
        config.command,
        args.join(" ")
    );

    let started = Instant::now();
    let child = Command::new(&config.command)
        .args(&args)
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| AnalyzerError::Spawn {
            command: config.command.clone(),
            source,
        })?;

    let seconds = config.timeout_secs.max(1);
    let output = tokio::time::timeout(Duration::from_secs(seconds), child.wait_with_output())
        .await
        .map_err(|_| AnalyzerError::Timeout {
            context: invocation.context.to_string(),
            seconds,
        })??;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut diagnostics = parse_output(&stdout);
    diagnostics.extend(parse_output(&stderr));

    let result = RunResult {
        context: invocation.context,
        exit_code: output.status.code(),
        diagnostics,
        stderr: strip_ansi(stderr.trim()),
        duration_ms: started.elapsed().as_millis() as u64,
    };
    log::info!(
        "{} analysis exited with {:?}: {} diagnostics in {}ms",
        result.context,
        result.exit_code,
        result.diagnostics.len(),
        result.duration_ms
    );
    Ok(result)
}

/// Run every invocation, at most `config.concurrency` at a time.
///
/// Results come back in invocation order. The first failure to start or
/// finish a run aborts the remaining ones.
pub async fn run_all(
    root: &Path,
    config: &AnalyzerConfig,
    invocations: Vec<Invocation>,
) -> Result<Vec<RunResult>> {
    let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let root = Arc::new(root.to_path_buf());
    let config = Arc::new(config.clone());

    let mut tasks = JoinSet::new();
    for (index, invocation) in invocations.into_iter().enumerate() {
        let permits = Arc::clone(&permits);
        let root = Arc::clone(&root);
        let config = Arc::clone(&config);
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|err| AnalyzerError::Join(err.to_string()))?;
            let result = invoke(&root, &config, &invocation).await?;
            Ok::<_, AnalyzerError>((index, result))
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined.map_err(|err| AnalyzerError::Join(err.to_string()))??;
        results.push((index, result));
    }
    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, result)| result).collect())
}

/// Merge diagnostics of all runs, dropping repeats of the same report and
/// sorting by location.
pub fn merge_diagnostics(results: &[RunResult]) -> Vec<ReportedDiagnostic> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for result in results {
        for diagnostic in &result.diagnostics {
            if seen.insert(diagnostic.dedup_key()) {
                merged.push(ReportedDiagnostic {
                    context: result.context,
                    diagnostic: diagnostic.clone(),
                });
            }
        }
    }
    merged.sort_by(|a, b| {
        let key = |r: &ReportedDiagnostic| {
            (
                r.diagnostic.file.clone(),
                r.diagnostic.line,
                r.diagnostic.column,
            )
        };
        key(a).cmp(&key(b))
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn diag(file: &str, line: u32, message: &str) -> Diagnostic {
        Diagnostic {
            file: file.to_string(),
            line,
            column: 1,
            end_column: None,
            message: message.to_string(),
            severity: Severity::Error,
        }
    }

    fn run(context: RuntimeContext, exit_code: Option<i32>, diagnostics: Vec<Diagnostic>) -> RunResult {
        RunResult {
            context,
            exit_code,
            diagnostics,
            stderr: String::new(),
            duration_ms: 0,
        }
    }

    #[test]
    fn merge_dedupes_and_keeps_first_context() {
        let results = vec![
            run(
                RuntimeContext::Client,
                Some(1),
                vec![diag("b.luau", 2, "TypeError: x"), diag("shared.luau", 1, "TypeError: y")],
            ),
            run(
                RuntimeContext::Server,
                Some(1),
                vec![diag("shared.luau", 1, "TypeError: y"), diag("a.luau", 9, "TypeError: z")],
            ),
        ];
        let merged = merge_diagnostics(&results);
        let summary: Vec<_> = merged
            .iter()
            .map(|r| (r.context, r.diagnostic.file.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (RuntimeContext::Server, "a.luau"),
                (RuntimeContext::Client, "b.luau"),
                (RuntimeContext::Client, "shared.luau"),
            ]
        );
    }

    #[test]
    fn crash_detection() {
        assert!(!run(RuntimeContext::Shared, Some(0), vec![]).crashed());
        assert!(!run(RuntimeContext::Shared, Some(1), vec![]).crashed());
        assert!(run(RuntimeContext::Shared, Some(2), vec![]).crashed());
        assert!(run(RuntimeContext::Shared, None, vec![]).crashed());
        assert!(!run(RuntimeContext::Shared, Some(2), vec![diag("a.luau", 1, "x")]).crashed());
    }

    #[test]
    fn reported_diagnostic_serializes_flat() {
        let reported = ReportedDiagnostic {
            context: RuntimeContext::Client,
            diagnostic: diag("a.luau", 3, "TypeError: x"),
        };
        let value = serde_json::to_value(&reported).unwrap();
        assert_eq!(value["context"], "client");
        assert_eq!(value["file"], "a.luau");
        assert_eq!(value["severity"], "error");
    }
}
