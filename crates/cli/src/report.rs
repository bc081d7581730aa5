use crate::pipeline::{CheckOutcome, ClassifiedNode, Prepared};
use anyhow::Result;
use rojo_check_analyzer::{ReportedDiagnostic, Severity};
use rojo_check_project::{PathMap, RuntimeContext};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

pub fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Serialize)]
struct PathsReport<'a> {
    project: &'a str,
    nodes: &'a [ClassifiedNode],
    paths: &'a PathMap,
    ignores: Vec<String>,
}

pub fn render_paths_json(prepared: &Prepared) -> Result<String> {
    let report = PathsReport {
        project: &prepared.project,
        nodes: &prepared.nodes,
        paths: &prepared.paths,
        ignores: prepared.ignore_globs(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn render_paths_text(prepared: &Prepared) -> String {
    let mut out = format!("Project: {}\n", prepared.project);

    out.push_str("\nNodes:\n");
    for node in &prepared.nodes {
        out.push_str(&format!(
            "  {} -> {} ({})\n",
            node.node, node.context, node.source
        ));
    }

    out.push_str("\nPaths:\n");
    for (context, globs) in prepared.paths.iter().filter(|(_, g)| !g.is_empty()) {
        out.push_str(&format!("  {context}:\n"));
        for glob in globs {
            out.push_str(&format!("    {glob}\n"));
        }
    }

    let ignores = prepared.ignore_globs();
    if !ignores.is_empty() {
        out.push_str("\nIgnored:\n");
        for glob in ignores {
            out.push_str(&format!("  {glob}\n"));
        }
    }
    out.trim_end().to_string()
}

#[derive(Serialize)]
struct ContextSummary {
    context: RuntimeContext,
    exit_code: Option<i32>,
    crashed: bool,
    errors: usize,
    warnings: usize,
    duration_ms: u64,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    project: &'a str,
    errors: usize,
    warnings: usize,
    contexts: Vec<ContextSummary>,
    diagnostics: &'a [ReportedDiagnostic],
    #[serde(skip_serializing_if = "Option::is_none")]
    problems_file: Option<&'a PathBuf>,
}

fn summaries(outcome: &CheckOutcome) -> Vec<ContextSummary> {
    outcome
        .runs
        .iter()
        .map(|run| {
            let reported = outcome
                .diagnostics
                .iter()
                .filter(|r| r.context == run.context);
            let (errors, warnings) =
                reported.fold((0, 0), |(e, w), r| match r.diagnostic.severity {
                    Severity::Error => (e + 1, w),
                    Severity::Warning => (e, w + 1),
                });
            ContextSummary {
                context: run.context,
                exit_code: run.exit_code,
                crashed: run.crashed(),
                errors,
                warnings,
                duration_ms: run.duration_ms,
            }
        })
        .collect()
}

pub fn render_check_json(outcome: &CheckOutcome) -> Result<String> {
    let report = CheckReport {
        project: &outcome.project,
        errors: outcome.count(Severity::Error),
        warnings: outcome.count(Severity::Warning),
        contexts: summaries(outcome),
        diagnostics: &outcome.diagnostics,
        problems_file: outcome.problems_file.as_ref(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn render_check_text(outcome: &CheckOutcome) -> String {
    let mut out = String::new();
    for reported in &outcome.diagnostics {
        let diag = &reported.diagnostic;
        let mut lines = diag.message.lines();
        out.push_str(&format!(
            "{}:{}:{} [{}] {}: {}\n",
            diag.file,
            diag.line,
            diag.column,
            reported.context,
            diag.severity,
            lines.next().unwrap_or_default()
        ));
        for rest in lines {
            out.push_str(&format!("  {rest}\n"));
        }
    }
    if !outcome.diagnostics.is_empty() {
        out.push('\n');
    }

    for summary in summaries(outcome) {
        if summary.crashed {
            out.push_str(&format!(
                "{}: analyzer crashed (exit code {})\n",
                summary.context,
                summary
                    .exit_code
                    .map_or_else(|| "none".to_string(), |code| code.to_string())
            ));
            continue;
        }
        out.push_str(&format!(
            "{}: {} errors, {} warnings ({}ms)\n",
            summary.context, summary.errors, summary.warnings, summary.duration_ms
        ));
    }
    out.push_str(&format!(
        "{}: {} errors, {} warnings",
        outcome.project,
        outcome.count(Severity::Error),
        outcome.count(Severity::Warning)
    ));
    if let Some(path) = &outcome.problems_file {
        out.push_str(&format!("\nProblems written to {}", path.display()));
    }
    out
}
