use crate::config::Config;
use anyhow::{Context as AnyhowContext, Result};
use rojo_check_analyzer::{
    merge_diagnostics, plan_invocations, run_all, write_problems_file, ReportedDiagnostic,
    RunResult, Severity,
};
use rojo_check_filter::{read_ignore_files, IgnoreFilter};
use rojo_check_project::{
    load_project, AssignmentSource, Classifier, Consolidator, PathMap, RuntimeContext,
    ServiceMetadata,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedNode {
    pub node: String,
    pub context: RuntimeContext,
    pub source: AssignmentSource,
}

/// Everything known before the analyzer runs.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub project: String,
    pub nodes: Vec<ClassifiedNode>,
    /// Consolidated globs with ignored entries removed.
    pub paths: PathMap,
    pub filter: IgnoreFilter,
}

impl Prepared {
    pub fn ignore_globs(&self) -> Vec<String> {
        self.filter.analyzer_globs()
    }
}

/// Load, classify, consolidate and filter.
pub fn prepare(root: &Path, config: &Config) -> Result<Prepared> {
    let project_file = config.project_path(root);
    let project = load_project(&project_file)
        .with_context(|| format!("Failed to load project {}", project_file.display()))?;

    let configured = config.configured_paths();
    let classification =
        Classifier::new(&configured, ServiceMetadata::builtin()).classify(&project.tree);
    let nodes = classification
        .iter()
        .flat_map(|(context, entries)| {
            entries.iter().map(move |assignment| ClassifiedNode {
                node: assignment.id.to_string(),
                context,
                source: assignment.source,
            })
        })
        .collect();

    let consolidator = Consolidator::new(&config.groupable_roots);
    let mut paths = PathMap::from_classification(&classification).consolidated(&consolidator);

    let mut lines = read_ignore_files(root, &config.ignore_files)
        .with_context(|| format!("Failed to read ignore files in {}", root.display()))?;
    lines.extend(project.glob_ignore_paths.iter().cloned());
    lines.extend(config.ignore.iter().cloned());
    let filter = IgnoreFilter::build(&lines).with_root(root);

    paths.retain(|context, glob| {
        let ignored = filter.ignores(glob);
        if ignored {
            log::debug!("Dropping ignored {context} path {glob}");
        }
        !ignored
    });
    log::debug!(
        "Project {} classified into {} paths",
        project.name,
        paths.total()
    );

    Ok(Prepared {
        project: project.name,
        nodes,
        paths,
        filter,
    })
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub project: String,
    pub runs: Vec<RunResult>,
    pub diagnostics: Vec<ReportedDiagnostic>,
    pub problems_file: Option<PathBuf>,
}

impl CheckOutcome {
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|r| r.diagnostic.severity == severity)
            .count()
    }

    pub fn crashed(&self) -> impl Iterator<Item = &RunResult> {
        self.runs.iter().filter(|run| run.crashed())
    }

    pub fn failed(&self) -> bool {
        self.count(Severity::Error) > 0 || self.crashed().next().is_some()
    }
}

/// Run the analyzer for every context and write the problems file.
pub async fn check(root: &Path, config: &Config, prepared: Prepared) -> Result<CheckOutcome> {
    let plans = plan_invocations(
        &prepared.paths,
        &prepared.ignore_globs(),
        config.unknown,
        &config.analyzer,
    );
    if plans.is_empty() {
        log::warn!("Nothing to analyze in project {}", prepared.project);
    }

    let runs = run_all(root, &config.analyzer, plans)
        .await
        .context("Analyzer run failed")?;
    for run in runs.iter().filter(|run| run.crashed()) {
        log::warn!(
            "Analyzer for {} exited with {:?} and no diagnostics: {}",
            run.context,
            run.exit_code,
            run.stderr
        );
    }

    let diagnostics = merge_diagnostics(&runs);
    let problems_file = config.problems_path(root);
    if let Some(path) = &problems_file {
        write_problems_file(path, &diagnostics)
            .await
            .with_context(|| format!("Failed to write problems file {}", path.display()))?;
    }

    Ok(CheckOutcome {
        project: prepared.project,
        runs,
        diagnostics,
        problems_file,
    })
}
