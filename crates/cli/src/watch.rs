use crate::config::Config;
use crate::pipeline::{check, prepare, CheckOutcome};
use anyhow::{Context as AnyhowContext, Result};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rojo_check_analyzer::staging_path;
use rojo_check_filter::IgnoreFilter;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Paths whose changes never trigger a run.
#[derive(Debug, Clone)]
struct EventFilter {
    ignore: IgnoreFilter,
    outputs: Vec<PathBuf>,
}

impl EventFilter {
    fn new(ignore: IgnoreFilter, problems_file: Option<&Path>) -> Self {
        let outputs = problems_file
            .map(|path| vec![path.to_path_buf(), staging_path(path)])
            .unwrap_or_default();
        Self { ignore, outputs }
    }

    fn is_relevant(&self, event: &Event) -> bool {
        if matches!(event.kind, EventKind::Access(_)) {
            return false;
        }
        if event.paths.is_empty() {
            return true;
        }
        event
            .paths
            .iter()
            .any(|path| !self.outputs.contains(path) && !self.ignore.ignores_path(path))
    }
}

fn create_fs_watcher(
    root: &Path,
    sender: mpsc::Sender<notify::Result<Event>>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = sender.blocking_send(res);
        },
        NotifyConfig::default(),
    )
    .context("Failed to initialise file watcher")?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", root.display()))?;
    Ok(watcher)
}

/// Wait for the first relevant event, then until `debounce` passes without
/// another one. Returns `false` once the watcher is gone.
async fn next_batch(
    rx: &mut mpsc::Receiver<notify::Result<Event>>,
    filter: &EventFilter,
    debounce: Duration,
) -> bool {
    loop {
        match rx.recv().await {
            Some(Ok(event)) if filter.is_relevant(&event) => {
                log::debug!("Change detected: {:?}", event.paths);
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(err)) => log::warn!("Watcher error: {err}"),
            None => return false,
        }
    }

    loop {
        match tokio::time::timeout(debounce, rx.recv()).await {
            Ok(Some(_)) => continue,
            Ok(None) => return false,
            Err(_) => return true,
        }
    }
}

/// One check. Returns the ignore filter for the next wait, empty when the
/// project could not be prepared.
async fn run_once<F>(root: &Path, config: &Config, on_outcome: &mut F) -> Result<IgnoreFilter>
where
    F: FnMut(&CheckOutcome) -> Result<()>,
{
    let prepared = match prepare(root, config) {
        Ok(prepared) => prepared,
        Err(err) => {
            log::error!("Check failed: {err:#}");
            return Ok(IgnoreFilter::default());
        }
    };
    let ignore = prepared.filter.clone();
    match check(root, config, prepared).await {
        Ok(outcome) => on_outcome(&outcome)?,
        Err(err) => log::error!("Check failed: {err:#}"),
    }
    Ok(ignore)
}

/// Run once, then again after every debounced batch of relevant changes,
/// until Ctrl-C.
///
/// Failed runs are logged and do not stop the loop. Changes made while a run
/// is in progress queue up and produce a single follow-up run.
pub async fn watch<F>(root: &Path, config: &Config, on_outcome: F) -> Result<()>
where
    F: FnMut(&CheckOutcome) -> Result<()>,
{
    watch_until(root, config, on_outcome, tokio::signal::ctrl_c()).await
}

/// [`watch`] with an explicit stop signal. Stopping mid-run drops the run,
/// which kills its analyzer processes.
async fn watch_until<F, S>(
    root: &Path,
    config: &Config,
    mut on_outcome: F,
    shutdown: S,
) -> Result<()>
where
    F: FnMut(&CheckOutcome) -> Result<()>,
    S: Future,
{
    let problems_file = config.problems_path(root);
    let (tx, mut rx) = mpsc::channel(256);
    let _watcher = create_fs_watcher(root, tx)?;
    log::info!(
        "Watching {} (debounce {}ms)",
        root.display(),
        config.watch.debounce_ms
    );
    tokio::pin!(shutdown);

    loop {
        let ignore = tokio::select! {
            ignore = run_once(root, config, &mut on_outcome) => ignore?,
            _ = &mut shutdown => {
                log::info!("Stopping watch");
                return Ok(());
            }
        };
        let filter = EventFilter::new(ignore, problems_file.as_deref());

        tokio::select! {
            more = next_batch(&mut rx, &filter, config.watch.debounce()) => {
                if !more {
                    log::warn!("File watcher stopped");
                    return Ok(());
                }
            }
            _ = &mut shutdown => {
                log::info!("Stopping watch");
                return Ok(());
            }
        }
    }
}
