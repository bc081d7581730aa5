use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use pipeline::CheckOutcome;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod config;
mod pipeline;
mod report;
mod watch;

pub use config::{Config, WatchConfig, CONFIG_FILE, DEFAULT_PROJECT_FILE};

#[derive(Parser)]
#[command(name = "rojo-check")]
#[command(about = "Analyze a Rojo project once per runtime context", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Configuration file (default: <ROOT>/rojo-check.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text (implies --quiet)
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every runtime context once
    Check(CheckArgs),

    /// Analyze, then analyze again whenever project files change
    Watch(CheckArgs),

    /// Show the classification and per-context paths without analyzing
    Paths(ProjectArgs),
}

#[derive(Args)]
struct ProjectArgs {
    /// Project root
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Project description file, relative to the root
    #[arg(long)]
    project: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    target: ProjectArgs,

    /// Write the merged problem list to this file, relative to the root
    #[arg(long)]
    problems_file: Option<PathBuf>,
}

impl ProjectArgs {
    fn resolve(&self, config_path: Option<&Path>) -> Result<(PathBuf, Config)> {
        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("Invalid project root {}", self.root.display()))?;
        let mut config = Config::load(&root, config_path)?;
        if let Some(project) = &self.project {
            config.project = project.clone();
        }
        Ok((root, config))
    }
}

impl CheckArgs {
    fn resolve(&self, config_path: Option<&Path>) -> Result<(PathBuf, Config)> {
        let (root, mut config) = self.target.resolve(config_path)?;
        if let Some(path) = &self.problems_file {
            config.problems_file = Some(path.clone());
        }
        Ok((root, config))
    }
}

fn print_outcome(outcome: &CheckOutcome, json: bool) -> Result<()> {
    let text = if json {
        report::render_check_json(outcome)?
    } else {
        report::render_check_text(outcome)
    };
    report::print_stdout(&text)
}

pub async fn main_entry() -> Result<ExitCode> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    if cli.json {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Paths(args) => {
            let (root, config) = args.resolve(config_path)?;
            let prepared = pipeline::prepare(&root, &config)?;
            let text = if cli.json {
                report::render_paths_json(&prepared)?
            } else {
                report::render_paths_text(&prepared)
            };
            report::print_stdout(&text)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check(args) => {
            let (root, config) = args.resolve(config_path)?;
            let prepared = pipeline::prepare(&root, &config)?;
            let outcome = pipeline::check(&root, &config, prepared).await?;
            print_outcome(&outcome, cli.json)?;
            Ok(if outcome.failed() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Watch(args) => {
            let (root, config) = args.resolve(config_path)?;
            let json = cli.json;
            watch::watch(&root, &config, |outcome| print_outcome(outcome, json)).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
