mod config;

use clap::{Parser, Subcommand, ValueEnum};
use config::{ConfigError, ScanConfig};
use std::path::PathBuf;
use std::process::exit;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use ward_core::{Classifier, ClassifierError, DumpError, ForceConvergence, KeyBy, WorkStatus};

#[derive(Parser, Debug)]
#[command(
    name = "ward",
    version,
    about = "Status reporting for trees of VASP working directories"
)]
struct Cli {
    /// YAML file with scan settings, flags below override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// root directory to scan
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// glob pattern for directory names to skip, repeatable
    #[arg(short, long = "ignore", global = true)]
    ignore: Vec<String>,

    /// worker threads for classification
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// absolute force convergence tolerance
    #[arg(long, global = true)]
    atol: Option<f64>,

    /// artifact file inspected by the convergence policy
    #[arg(long, global = true)]
    artifact: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// classify all working directories and write a status file
    Status {
        /// output file, format chosen by extension (.json, .yaml, .yml)
        #[arg(short, long, default_value = "status.yaml")]
        output: PathBuf,
        /// shape of the dumped map
        #[arg(long, value_enum, default_value = "status")]
        key_by: KeyByArg,
    },
    /// print the fraction of directories per status
    Summary,
    /// print the directories still pending or not converged
    Rerun,
    /// print the directories currently in the given status
    List {
        #[arg(value_enum)]
        status: StatusArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KeyByArg {
    Folder,
    Status,
}

impl From<KeyByArg> for KeyBy {
    fn from(arg: KeyByArg) -> Self {
        match arg {
            KeyByArg::Folder => KeyBy::Folder,
            KeyByArg::Status => KeyBy::Status,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
    Pending,
    Done,
    NotConverged,
}

impl From<StatusArg> for WorkStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => WorkStatus::Pending,
            StatusArg::Done => WorkStatus::Done,
            StatusArg::NotConverged => WorkStatus::NotConverged,
        }
    }
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Dump(#[from] DumpError),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{e}");
        exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    if let Some(root) = cli.root {
        config.root = root;
    }
    if !cli.ignore.is_empty() {
        config.ignore = cli.ignore;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(atol) = cli.atol {
        config.atol = atol;
    }
    if let Some(artifact) = cli.artifact {
        config.artifact = artifact;
    }

    let policy = ForceConvergence::with_artifact(config.artifact.clone(), config.atol);
    let classifier = Classifier::new();

    match cli.command {
        Command::Status { output, key_by } => {
            classifier.from_rootdir(&config.root, &policy, config.workers, &config.ignore)?;
            classifier.dump(&output, key_by.into())?;
            print_summary(&classifier);
            info!("status written to {}", output.display());
        }
        Command::Summary => {
            classifier.from_rootdir(&config.root, &policy, config.workers, &config.ignore)?;
            print_summary(&classifier);
        }
        Command::Rerun => {
            classifier.from_rootdir(&config.root, &policy, config.workers, &config.ignore)?;
            for workdir in classifier.to_rerun() {
                println!("{workdir}");
            }
        }
        Command::List { status } => {
            classifier.from_rootdir(&config.root, &policy, config.workers, &config.ignore)?;
            for workdir in classifier.list(status.into()) {
                println!("{workdir}");
            }
        }
    }
    Ok(())
}

fn print_summary(classifier: &Classifier) {
    println!("{} working directories", classifier.len());
    for (status, fraction) in classifier.summary() {
        println!("{:>15}: {:5.1}%", status.as_str(), fraction * 100.0);
    }
}
