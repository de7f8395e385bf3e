//! framesplit CLI: download, split and merge Vimeo-90k style datasets
//!
//! Commands:
//!   framesplit download      fetch one dataset part from Kaggle
//!   framesplit download-all  fetch and parse a numbered series of parts
//!   framesplit parse         link sequences into test/train/other
//!   framesplit merge         merge parsed parts into one tree
//!   framesplit verify        report split entries that no longer resolve

use clap::{ArgAction, Args, Parser, Subcommand};
use framesplit_core::dataset::resolve_data_root;
use framesplit_core::download::{
    download_all, part_names, DEFAULT_DATASET, DEFAULT_OWNER, DEFAULT_PART_PREFIX,
};
use framesplit_core::merge::{DEFAULT_INPUT_PATTERN, DEFAULT_OUTPUT};
use framesplit_core::storage::verify_tree;
use framesplit_core::{
    merge, parse_dataset, progress, Config, ConflictPolicy, DownloadOutcome, Downloader, Error,
    LinkMode, Result,
};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "framesplit", version, about = "Download, split and merge video-frame datasets")]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding the dataset parts [default: dataset]
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download one dataset part
    Download {
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
        #[arg(long, default_value = DEFAULT_DATASET)]
        dataset: String,
    },

    /// Download and parse parts {prefix}{start} through {prefix}{end}
    DownloadAll {
        #[arg(long, default_value = DEFAULT_OWNER)]
        owner: String,
        #[arg(long, default_value = DEFAULT_PART_PREFIX)]
        prefix: String,
        #[arg(long, default_value_t = 1)]
        start: u32,
        #[arg(long, default_value_t = 10)]
        end: u32,
        #[command(flatten)]
        link: LinkArgs,
    },

    /// Split one dataset part into test/train/other
    Parse {
        #[arg(long, default_value = DEFAULT_DATASET)]
        dataset: String,
        #[command(flatten)]
        link: LinkArgs,
    },

    /// Merge parsed parts into one directory
    Merge {
        /// Glob, relative to the dataset root, selecting the parts
        #[arg(long, default_value = DEFAULT_INPUT_PATTERN)]
        input: String,
        #[arg(long, default_value = DEFAULT_OUTPUT)]
        output: String,
        #[command(flatten)]
        link: LinkArgs,
    },

    /// Check that every split entry still resolves to a directory
    Verify {
        /// Dataset part (or merge output) under the dataset root
        #[arg(long, conflicts_with = "dir", required_unless_present = "dir")]
        dataset: Option<String>,
        /// Any reorganized directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct LinkArgs {
    /// Worker threads per batch [default: 20]
    #[arg(long)]
    workers: Option<usize>,
    /// How entries are materialized [default: symlink]
    #[arg(long, value_enum)]
    mode: Option<LinkMode>,
    /// What to do with entries that already exist [default: skip]
    #[arg(long, value_enum)]
    on_conflict: Option<ConflictPolicy>,
}

impl LinkArgs {
    fn apply(&self, cfg: &Config) -> Config {
        let mut cfg = cfg.clone();
        if let Some(workers) = self.workers {
            cfg.workers = workers;
        }
        if let Some(mode) = self.mode {
            cfg.link_mode = mode;
        }
        if let Some(policy) = self.on_conflict {
            cfg.on_conflict = policy;
        }
        cfg
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut cfg = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(root) = cli.root {
        cfg.dataset_root = root;
    }

    let result = match cli.command {
        Commands::Download { owner, dataset } => cmd_download(&cfg, owner, dataset).await,
        Commands::DownloadAll {
            owner,
            prefix,
            start,
            end,
            link,
        } => cmd_download_all(&link.apply(&cfg), &owner, &prefix, start, end).await,
        Commands::Parse { dataset, link } => cmd_parse(&link.apply(&cfg), &dataset).await,
        Commands::Merge { input, output, link } => cmd_merge(&link.apply(&cfg), &input, &output).await,
        Commands::Verify { dataset, dir } => cmd_verify(&cfg, dataset, dir),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            if matches!(e, Error::Layout { .. }) {
                error!("dataset error! {}", e);
            } else {
                error!("{}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(progress::LogWriter)))
        .init();
}

async fn download(cfg: &Config, owner: &str, dataset: &str) -> Result<DownloadOutcome> {
    let downloader = Downloader::new(cfg.dataset_root.clone());
    let (owner, dataset) = (owner.to_string(), dataset.to_string());
    tokio::task::spawn_blocking(move || downloader.download(&owner, &dataset)).await?
}

async fn cmd_download(cfg: &Config, owner: String, dataset: String) -> Result<ExitCode> {
    if let DownloadOutcome::Downloaded { path, .. } = download(cfg, &owner, &dataset).await? {
        println!("  Downloaded {}/{} to {}", owner, dataset, path.display());
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_download_all(
    cfg: &Config,
    owner: &str,
    prefix: &str,
    start: u32,
    end: u32,
) -> Result<ExitCode> {
    let downloader = Downloader::new(cfg.dataset_root.clone());
    let report = download_all(cfg, &downloader, owner, &part_names(prefix, start, end)).await;
    println!(
        "  Parsed {} parts, {} failed",
        report.parsed.len(),
        report.failed.len()
    );
    Ok(if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn cmd_parse(cfg: &Config, dataset: &str) -> Result<ExitCode> {
    let report = parse_dataset(cfg, dataset).await?;
    println!("  {}: {}", dataset, report.summary.describe());
    Ok(ExitCode::SUCCESS)
}

async fn cmd_merge(cfg: &Config, input: &str, output: &str) -> Result<ExitCode> {
    let report = merge(cfg, input, output).await?;
    println!(
        "  Merged {} parts into {}: {}",
        report.sources.len(),
        report.root.display(),
        report.summary.describe()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_verify(cfg: &Config, dataset: Option<String>, dir: Option<PathBuf>) -> Result<ExitCode> {
    let root = match (dir, dataset) {
        (Some(dir), _) => dir,
        (None, Some(name)) => {
            let path = cfg.dataset_path(&name);
            resolve_data_root(&path, &cfg.sequences_dir).unwrap_or(path)
        }
        (None, None) => return Err(Error::Config("pass --dataset or --dir".to_string())),
    };

    let report = verify_tree(&root)?;
    for broken in &report.broken {
        println!("  BROKEN {}", broken.display());
    }
    println!(
        "  Checked {} entries under {}: {} broken",
        report.checked,
        root.display(),
        report.broken.len()
    );
    Ok(if report.is_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
