use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pacsmith::adapters::{serve, FsBackupStore, HyperTestAdapter, SystemClock};
use pacsmith::config::AppConfig;
use pacsmith::domain::{DomainSet, FileKind, HostUpdate, PacManager, PacTester, UpdateStats};
use pacsmith::ports::Clock;

#[derive(Parser, Debug)]
#[command(version = env!("PACSMITH_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
/// Maintain PAC files and numbered domain lists
pub struct Opts {
    /// Configuration file (JSON or TOML)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite proxy line, timestamps and domain numbers of the given files
    Update {
        /// Files to update (defaults to the configured targets)
        files: Vec<PathBuf>,

        /// New proxy server
        #[arg(long, short = 'p')]
        proxy: Option<String>,
    },
    /// Check PAC files for the entry point and balanced braces
    Validate {
        /// Files to validate (defaults to the configured targets)
        files: Vec<PathBuf>,
    },
    /// Print the statistics report
    Stats,
    /// Increment the host number of a vmess:// link
    BumpLink {
        link: String,
    },
    /// Serve the PAC testing page
    Serve {
        /// listen on this network address
        #[arg(long, short = 'b', default_value = "127.0.0.1:5000")]
        bind: String,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();
    init_logging(opts.verbose);

    let config = Arc::new(AppConfig::load(opts.config.as_deref()));
    let clock = Arc::new(SystemClock::new(&config.timezone));
    let backups = Arc::new(FsBackupStore::new(config.backup_dir.clone(), clock.clone()));
    let manager = PacManager::new(config.clone(), clock.clone(), backups);

    let targets = |files: Vec<PathBuf>| {
        if files.is_empty() {
            config.default_targets.clone()
        } else {
            files
        }
    };

    match opts.command {
        Command::Stats => {
            println!("{}", manager.statistics_report(&UpdateStats::default()));
            ExitCode::SUCCESS
        }
        Command::Validate { files } => {
            let mut valid = true;
            for path in targets(files).iter().filter(|p| FileKind::classify(p) == FileKind::Pac) {
                valid &= manager.validate_pac_file(path);
            }
            if valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Update { files, proxy } => {
            let report = manager.run_update_cycle(&targets(files), proxy.as_deref());
            if report.success {
                println!("✅ Update cycle completed successfully!");
                ExitCode::SUCCESS
            } else {
                println!("❌ Update cycle completed with errors. Check logs for details.");
                ExitCode::FAILURE
            }
        }
        Command::BumpLink { link } => {
            match manager.update_vmess_link(&link) {
                HostUpdate::Updated(updated) => println!("{}", updated),
                HostUpdate::Unchanged => {
                    info!("vmess link left unchanged");
                    println!("{}", link);
                }
            }
            ExitCode::SUCCESS
        }
        Command::Serve { bind } => {
            let domains = DomainSet::load_from_files(&config.pac_files);
            info!("Loaded {} domains from {} PAC files", domains.len(), config.pac_files.len());

            let tester = Arc::new(PacTester::new(domains, config.clone(), clock.zone_name()));
            let adapter = Arc::new(HyperTestAdapter::new(tester, UpdateStats::default()));

            let listener = match TcpListener::bind(&bind).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!("Failed to bind {}: {}", bind, e);
                    return ExitCode::FAILURE;
                }
            };
            match serve(listener, adapter).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("Server stopped: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
