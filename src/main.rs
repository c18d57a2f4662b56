//! robotask CLI
//!
//! - `browse`: worker mode; one claim-and-execute cycle, or a loop with `--daemon`
//! - `visit`: the visit operation itself, run by the worker in a child process
//! - `schedule`: bulk-load URL lists into the store's table

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use robotask::browser::{visit::visit_and_log, ChromeLauncher, DisplayBackend, VisitOptions};
use robotask::db::create_pool_from_env;
use robotask::logging::init_logging;
use robotask::scheduler::schedule_lists;
use robotask::store::client::DEFAULT_API_BASE_URL;
use robotask::worker::{setup_signal_handler, IsolatedExecutor, WorkerConfig, WorkerLoop};
use robotask::TaskStoreClient;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "robotask")]
#[command(about = "Claim URL-visit tasks from the robotask store and browse them in an isolated Chrome")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, env = "LOG_FILEPATH")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Claim one task and visit it (or keep going with --daemon)
    Browse(BrowseArgs),

    /// Visit a single URL in this process (used by the worker's child process)
    #[command(hide = true)]
    Visit {
        #[command(flatten)]
        visit: VisitArgs,

        /// URL to visit
        url: String,
    },

    /// Add URL lists to the task store at a priority
    Schedule {
        /// Priority of the added tasks (lower runs first)
        priority: i64,

        /// Newline-delimited URL lists; only files ending in .list are loaded
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct BrowseArgs {
    #[command(flatten)]
    visit: VisitArgs,

    /// Keep claiming tasks until interrupted
    #[arg(long)]
    daemon: bool,

    /// Store API root (the collection is <base>/robotask)
    #[arg(long, env = "ROBOTASK_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Timeout of each store request in seconds
    #[arg(long, default_value = "30")]
    request_timeout: u64,

    /// Accept invalid TLS certificates from the store
    #[arg(long)]
    insecure: bool,

    /// Candidate tasks fetched per claim attempt
    #[arg(long, default_value = "25")]
    page_size: usize,

    /// Hard timeout of one visit in seconds; the browser is killed after it
    #[arg(long, default_value = "90")]
    hard_timeout: u64,

    /// Sleep in seconds when no task is available
    #[arg(long, default_value = "30")]
    no_task_backoff: u64,

    /// Sleep in seconds after losing a task to another worker
    #[arg(long, default_value = "5")]
    conflict_backoff: u64,

    /// Sleep in seconds after an unexpected error
    #[arg(long, default_value = "20")]
    error_backoff: u64,

    /// Use the current DISPLAY instead of starting Xvfb
    #[arg(long)]
    no_virtual_display: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
struct VisitArgs {
    /// Unpacked browser extension to load
    #[arg(long, env = "PATH_TO_EXTENSION")]
    extension_path: Option<PathBuf>,

    /// User agent announced by the browser
    #[arg(long, env = "ROBOTASK_USER_AGENT", default_value = robotask::browser::DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Soft page-load timeout in seconds
    #[arg(long, default_value = "70")]
    page_load_timeout: u64,

    /// Seconds the page stays open after loading
    #[arg(long, default_value = "10")]
    settle_delay: u64,

    /// Seconds given to the extension before navigating
    #[arg(long, default_value = "5")]
    extension_warmup: u64,

    /// Disable Chrome's sandbox (CI containers)
    #[arg(long, env = "ROBOTASK_NO_SANDBOX")]
    no_sandbox: bool,

    /// Chrome binary (auto-detected when unset)
    #[arg(long, env = "CHROME_PATH")]
    chrome_executable: Option<PathBuf>,
}

impl VisitArgs {
    fn into_options(self) -> VisitOptions {
        VisitOptions {
            extension_path: self.extension_path,
            user_agent: self.user_agent,
            page_load_timeout: Duration::from_secs(self.page_load_timeout),
            settle_delay: Duration::from_secs(self.settle_delay),
            extension_warmup: Duration::from_secs(self.extension_warmup),
            // Chrome's sandbox is known to break on Travis CI
            no_sandbox: self.no_sandbox || std::env::var_os("TRAVIS").is_some(),
            chrome_executable: self.chrome_executable,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Browse(args) => browse(args, cli.log_file, cli.verbose).await?,

        Commands::Visit { visit, url } => {
            let options = visit.into_options();
            // Always exit 0: soft failures are logged, never escalated
            visit_and_log(&ChromeLauncher::new(), &url, &options).await;
        }

        Commands::Schedule { priority, files } => {
            info!("Scheduling {} file(s) at priority {}", files.len(), priority);
            let pool = create_pool_from_env().await?;
            schedule_lists(&pool, priority, &files).await?;
            pool.close().await;
        }
    }

    Ok(())
}

async fn browse(args: BrowseArgs, log_file: Option<PathBuf>, verbose: bool) -> Result<()> {
    let config = WorkerConfig::builder()
        .api_base_url(&args.api_base_url)
        .request_timeout(Duration::from_secs(args.request_timeout))
        .accept_invalid_certs(args.insecure)
        .page_size(args.page_size)
        .hard_timeout(Duration::from_secs(args.hard_timeout))
        .no_task_backoff(Duration::from_secs(args.no_task_backoff))
        .conflict_backoff(Duration::from_secs(args.conflict_backoff))
        .error_backoff(Duration::from_secs(args.error_backoff))
        .virtual_display(!args.no_virtual_display)
        .visit(args.visit.into_options())
        .build();

    // Configuration errors are the only fatal ones
    config.validate()?;

    let store = TaskStoreClient::new(&config.store)?;
    let executor = IsolatedExecutor::for_visit(&config.visit, log_file.as_deref(), verbose)?;
    let display = DisplayBackend::from_config(config.virtual_display);
    let worker = WorkerLoop::new(store, executor, display, config);

    if args.daemon {
        setup_signal_handler(worker.shutdown_handle());
        worker.run().await;
    } else {
        let iteration = worker.run_once().await;
        info!("Single cycle finished: {:?}", iteration);
    }

    Ok(())
}
