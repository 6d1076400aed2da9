//! # agent-workflow
//!
//! Task board CLI: bootstraps a project, serves the dashboard API and prints
//! a status summary.

#![deny(unsafe_code)]

mod bootstrap;
mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use workflow_core::TaskFilter;
use workflow_core::logging::init_subscriber;
use workflow_server::shutdown::wait_for_signal;
use workflow_server::{ServerConfig, WorkflowServer};
use workflow_settings::{CliOverrides, WorkflowSettings, load_settings};
use workflow_store::TaskStore;

/// Local task board for agent-driven development.
#[derive(Parser, Debug)]
#[command(name = "agent-workflow", version, about)]
struct Cli {
    /// Log filter when `RUST_LOG` is unset (overrides settings).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create `.agent/`, `.prompts/`, the task file and `BACKLOG.md`.
    Init,
    /// Serve the dashboard API.
    Start {
        /// Port to bind.
        #[arg(long, short)]
        port: Option<u16>,
        /// Host to bind.
        #[arg(long)]
        host: Option<String>,
        /// Project root (defaults to the working directory).
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Print task counts and active tasks.
    Status {
        /// Project root (defaults to the working directory).
        #[arg(long)]
        project: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings().context("Failed to load settings")?;
    init_subscriber(cli.log_level.as_deref().unwrap_or(&settings.log_level));

    match cli.command {
        Command::Init => run_init(),
        Command::Start {
            port,
            host,
            project,
        } => {
            let settings = settings.with_overrides(CliOverrides {
                host,
                port,
                project_dir: project,
            });
            run_start(settings).await
        }
        Command::Status { project } => {
            let settings = settings.with_overrides(CliOverrides {
                project_dir: project,
                ..CliOverrides::default()
            });
            run_status(&settings)
        }
    }
}

fn run_init() -> Result<()> {
    let root = std::env::current_dir().context("Failed to resolve working directory")?;
    println!("Initializing agent-workflow in {}\n", root.display());
    for step in bootstrap::init_project(&root)? {
        println!("{step}");
    }
    println!("\nDone. Next: edit BACKLOG.md, then run `agent-workflow start`.");
    Ok(())
}

async fn run_start(settings: WorkflowSettings) -> Result<()> {
    settings.validate_for_serving()?;
    let project = settings.resolve_project_dir()?;
    let store = TaskStore::open(&project);

    let normalized = store
        .normalize_orders()
        .context("Failed to normalize task order")?;
    tracing::info!(project = %project.display(), normalized, "task store ready");

    let server = WorkflowServer::new(ServerConfig::from(&settings), store);
    let watcher = match server.watch_task_file() {
        Ok(watcher) => watcher,
        Err(e) => {
            tracing::warn!(error = %e, "file watching disabled");
            None
        }
    };

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    println!("Dashboard API on http://{addr}/api (project: {})", project.display());

    wait_for_signal().await;
    tracing::info!("Shutting down...");
    if !server.shutdown().drain(handle).await {
        tracing::warn!("server stopped without draining");
    }
    drop(watcher);

    tracing::info!("Shutdown complete");
    Ok(())
}

fn run_status(settings: &WorkflowSettings) -> Result<()> {
    let project = settings.resolve_project_dir()?;
    let tasks = TaskStore::open(project)
        .list_tasks(&TaskFilter::default())
        .context("Failed to read tasks")?;
    print!("{}", status::render(&tasks));
    Ok(())
}
