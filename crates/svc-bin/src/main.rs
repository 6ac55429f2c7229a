use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::info;

use svc_core::config::ServiceConfig;
use svc_core::task::HelloTask;

mod lifecycle;

#[derive(Parser, Debug)]
#[command(name = "hello-service")]
#[command(
    about = "Installs, controls and runs a background service that appends 'Hello World' to a log file"
)]
#[command(version)]
struct Cli {
    /// Run the background task in the foreground (what the installed service executes)
    #[arg(long)]
    run: bool,

    /// Path to config file
    #[arg(long, env = "SERVICE_CONFIG_PATH", global = true)]
    config_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SERVICE_LOG_LEVEL", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install the service, register it with the service manager and start it
    Install,
    /// Stop the service and remove its registration
    Uninstall,
    /// Start the installed service
    Start,
    /// Stop the running service
    Stop,
    /// Report whether the service is running
    Status,
}

/// Service descriptors launch the binary with a single-dash `-run`.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| if arg == "-run" { OsString::from("--run") } else { arg })
        .collect()
}

/// systemd sets `INVOCATION_ID` for every unit it starts. The unit file runs
/// the binary without arguments, so a bare invocation from systemd means
/// run mode rather than a status query.
fn launched_by_systemd() -> bool {
    std::env::var_os("INVOCATION_ID").is_some_and(|id| !id.is_empty())
}

fn wants_run_mode(cli: &Cli, under_systemd: bool) -> bool {
    cli.run || (cli.command.is_none() && under_systemd)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    if cli.run && cli.command.is_some() {
        Cli::command()
            .error(
                clap::error::ErrorKind::ArgumentConflict,
                "--run cannot be combined with a subcommand",
            )
            .exit();
    }

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(
        "hello-service v{} starting (os={}, arch={})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    );

    let config_path = cli.config_path.as_deref();
    if wants_run_mode(&cli, launched_by_systemd()) {
        return run_service(config_path).await;
    }

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Install => lifecycle::run_install(config_path),
        Commands::Uninstall => lifecycle::run_uninstall(config_path),
        Commands::Start => lifecycle::run_start(config_path),
        Commands::Stop => lifecycle::run_stop(config_path),
        Commands::Status => lifecycle::run_status(config_path),
    }
}

async fn run_service(config_path: Option<&Path>) -> Result<()> {
    let exe = std::env::current_exe().context("failed to get current exe path")?;

    // An installed service has no --config-path; it uses the copy written at install time.
    let config_path = config_path
        .map(Path::to_path_buf)
        .or_else(|| ServiceConfig::installed_path(&exe).filter(|p| p.exists()))
        .unwrap_or_else(ServiceConfig::default_path);
    let config = ServiceConfig::load_or_default(&config_path)?;
    info!("running {} (config {})", config.display_name, config_path.display());

    #[cfg(target_os = "windows")]
    {
        let handle = tokio::runtime::Handle::current();
        let name = config.display_name.clone();
        let task = HelloTask::for_executable(&config, &exe);
        let body: svc_windows::dispatcher::ServiceBody = Box::new(move |stop| {
            handle.block_on(task.run(async move {
                let _ = tokio::task::spawn_blocking(move || stop.recv()).await;
            }));
        });

        let dispatched = tokio::task::spawn_blocking(move || {
            svc_windows::dispatcher::run_as_service(&name, body)
        })
        .await?;
        match dispatched {
            Ok(()) => return Ok(()),
            Err(e) => tracing::debug!(
                "not started by the service control manager ({}), running in console",
                e
            ),
        }
    }

    HelloTask::for_executable(&config, &exe)
        .run(shutdown_signal())
        .await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
