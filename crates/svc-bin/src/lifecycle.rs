//! Lifecycle subcommands: install, uninstall, start, stop and status of the
//! service built from the running executable.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use svc_core::config::{ServiceConfig, INSTALLED_CONFIG_FILE_NAME};
use svc_core::platform::current_manager;
use svc_platform::{ServiceDescriptor, ServiceManager};

// ── Public entry points ────────────────────────────────────────────────────

/// Install the service and leave it running. Requires elevated privileges.
pub fn run_install(config_path: Option<&Path>) -> Result<()> {
    ensure_elevated()?;

    let config = load_config(config_path)?;
    let mgr = manager(&config)?;
    let install_dir = mgr.install_dir();

    // The installed service reads its settings from beside its binary.
    let config_dest = install_dir.join(INSTALLED_CONFIG_FILE_NAME);
    config.save(&config_dest)?;
    info!("config saved to {}", config_dest.display());

    mgr.install().context("installation failed")?;

    info!(
        "{} installed successfully! Install directory: {}, service registered and started.",
        mgr.service_name(),
        install_dir.display()
    );
    Ok(())
}

pub fn run_uninstall(config_path: Option<&Path>) -> Result<()> {
    ensure_elevated()?;

    let config = load_config(config_path)?;
    let mgr = manager(&config)?;
    mgr.uninstall().context("uninstall failed")?;

    info!("{} uninstalled successfully", mgr.service_name());
    Ok(())
}

pub fn run_start(config_path: Option<&Path>) -> Result<()> {
    ensure_elevated()?;

    let mgr = manager(&load_config(config_path)?)?;
    mgr.start()?;
    info!("service started: {}", mgr.service_name());
    Ok(())
}

pub fn run_stop(config_path: Option<&Path>) -> Result<()> {
    ensure_elevated()?;

    let mgr = manager(&load_config(config_path)?)?;
    mgr.stop()?;
    info!("service stopped: {}", mgr.service_name());
    Ok(())
}

/// Print whether the service is running. Never requires elevation.
pub fn run_status(config_path: Option<&Path>) -> Result<()> {
    let mgr = manager(&load_config(config_path)?)?;
    let running = mgr.status()?;

    println!(
        "{}: {}",
        mgr.service_name(),
        if running { "running" } else { "not running" }
    );
    println!("install directory: {}", mgr.install_dir().display());
    Ok(())
}

// ── Helpers ────────────────────────────────────────────────────────────────

pub fn load_config(config_path: Option<&Path>) -> Result<ServiceConfig> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(ServiceConfig::default_path);
    ServiceConfig::load_or_default(&path)
}

fn manager(config: &ServiceConfig) -> Result<Box<dyn ServiceManager>> {
    let descriptor =
        ServiceDescriptor::from_current_exe(&config.display_name, &config.description)?;
    Ok(current_manager(descriptor)?)
}

// ── Privilege checks ───────────────────────────────────────────────────────

fn ensure_elevated() -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        if !svc_windows::elevation::is_elevated() {
            anyhow::bail!(
                "this command must be run as Administrator (use an elevated command prompt)"
            );
        }
    }
    #[cfg(unix)]
    {
        if !nix::unistd::Uid::effective().is_root() {
            anyhow::bail!("this command must be run as root (use sudo)");
        }
    }
    Ok(())
}
