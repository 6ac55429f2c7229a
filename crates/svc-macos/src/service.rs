//! macOS launchd service management: install/uninstall/start/stop the service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use svc_platform::command::{run_checked, run_ignored, run_query};
use svc_platform::installer::{remove_descriptor, stage_binary, write_descriptor};
use svc_platform::{
    CommandRunner, InstallStage, Result, ServiceDescriptor, ServiceError, ServiceManager,
    SystemCommandRunner,
};

pub const LAUNCH_DAEMONS_DIR: &str = "/Library/LaunchDaemons";
pub const INSTALL_ROOT: &str = "/usr/local";

const LAUNCHCTL: &str = "launchctl";

pub struct LaunchdServiceManager {
    descriptor: ServiceDescriptor,
    install_root: PathBuf,
    plist_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl LaunchdServiceManager {
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        Self::with_runner(descriptor, Arc::new(SystemCommandRunner))
    }

    pub fn with_runner(descriptor: ServiceDescriptor, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            descriptor,
            install_root: PathBuf::from(INSTALL_ROOT),
            plist_dir: PathBuf::from(LAUNCH_DAEMONS_DIR),
            runner,
        }
    }

    /// Relocate the install root and plist directory (used by tests).
    pub fn with_paths(
        mut self,
        install_root: impl Into<PathBuf>,
        plist_dir: impl Into<PathBuf>,
    ) -> Self {
        self.install_root = install_root.into();
        self.plist_dir = plist_dir.into();
        self
    }

    pub fn plist_path(&self) -> PathBuf {
        self.plist_dir
            .join(format!("{}.plist", self.descriptor.display_name()))
    }
}

/// Render the launchd property list for the service.
pub fn render_plist(label: &str, installed_binary: &Path, install_dir: &Path) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{binary}</string>
        <string>-run</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <true/>
    <key>WorkingDirectory</key>
    <string>{workdir}</string>
</dict>
</plist>"#,
        label = xml_escape(label),
        binary = xml_escape(&installed_binary.to_string_lossy()),
        workdir = xml_escape(&install_dir.to_string_lossy()),
    )
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

impl ServiceManager for LaunchdServiceManager {
    fn install(&self) -> Result<()> {
        let name = self.service_name();
        info!("installing launchd service: {}", name);

        let install_dir = self.install_dir();
        let installed = stage_binary(&self.descriptor, &install_dir)?;

        let plist_path = self.plist_path();
        let plist = render_plist(name, &installed, &install_dir);
        write_descriptor(&plist_path, &plist)?;

        // RunAtLoad starts the job as soon as it is loaded.
        let plist_arg = plist_path.to_string_lossy();
        run_checked(self.runner.as_ref(), LAUNCHCTL, &["load", plist_arg.as_ref()])
            .map_err(ServiceError::install(InstallStage::Register))?;

        info!("service installed and loaded: {}", name);
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        let name = self.service_name();
        info!("uninstalling launchd service: {}", name);

        let plist_path = self.plist_path();
        let plist_arg = plist_path.to_string_lossy();
        run_ignored(self.runner.as_ref(), LAUNCHCTL, &["unload", plist_arg.as_ref()]);

        remove_descriptor(&plist_path).map_err(ServiceError::UninstallFailed)?;

        info!("service uninstalled: {}", name);
        Ok(())
    }

    fn start(&self) -> Result<()> {
        info!("starting service: {}", self.service_name());
        run_checked(self.runner.as_ref(), LAUNCHCTL, &["start", self.service_name()])
            .map(|_| ())
            .map_err(ServiceError::StartFailed)
    }

    fn stop(&self) -> Result<()> {
        info!("stopping service: {}", self.service_name());
        run_checked(self.runner.as_ref(), LAUNCHCTL, &["stop", self.service_name()])
            .map(|_| ())
            .map_err(ServiceError::StopFailed)
    }

    fn status(&self) -> Result<bool> {
        Ok(run_query(self.runner.as_ref(), LAUNCHCTL, &["list", self.service_name()]).is_some())
    }

    fn install_dir(&self) -> PathBuf {
        self.install_root.join(self.descriptor.display_name())
    }

    fn service_name(&self) -> &str {
        self.descriptor.display_name()
    }
}
