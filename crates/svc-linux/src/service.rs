//! Linux systemd service management: install/uninstall/start/stop the service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use svc_platform::command::{run_checked, run_ignored, run_query};
use svc_platform::installer::{remove_descriptor, stage_binary, write_descriptor};
use svc_platform::{
    CommandRunner, InstallStage, Result, ServiceDescriptor, ServiceError, ServiceManager,
    StageError, SystemCommandRunner,
};

pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";
pub const INSTALL_ROOT: &str = "/opt";

const SYSTEMCTL: &str = "systemctl";

pub struct SystemdServiceManager {
    descriptor: ServiceDescriptor,
    install_root: PathBuf,
    unit_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl SystemdServiceManager {
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        Self::with_runner(descriptor, Arc::new(SystemCommandRunner))
    }

    pub fn with_runner(descriptor: ServiceDescriptor, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            descriptor,
            install_root: PathBuf::from(INSTALL_ROOT),
            unit_dir: PathBuf::from(SYSTEMD_UNIT_DIR),
            runner,
        }
    }

    /// Relocate the install root and unit directory (used by tests).
    pub fn with_paths(
        mut self,
        install_root: impl Into<PathBuf>,
        unit_dir: impl Into<PathBuf>,
    ) -> Self {
        self.install_root = install_root.into();
        self.unit_dir = unit_dir.into();
        self
    }

    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir
            .join(format!("{}.service", self.descriptor.display_name()))
    }

    fn systemctl(&self, args: &[&str]) -> std::result::Result<(), StageError> {
        run_checked(self.runner.as_ref(), SYSTEMCTL, args).map(|_| ())
    }
}

/// Render the systemd unit for the service.
pub fn render_unit(description: &str, installed_binary: &Path, install_dir: &Path) -> String {
    format!(
        r#"[Unit]
Description={description}

[Service]
ExecStart={binary}
Restart=always
User=root
WorkingDirectory={workdir}

[Install]
WantedBy=multi-user.target
"#,
        description = description,
        binary = installed_binary.display(),
        workdir = install_dir.display(),
    )
}

/// `systemctl is-active` prints exactly `active` plus a newline for a running
/// unit; anything else, including stray whitespace, is not running.
pub fn parse_is_active(stdout: &str) -> bool {
    stdout == "active\n"
}

impl ServiceManager for SystemdServiceManager {
    fn install(&self) -> Result<()> {
        let name = self.service_name();
        info!("installing systemd service: {}", name);

        let install_dir = self.install_dir();
        let installed = stage_binary(&self.descriptor, &install_dir)?;

        let unit = render_unit(self.descriptor.description(), &installed, &install_dir);
        write_descriptor(&self.unit_path(), &unit)?;

        self.systemctl(&["daemon-reload"])
            .map_err(ServiceError::install(InstallStage::Register))?;
        self.systemctl(&["enable", name])
            .map_err(ServiceError::install(InstallStage::Register))?;
        self.systemctl(&["start", name])
            .map_err(ServiceError::install(InstallStage::Start))?;

        info!("service installed and started: {}", name);
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        let name = self.service_name();
        info!("uninstalling systemd service: {}", name);

        // Stop if running
        run_ignored(self.runner.as_ref(), SYSTEMCTL, &["stop", name]);
        run_ignored(self.runner.as_ref(), SYSTEMCTL, &["disable", name]);

        remove_descriptor(&self.unit_path()).map_err(ServiceError::UninstallFailed)?;

        run_ignored(self.runner.as_ref(), SYSTEMCTL, &["daemon-reload"]);

        info!("service uninstalled: {}", name);
        Ok(())
    }

    fn start(&self) -> Result<()> {
        info!("starting service: {}", self.service_name());
        self.systemctl(&["start", self.service_name()])
            .map_err(ServiceError::StartFailed)
    }

    fn stop(&self) -> Result<()> {
        info!("stopping service: {}", self.service_name());
        self.systemctl(&["stop", self.service_name()])
            .map_err(ServiceError::StopFailed)
    }

    fn status(&self) -> Result<bool> {
        let args = ["is-active", self.service_name()];
        let running = run_query(self.runner.as_ref(), SYSTEMCTL, &args)
            .map(|output| parse_is_active(&output.stdout))
            .unwrap_or(false);
        Ok(running)
    }

    fn install_dir(&self) -> PathBuf {
        self.install_root.join(self.descriptor.display_name())
    }

    fn service_name(&self) -> &str {
        self.descriptor.display_name()
    }
}
