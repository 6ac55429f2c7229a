//! Windows Service Control Manager (SCM): install/uninstall/start/stop the service.
//!
//! Everything goes through `sc.exe`, so this compiles and tests on any host.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use svc_platform::command::{run_checked, run_ignored, run_query};
use svc_platform::installer::{remove_dir_tree, stage_binary};
use svc_platform::{
    CommandRunner, InstallStage, Result, ServiceDescriptor, ServiceError, ServiceManager,
    StageError, SystemCommandRunner,
};

const SC: &str = "sc.exe";
const DEFAULT_PROGRAM_DATA: &str = r"C:\ProgramData";

pub struct ScServiceManager {
    descriptor: ServiceDescriptor,
    install_root: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl ScServiceManager {
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        Self::with_runner(descriptor, Arc::new(SystemCommandRunner))
    }

    pub fn with_runner(descriptor: ServiceDescriptor, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            descriptor,
            install_root: program_data_dir(),
            runner,
        }
    }

    /// Relocate the install root (used by tests).
    pub fn with_install_root(mut self, install_root: impl Into<PathBuf>) -> Self {
        self.install_root = install_root.into();
        self
    }

    fn sc(&self, args: &[&str]) -> std::result::Result<(), StageError> {
        run_checked(self.runner.as_ref(), SC, args).map(|_| ())
    }
}

/// `%ProgramData%`, falling back to the stock location when unset.
pub fn program_data_dir() -> PathBuf {
    std::env::var_os("ProgramData")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM_DATA))
}

/// Arguments for `sc.exe create`. `sc.exe` expects each `key=` and its value
/// as separate arguments.
pub fn render_create_args(name: &str, display_name: &str, installed_binary: &Path) -> Vec<String> {
    vec![
        "create".to_string(),
        name.to_string(),
        "binPath=".to_string(),
        format!("\"{}\" -run", installed_binary.display()),
        "DisplayName=".to_string(),
        display_name.to_string(),
        "start=".to_string(),
        "auto".to_string(),
        "obj=".to_string(),
        "LocalSystem".to_string(),
    ]
}

/// `sc.exe query` prints a `STATE` line containing `RUNNING` for a running
/// service.
pub fn parse_query(stdout: &str) -> bool {
    stdout.contains("RUNNING")
}

impl ServiceManager for ScServiceManager {
    fn install(&self) -> Result<()> {
        let name = self.service_name();
        info!("installing Windows service: {}", name);

        let install_dir = self.install_dir();
        let installed = stage_binary(&self.descriptor, &install_dir)?;

        let create = render_create_args(name, self.descriptor.display_name(), &installed);
        let create: Vec<&str> = create.iter().map(String::as_str).collect();
        self.sc(&create)
            .map_err(ServiceError::install(InstallStage::Register))?;

        self.sc(&["description", name, self.descriptor.description()])
            .map_err(ServiceError::install(InstallStage::Describe))?;

        self.sc(&["start", name])
            .map_err(ServiceError::install(InstallStage::Start))?;

        info!("service installed and started: {}", name);
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        let name = self.service_name();
        info!("uninstalling Windows service: {}", name);

        // Stop if running
        run_ignored(self.runner.as_ref(), SC, &["stop", name]);

        self.sc(&["delete", name])
            .map_err(ServiceError::UninstallFailed)?;

        let install_dir = self.install_dir();
        remove_dir_tree(&install_dir).map_err(ServiceError::UninstallFailed)?;
        info!("install directory removed: {}", install_dir.display());

        info!("service uninstalled: {}", name);
        Ok(())
    }

    fn start(&self) -> Result<()> {
        info!("starting service: {}", self.service_name());
        self.sc(&["start", self.service_name()])
            .map_err(ServiceError::StartFailed)
    }

    fn stop(&self) -> Result<()> {
        info!("stopping service: {}", self.service_name());
        self.sc(&["stop", self.service_name()])
            .map_err(ServiceError::StopFailed)
    }

    fn status(&self) -> Result<bool> {
        let running = run_query(self.runner.as_ref(), SC, &["query", self.service_name()])
            .map(|output| parse_query(&output.stdout))
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use svc_platform::testing::{exit, ok, FakeRunner};
    use tempfile::TempDir;

    const QUERY_RUNNING: &str = concat!(
        "\r\nSERVICE_NAME: demo \r\n",
        "        TYPE               : 10  WIN32_OWN_PROCESS  \r\n",
        "        STATE              : 4  RUNNING \r\n",
        "                                (STOPPABLE, NOT_PAUSABLE, ACCEPTS_SHUTDOWN)\r\n",
    );
    const QUERY_STOPPED: &str = concat!(
        "\r\nSERVICE_NAME: demo \r\n",
        "        TYPE               : 10  WIN32_OWN_PROCESS  \r\n",
        "        STATE              : 1  STOPPED \r\n",
    );

    struct Fixture {
        _dir: TempDir,
        exe: PathBuf,
        root: PathBuf,
        runner: Arc<FakeRunner>,
        manager: ScServiceManager,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("hello-service.exe");
        fs::write(&exe, b"MZ portable executable").unwrap();
        let root = dir.path().join("ProgramData");

        let runner = Arc::new(FakeRunner::new());
        let descriptor = ServiceDescriptor::new(&exe, "demo", "Demo service").unwrap();
        let manager =
            ScServiceManager::with_runner(descriptor, runner.clone()).with_install_root(&root);

        Fixture {
            _dir: dir,
            exe,
            root,
            runner,
            manager,
        }
    }

    #[test]
    fn create_args_match_sc_syntax() {
        let args = render_create_args("demo", "demo", Path::new("/pd/demo/bin/svc.exe"));
        assert_eq!(
            args,
            vec![
                "create",
                "demo",
                "binPath=",
                "\"/pd/demo/bin/svc.exe\" -run",
                "DisplayName=",
                "demo",
                "start=",
                "auto",
                "obj=",
                "LocalSystem",
            ]
        );
    }

    #[test]
    fn query_parsing_looks_for_running_anywhere() {
        assert!(parse_query(QUERY_RUNNING));
        assert!(parse_query("RUNNING"));
        assert!(!parse_query(QUERY_STOPPED));
        assert!(!parse_query("running"));
        assert!(!parse_query(""));
    }

    #[test]
    fn install_creates_describes_and_starts() {
        let f = fixture();

        f.manager.install().unwrap();

        let installed = f.root.join("demo").join("bin").join("hello-service.exe");
        assert_eq!(fs::read(&installed).unwrap(), fs::read(&f.exe).unwrap());

        let calls = f.runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0][0], "sc.exe");
        assert_eq!(&calls[0][1..3], ["create", "demo"]);
        assert_eq!(calls[0][4], format!("\"{}\" -run", installed.display()));
        assert_eq!(calls[1], ["sc.exe", "description", "demo", "Demo service"]);
        assert_eq!(calls[2], ["sc.exe", "start", "demo"]);
    }

    #[test]
    fn install_then_status_reports_running() {
        let f = fixture();
        f.runner.respond(&["sc.exe", "query", "demo"], ok(QUERY_RUNNING));

        f.manager.install().unwrap();
        assert!(f.manager.status().unwrap());
    }

    #[test]
    fn create_failure_stops_install() {
        let f = fixture();
        let installed = f.root.join("demo").join("bin").join("hello-service.exe");
        let create = render_create_args("demo", "demo", &installed);
        let mut argv = vec!["sc.exe"];
        argv.extend(create.iter().map(String::as_str));
        f.runner.respond(
            &argv,
            exit(
                1073,
                "[SC] CreateService FAILED 1073:\r\n\r\nThe specified service already exists.\r\n",
                "",
            ),
        );

        let err = f.manager.install().unwrap_err();

        assert_eq!(err.install_stage(), Some(InstallStage::Register));
        assert_eq!(f.runner.calls().len(), 1);
    }

    #[test]
    fn description_failure_is_describe_stage() {
        let f = fixture();
        f.runner
            .respond(&["sc.exe", "description", "demo", "Demo service"], exit(5, "", ""));

        let err = f.manager.install().unwrap_err();
        assert_eq!(err.install_stage(), Some(InstallStage::Describe));
    }

    #[test]
    fn uninstall_deletes_service_and_install_dir() {
        let f = fixture();
        f.manager.install().unwrap();
        f.runner.clear_calls();
        f.runner.respond(&["sc.exe", "stop", "demo"], exit(1062, "", ""));
        f.runner.respond(
            &["sc.exe", "query", "demo"],
            exit(1060, "[SC] EnumQueryServicesStatus:OpenService FAILED 1060:", ""),
        );

        f.manager.uninstall().unwrap();

        assert!(!f.root.join("demo").exists());
        assert_eq!(
            f.runner.command_lines(),
            vec!["sc.exe stop demo", "sc.exe delete demo"]
        );
        assert!(!f.manager.status().unwrap());
    }

    #[test]
    fn uninstall_fails_when_delete_fails() {
        let f = fixture();
        f.manager.install().unwrap();
        f.runner.respond(&["sc.exe", "delete", "demo"], exit(1060, "", ""));

        let err = f.manager.uninstall().unwrap_err();

        assert!(matches!(
            err,
            ServiceError::UninstallFailed(StageError::NativeCommandFailed { .. })
        ));
        assert!(f.root.join("demo").exists());
    }

    #[test]
    fn start_stop_and_status() {
        let f = fixture();
        f.runner.respond(&["sc.exe", "query", "demo"], ok(QUERY_STOPPED));
        f.manager.stop().unwrap();
        assert!(!f.manager.status().unwrap());

        f.runner.respond(&["sc.exe", "query", "demo"], ok(QUERY_RUNNING));
        f.manager.start().unwrap();
        assert!(f.manager.status().unwrap());

        f.runner.respond(&["sc.exe", "start", "demo"], exit(1056, "", ""));
        assert!(matches!(f.manager.start(), Err(ServiceError::StartFailed(_))));
    }

    #[test]
    fn status_when_sc_cannot_run_is_not_running() {
        let f = fixture();
        f.runner.fail_spawn(&["sc.exe", "query", "demo"]);
        assert!(!f.manager.status().unwrap());
    }

    #[test]
    fn install_dir_is_under_program_data() {
        let desc = ServiceDescriptor::new("/tmp/hello-service.exe", "demo", "d").unwrap();
        let manager = ScServiceManager::new(desc);
        assert_eq!(manager.install_dir(), program_data_dir().join("demo"));
    }
}
