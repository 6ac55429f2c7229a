//! Picks the service controller for an operating system.

use std::sync::Arc;

use svc_linux::SystemdServiceManager;
use svc_macos::LaunchdServiceManager;
use svc_platform::{
    CommandRunner, ServiceDescriptor, ServiceError, ServiceManager, SystemCommandRunner,
};
use svc_windows::ScServiceManager;

/// Controller for `os` (as in [`std::env::consts::OS`]).
pub fn manager_for_os(
    os: &str,
    descriptor: ServiceDescriptor,
    runner: Arc<dyn CommandRunner>,
) -> Result<Box<dyn ServiceManager>, ServiceError> {
    match os {
        "macos" => Ok(Box::new(LaunchdServiceManager::with_runner(descriptor, runner))),
        "linux" => Ok(Box::new(SystemdServiceManager::with_runner(descriptor, runner))),
        "windows" => Ok(Box::new(ScServiceManager::with_runner(descriptor, runner))),
        other => Err(ServiceError::UnsupportedPlatform(other.to_string())),
    }
}

/// Controller for the OS this binary was built for, driving the real
/// native tools.
pub fn current_manager(
    descriptor: ServiceDescriptor,
) -> Result<Box<dyn ServiceManager>, ServiceError> {
    manager_for_os(std::env::consts::OS, descriptor, Arc::new(SystemCommandRunner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use svc_platform::testing::FakeRunner;

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::new("/tmp/hello-service", "demo", "Demo").unwrap()
    }

    #[test]
    fn selects_controller_per_os() {
        let runner = Arc::new(FakeRunner::new());

        let mac = manager_for_os("macos", descriptor(), runner.clone()).unwrap();
        assert_eq!(mac.install_dir(), PathBuf::from("/usr/local/demo"));

        let linux = manager_for_os("linux", descriptor(), runner.clone()).unwrap();
        assert_eq!(linux.install_dir(), PathBuf::from("/opt/demo"));

        let windows = manager_for_os("windows", descriptor(), runner.clone()).unwrap();
        assert!(windows.install_dir().ends_with("demo"));

        for manager in [&mac, &linux, &windows] {
            assert_eq!(manager.service_name(), "demo");
        }
    }

    #[test]
    fn selected_controller_uses_its_native_tool() {
        let runner = Arc::new(FakeRunner::new());
        let tools = [("macos", "launchctl"), ("linux", "systemctl"), ("windows", "sc.exe")];
        for (os, program) in tools {
            runner.clear_calls();
            let manager = manager_for_os(os, descriptor(), runner.clone()).unwrap();
            manager.stop().unwrap();
            assert_eq!(runner.calls()[0][0], program, "{}", os);
        }
    }

    #[test]
    fn unknown_os_is_unsupported() {
        let runner = Arc::new(FakeRunner::new());
        for os in ["freebsd", "android", ""] {
            let err = manager_for_os(os, descriptor(), runner.clone()).err().unwrap();
            assert!(matches!(err, ServiceError::UnsupportedPlatform(ref name) if name == os));
        }
    }

    #[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
    #[test]
    fn current_os_is_supported() {
        assert!(current_manager(descriptor()).is_ok());
    }
}
