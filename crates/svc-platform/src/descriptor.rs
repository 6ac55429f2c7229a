use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Result, ServiceError};

/// Characters that would break a systemd unit, a plist, or an `sc.exe`
/// argument when embedded in a service name.
const FORBIDDEN_NAME_CHARS: &[char] = &['"', '\'', '/', '\\', '<', '>', '&', '`', '$', ';', '|'];

/// Immutable configuration for one managed service.
///
/// The display name doubles as the identifier handed to the native service
/// manager, so it ends up in file names, unit names and SCM keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    executable_path: PathBuf,
    binary_name: OsString,
    display_name: String,
    description: String,
}

impl ServiceDescriptor {
    pub fn new(
        executable_path: impl Into<PathBuf>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let executable_path = executable_path.into();
        let display_name = display_name.into();
        let description = description.into();

        validate_service_name(&display_name)?;
        if description.contains(|c: char| c == '\n' || c == '\r') {
            return Err(ServiceError::InvalidDescriptor(
                "description must be a single line".into(),
            ));
        }
        let binary_name = executable_path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| {
                ServiceError::InvalidDescriptor(format!(
                    "executable path {} has no file name",
                    executable_path.display()
                ))
            })?;

        Ok(Self {
            executable_path,
            binary_name,
            display_name,
            description,
        })
    }

    /// Descriptor for the executable of the running process.
    pub fn from_current_exe(
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let exe = std::env::current_exe().map_err(ServiceError::ExecutableUnresolved)?;
        Self::new(exe, display_name, description)
    }

    pub fn executable_path(&self) -> &Path {
        &self.executable_path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Where the binary lives once installed: `<install_dir>/bin/<base name>`.
    pub fn installed_binary_path(&self, install_dir: &Path) -> PathBuf {
        install_dir.join("bin").join(&self.binary_name)
    }
}

/// Check that a service name is safe to use as a native identifier.
pub fn validate_service_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::InvalidDescriptor(
            "service name cannot be empty".into(),
        ));
    }
    if name == "." || name == ".." {
        return Err(ServiceError::InvalidDescriptor(format!(
            "service name {:?} is not allowed",
            name
        )));
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_NAME_CHARS.contains(&c))
    {
        return Err(ServiceError::InvalidDescriptor(format!(
            "service name {:?} contains invalid characters",
            name
        )));
    }
    Ok(())
}
