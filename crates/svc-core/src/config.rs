use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use svc_platform::descriptor::validate_service_name;
use svc_platform::ServiceDescriptor;

pub const DEFAULT_DISPLAY_NAME: &str = "hello-service";
pub const DEFAULT_DESCRIPTION: &str =
    "A service that appends 'Hello World' to a file every 5 minutes.";
pub const DEFAULT_LOG_FILE_NAME: &str = "hello-service-log.txt";

/// File name of the copy of the config written next to the installed binary.
pub const INSTALLED_CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name, used as the native identifier and install directory name
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// Free-text description written into the service descriptor
    #[serde(default = "default_description")]
    pub description: String,

    /// Log file the background task appends to, relative to the install dir
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,

    /// Seconds between background task writes
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

fn default_display_name() -> String {
    DEFAULT_DISPLAY_NAME.to_string()
}
fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}
fn default_log_file_name() -> String {
    DEFAULT_LOG_FILE_NAME.to_string()
}
fn default_interval() -> u64 {
    300
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            description: default_description(),
            log_file_name: default_log_file_name(),
            interval_secs: default_interval(),
        }
    }
}

impl ServiceConfig {
    /// Default config file path for this platform
    pub fn default_path() -> PathBuf {
        let project = directories::ProjectDirs::from("com", "hello-service", "hello-service");
        if let Some(dirs) = project {
            dirs.config_dir().join("config.json")
        } else {
            PathBuf::from("hello-service-config.json")
        }
    }

    /// Config copy that sits beside an installed binary
    /// (`<install dir>/bin/<exe>` → `<install dir>/config.json`).
    pub fn installed_path(executable: &Path) -> Option<PathBuf> {
        install_dir_of(executable).map(|dir| dir.join(INSTALLED_CONFIG_FILE_NAME))
    }

    /// Load config from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config JSON in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config if the file exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_service_name(&self.display_name).context("invalid display_name")?;
        let log = Path::new(&self.log_file_name);
        if self.log_file_name.is_empty()
            || log.file_name().map(|n| n != log.as_os_str()).unwrap_or(true)
        {
            anyhow::bail!(
                "log_file_name must be a plain file name, got {:?}",
                self.log_file_name
            );
        }
        if self.interval_secs == 0 {
            anyhow::bail!("interval_secs must be greater than zero");
        }
        Ok(())
    }

    /// Build the service descriptor for the given executable.
    pub fn descriptor(&self, executable: &Path) -> Result<ServiceDescriptor> {
        let descriptor = ServiceDescriptor::new(executable, &self.display_name, &self.description)?;
        Ok(descriptor)
    }
}

/// Install directory an installed binary lives in, i.e. the parent of its
/// `bin/` directory. `None` if the binary is not inside a `bin/` directory.
pub fn install_dir_of(executable: &Path) -> Option<PathBuf> {
    let bin_dir = executable.parent()?;
    if bin_dir.file_name()? != "bin" {
        return None;
    }
    bin_dir.parent().map(Path::to_path_buf)
}
