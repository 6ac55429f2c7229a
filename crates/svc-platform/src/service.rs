use std::path::PathBuf;

use crate::error::Result;

/// Lifecycle control of one background service through the platform's
/// native service manager.
///
/// Implementations hold no state about the service; every call asks the
/// native manager, which is the only source of truth.
pub trait ServiceManager: Send + Sync {
    /// Copy the binary into place, write the native descriptor, register it
    /// and leave the service running.
    fn install(&self) -> Result<()>;

    /// Stop the service (best effort) and remove its registration.
    fn uninstall(&self) -> Result<()>;

    /// Start the service
    fn start(&self) -> Result<()>;

    /// Stop the service
    fn stop(&self) -> Result<()>;

    /// Whether the service is running. A failed query counts as not running.
    fn status(&self) -> Result<bool>;

    /// Directory the binary is installed under.
    fn install_dir(&self) -> PathBuf;

    /// Identifier passed to the native service manager.
    fn service_name(&self) -> &str;
}
