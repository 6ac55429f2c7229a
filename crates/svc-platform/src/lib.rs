//! Shared contract for the per-platform service controllers.

pub mod command;
pub mod descriptor;
pub mod error;
pub mod installer;
pub mod service;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use descriptor::ServiceDescriptor;
pub use error::{InstallStage, Result, ServiceError, StageError};
pub use service::ServiceManager;
