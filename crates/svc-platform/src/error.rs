//! Error types for service lifecycle operations.
//!
//! [`StageError`] describes what went wrong at a single step (a file copy, a
//! native command). [`ServiceError`] wraps it with the lifecycle operation it
//! belongs to, so callers see both the operation and the underlying cause.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

/// Failure of a single step inside a lifecycle operation.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to open source file {}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {} to {}", from.display(), to.display())]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {}", path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write service descriptor {}", path.display())]
    DescriptorWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove service descriptor {}", path.display())]
    DescriptorRemoveFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove directory {}", path.display())]
    DirectoryRemoveFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed: {detail}")]
    NativeCommandFailed { command: String, detail: String },
}

/// Step of [`crate::ServiceManager::install`] that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    CreateInstallDir,
    CopyBinary,
    WriteDescriptor,
    Register,
    Describe,
    Start,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            InstallStage::CreateInstallDir => "create install directory",
            InstallStage::CopyBinary => "copy binary",
            InstallStage::WriteDescriptor => "write service descriptor",
            InstallStage::Register => "register with service manager",
            InstallStage::Describe => "set service description",
            InstallStage::Start => "start service",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("install failed: could not {stage}")]
    InstallFailed {
        stage: InstallStage,
        #[source]
        source: StageError,
    },

    #[error("uninstall failed")]
    UninstallFailed(#[source] StageError),

    #[error("start failed")]
    StartFailed(#[source] StageError),

    #[error("stop failed")]
    StopFailed(#[source] StageError),

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("invalid service descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("cannot resolve current executable")]
    ExecutableUnresolved(#[source] io::Error),
}

impl ServiceError {
    pub fn install(stage: InstallStage) -> impl FnOnce(StageError) -> ServiceError {
        move |source| ServiceError::InstallFailed { stage, source }
    }

    /// The install stage that failed, if this is an install error.
    pub fn install_stage(&self) -> Option<InstallStage> {
        match self {
            ServiceError::InstallFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
