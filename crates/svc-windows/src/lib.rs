// Windows platform implementation

#[cfg(target_os = "windows")]
pub mod dispatcher;
pub mod elevation;
pub mod service;

pub use service::ScServiceManager;
