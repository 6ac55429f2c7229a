// macOS platform implementation

pub mod service;

pub use service::LaunchdServiceManager;
