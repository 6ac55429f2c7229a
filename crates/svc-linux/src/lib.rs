// Linux platform implementation

pub mod service;

pub use service::SystemdServiceManager;
