//! Service-process side of the SCM: reports the service as running and
//! forwards stop requests to the service body.

use std::ffi::OsString;
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;
use std::time::Duration;

use tracing::{error, info};
use windows_service::service::{
    ServiceControl, ServiceControlAccept, ServiceExitCode, ServiceState, ServiceStatus,
    ServiceType,
};
use windows_service::service_control_handler::{self, ServiceControlHandlerResult};
use windows_service::{define_windows_service, service_dispatcher};

/// Work run on the SCM's service thread. The receiver yields once the SCM
/// asks the service to stop.
pub type ServiceBody = Box<dyn FnOnce(Receiver<()>) + Send>;

// service_main is a bare fn pointer, so the body is handed over through here.
static PENDING: Mutex<Option<(String, ServiceBody)>> = Mutex::new(None);

define_windows_service!(ffi_service_main, service_main);

/// Connect to the SCM and run `body` as service `name`. Blocks until the
/// service stops. Fails immediately when the process was not started by
/// the SCM.
pub fn run_as_service(name: &str, body: ServiceBody) -> windows_service::Result<()> {
    *PENDING.lock().unwrap_or_else(|e| e.into_inner()) = Some((name.to_string(), body));
    service_dispatcher::start(name, ffi_service_main)
}

fn service_main(_arguments: Vec<OsString>) {
    let pending = PENDING.lock().unwrap_or_else(|e| e.into_inner()).take();
    let Some((name, body)) = pending else {
        error!("service started without a registered body");
        return;
    };
    if let Err(e) = run_service(&name, body) {
        error!("service {} failed: {}", name, e);
    }
}

fn run_service(name: &str, body: ServiceBody) -> windows_service::Result<()> {
    let (stop_tx, stop_rx) = mpsc::channel();
    let handler = move |control| match control {
        ServiceControl::Stop | ServiceControl::Shutdown => {
            let _ = stop_tx.send(());
            ServiceControlHandlerResult::NoError
        }
        ServiceControl::Interrogate => ServiceControlHandlerResult::NoError,
        _ => ServiceControlHandlerResult::NotImplemented,
    };

    let status_handle = service_control_handler::register(name, handler)?;
    status_handle.set_service_status(status(
        ServiceState::Running,
        ServiceControlAccept::STOP | ServiceControlAccept::SHUTDOWN,
    ))?;
    info!("service {} running", name);

    body(stop_rx);

    status_handle.set_service_status(status(ServiceState::Stopped, ServiceControlAccept::empty()))?;
    info!("service {} stopped", name);
    Ok(())
}

fn status(state: ServiceState, accepted: ServiceControlAccept) -> ServiceStatus {
    ServiceStatus {
        service_type: ServiceType::OWN_PROCESS,
        current_state: state,
        controls_accepted: accepted,
        exit_code: ServiceExitCode::Win32(0),
        checkpoint: 0,
        wait_hint: Duration::default(),
        process_id: None,
    }
}
