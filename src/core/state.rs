//! Process-wide server state.
//!
//! - `SHUTDOWN`: Has shutdown been requested? (Ctrl+C received)
//! - `SERVER`: The listener to unblock on shutdown, once bound
//! - `DEFERRED`: A batch polls `SHUTDOWN` itself and stops between files

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tiny_http::Server;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Interrupts are handled by the running batch instead of exiting
static DEFERRED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, PartialEq, Eq)]
enum InterruptAction {
    Unblock,
    Defer,
    Exit,
}

/// What a Ctrl+C does, given the process state at the time.
fn interrupt_action(server_registered: bool, deferred: bool, repeated: bool) -> InterruptAction {
    if server_registered {
        InterruptAction::Unblock
    } else if deferred && !repeated {
        InterruptAction::Defer
    } else {
        InterruptAction::Exit
    }
}

/// Setup the global Ctrl+C handler. Call once at program start
///
/// The handler behavior depends on the process state:
/// - After `register_server()`: set the flag and unblock the listener
/// - After `defer_interrupts()`: set the flag; a second Ctrl+C exits
/// - Otherwise: exit immediately
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        let repeated = SHUTDOWN.swap(true, Ordering::SeqCst);
        let server = SERVER.get();

        match interrupt_action(server.is_some(), DEFERRED.load(Ordering::SeqCst), repeated) {
            InterruptAction::Unblock => {
                crate::log!("serve"; "shutting down...");
                if let Some(server) = server {
                    server.unblock();
                }
            }
            InterruptAction::Defer => {
                crate::log!("convert"; "interrupted, stopping after the current file");
            }
            InterruptAction::Exit => std::process::exit(130),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Let the caller observe `is_shutdown()` instead of exiting on Ctrl+C,
/// so scratch directories of the running conversion are cleaned up.
pub fn defer_interrupts() {
    DEFERRED.store(true, Ordering::SeqCst);
}

/// Register the HTTP server for graceful shutdown
///
/// Call this after binding the server, before entering the request loop
pub fn register_server(server: Arc<Server>) {
    let _ = SERVER.set(server);
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering: a request racing the flag is still answered
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
