//! HTTP conversion service.
//!
//! One accept loop feeds a pool of `serve.workers` threads. Each request is
//! buffered, routed by the pure [`route::handle`], then written back.

mod lifecycle;
mod multipart;
mod response;
mod route;

use crate::{
    config::AppConfig,
    core::is_shutdown,
    debug, log,
};
use anyhow::{Context, Result};
use lifecycle::InFlight;
use std::sync::Arc;
use tiny_http::{Request, Server};

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    config: Arc<AppConfig>,
}

/// Bind the HTTP server without starting the request loop
pub fn bind_server(config: Arc<AppConfig>) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    lifecycle::register_server_for_shutdown(Arc::clone(&server));

    log!("serve"; "http://{}", addr);
    if let Some(format) = config.convert.default_format {
        debug!("serve"; "default format: {}", format);
    }

    Ok(BoundServer { server, config })
}

impl BoundServer {
    /// Start the request loop (blocking) until shutdown unblocks the listener.
    pub fn run(self) -> Result<()> {
        let in_flight = InFlight::default();
        run_request_loop(&self.server, &self.config, &in_flight)?;

        // Let running conversions answer; a tracer may hold a worker this long
        let limit = self.config.trace.timeout() + std::time::Duration::from_secs(1);
        let abandoned = lifecycle::wait_for_in_flight(&in_flight, limit);
        if abandoned > 0 {
            log!("serve"; "{} request(s) still running at exit", abandoned);
        }
        Ok(())
    }
}

fn run_request_loop(server: &Server, config: &Arc<AppConfig>, in_flight: &InFlight) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.serve.workers)
        .thread_name(|i| format!("pixtrace-worker-{i}"))
        .build()
        .context("failed to create worker pool")?;

    for request in server.incoming_requests() {
        let config = Arc::clone(config);
        let guard = in_flight.enter();
        pool.spawn(move || {
            let _guard = guard;
            if let Err(e) = handle_request(request, &config) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, config: &AppConfig) -> Result<()> {
    serve_request(request, config, is_shutdown())
}

fn serve_request(mut request: Request, config: &AppConfig, shutting_down: bool) -> Result<()> {
    if shutting_down {
        return response::respond(request, route::unavailable());
    }

    let limit = config.serve.max_upload_bytes();
    let response = match response::read_request(&mut request, limit)? {
        Some(buffered) => route::handle(&buffered, config),
        None => {
            log!("serve"; "{} {}: body over {} bytes", request.method(), request.url(), limit);
            route::payload_too_large(limit)
        }
    };
    response::respond(request, response)
}
