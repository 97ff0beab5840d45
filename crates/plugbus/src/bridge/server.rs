// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serving side of the bridge.
//!
//! A `PluginServer` exposes one registry over an accepted transport.
//! Each connection gets its own thread and serves requests on it
//! sequentially, so one call is handled per request context and a
//! failed call never touches its neighbors.

use crate::bridge::fetch::FetchProxy;
use crate::bridge::frame::{read_frame, write_frame};
use crate::bridge::{execute_call, Request, Response, ServerCapabilities};
use crate::config::{BridgeConfig, PROTOCOL_VERSION};
use crate::error::{Error, Result};
use crate::function::{CallContext, FunctionRegistry};
use crate::wire::WireFunction;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Bridge server for a function registry.
pub struct PluginServer {
    registry: Arc<FunctionRegistry>,
    config: BridgeConfig,
    shutdown: Arc<AtomicBool>,
    requests_served: Arc<AtomicU64>,
}

impl PluginServer {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self::with_config(registry, BridgeConfig::default())
    }

    pub fn with_config(registry: Arc<FunctionRegistry>, config: BridgeConfig) -> Self {
        Self {
            registry,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            requests_served: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Serve the listener on the current thread until [`shutdown`] is
    /// called (from a handle obtained beforehand) or the listener dies.
    ///
    /// [`shutdown`]: PluginServer::shutdown
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        log::info!("plugin server listening on {}", addr);

        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    log::debug!("plugin server: connection from {}", peer);
                    let registry = self.registry.clone();
                    let config = self.config.clone();
                    let requests_served = self.requests_served.clone();
                    std::thread::Builder::new()
                        .name("plugbus-conn".to_string())
                        .spawn(move || {
                            if let Err(e) =
                                serve_connection(stream, &registry, &config, &requests_served)
                            {
                                log::warn!("plugin server: connection error: {}", e);
                            }
                        })
                        .map_err(Error::Io)?;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(self.config.poll_interval);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
        log::info!("plugin server on {} stopped", addr);
        Ok(())
    }

    /// Serve on a background thread; the returned handle stops the
    /// server when dropped.
    pub fn spawn(self, listener: TcpListener) -> Result<ServerHandle> {
        let addr = listener.local_addr()?;
        let shutdown = self.shutdown.clone();
        let thread = std::thread::Builder::new()
            .name("plugbus-server".to_string())
            .spawn(move || {
                if let Err(e) = self.serve(listener) {
                    log::error!("plugin server failed: {}", e);
                }
            })
            .map_err(Error::Io)?;
        Ok(ServerHandle {
            addr,
            shutdown,
            thread: Some(thread),
        })
    }

    /// Request the accept loop to stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Number of requests served so far.
    pub fn requests_served(&self) -> u64 {
        self.requests_served.load(Ordering::Relaxed)
    }
}

/// Handle for a server running on a background thread.
pub struct ServerHandle {
    addr: std::net::SocketAddr,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the server is listening on.
    pub fn addr(&self) -> std::net::SocketAddr {
        self.addr
    }

    /// Stop the accept loop and wait for the server thread.
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop_inner();
    }
}

fn serve_connection(
    mut stream: TcpStream,
    registry: &Arc<FunctionRegistry>,
    config: &BridgeConfig,
    requests_served: &AtomicU64,
) -> Result<()> {
    stream.set_read_timeout(config.io_timeout)?;

    loop {
        let payload = match read_frame(&mut stream, config.max_frame_size)? {
            Some(payload) => payload,
            None => return Ok(()),
        };
        let request: Request = serde_json::from_slice(&payload)?;
        let response = dispatch(&request, registry, config);
        let body = serde_json::to_vec(&response)?;
        write_frame(&mut stream, &body, config.max_frame_size)?;
        requests_served.fetch_add(1, Ordering::Relaxed);
    }
}

fn dispatch(
    request: &Request,
    registry: &Arc<FunctionRegistry>,
    config: &BridgeConfig,
) -> Response {
    match request {
        Request::Setup { protocol_version } => {
            log::debug!("setup: peer protocol version {}", protocol_version);
            Response::Setup {
                capabilities: ServerCapabilities {
                    protocol_version: PROTOCOL_VERSION,
                    functions: true,
                    fetch: true,
                },
                diagnostics: Vec::new(),
            }
        }
        Request::ListFunctions => {
            let mut functions = Vec::with_capacity(registry.len());
            for (name, function) in registry.entries() {
                match WireFunction::from_function(&name, &function) {
                    Ok(wire) => functions.push(wire),
                    Err(e) => {
                        return Response::Error {
                            message: e.to_string(),
                        }
                    }
                }
            }
            Response::Functions { functions }
        }
        Request::ExecuteFunction {
            name,
            arguments,
            fetch,
        } => {
            let ctx = match fetch {
                Some(addr) => CallContext::with_fetcher(Arc::new(FetchProxy::new(
                    addr.as_str(),
                    config,
                ))),
                None => CallContext::local(),
            };
            log::debug!(
                "execute {:?} with {} argument(s){}",
                name,
                arguments.len(),
                if fetch.is_some() { " and fetch" } else { "" }
            );
            match execute_call(registry, &ctx, name, arguments) {
                Ok(result) => Response::Result { result },
                Err(e) => {
                    log::warn!("execute {:?} failed: {}", name, e);
                    Response::Error {
                        message: e.to_string(),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Request;
    use std::convert::Infallible;

    fn registry() -> Arc<FunctionRegistry> {
        let registry = FunctionRegistry::new();
        registry
            .register_native("ping", || Ok::<_, Infallible>("pong".to_string()))
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn setup_reports_capabilities() {
        let response = dispatch(
            &Request::Setup {
                protocol_version: PROTOCOL_VERSION,
            },
            &registry(),
            &BridgeConfig::default(),
        );
        match response {
            Response::Setup {
                capabilities,
                diagnostics,
            } => {
                assert_eq!(capabilities.protocol_version, PROTOCOL_VERSION);
                assert!(capabilities.functions);
                assert!(capabilities.fetch);
                assert!(diagnostics.is_empty());
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn list_functions_includes_signatures() {
        let response = dispatch(&Request::ListFunctions, &registry(), &BridgeConfig::default());
        match response {
            Response::Functions { functions } => {
                assert_eq!(functions.len(), 1);
                assert_eq!(functions[0].name, "ping");
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn execute_unknown_function_is_an_error_response() {
        let response = dispatch(
            &Request::ExecuteFunction {
                name: "ghost".to_string(),
                arguments: vec![],
                fetch: None,
            },
            &registry(),
            &BridgeConfig::default(),
        );
        match response {
            Response::Error { message } => assert!(message.contains("ghost")),
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
