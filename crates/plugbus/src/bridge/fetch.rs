// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Nested fetch endpoint.
//!
//! When a caller attaches fetch support to an outer call, it opens a
//! transient listener here and advertises the address inside the
//! request. The callee may connect back mid-call to resolve resource
//! lookups ([`FetchHandler`]) or invoke the caller's own functions.
//!
//! The endpoint lives exactly as long as the outer call: the guard
//! returned by [`FetchEndpoint::start`] stops the accept loop, joins
//! the service thread, and closes the listener when dropped, on every
//! exit path.

use crate::bridge::frame::{read_frame, write_frame};
use crate::bridge::{invoke_registered, FetchRequest, FetchResponse};
use crate::config::BridgeConfig;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::function::{CallContext, Fetcher, FunctionRegistry};
use crate::types::TypeDescriptor;
use crate::value::DynamicValue;
use crate::wire::codec;
use parking_lot::Mutex;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Caller-supplied resolver for mid-call resource lookups.
pub trait FetchHandler: Send + Sync {
    /// Resolve `name` of `resource_type` against `request`.
    fn fetch(
        &self,
        resource_type: &str,
        name: &str,
        request: &DynamicValue,
    ) -> (DynamicValue, Vec<Diagnostic>);
}

impl<F> FetchHandler for F
where
    F: Fn(&str, &str, &DynamicValue) -> (DynamicValue, Vec<Diagnostic>) + Send + Sync,
{
    fn fetch(
        &self,
        resource_type: &str,
        name: &str,
        request: &DynamicValue,
    ) -> (DynamicValue, Vec<Diagnostic>) {
        self(resource_type, name, request)
    }
}

/// Factory for transient fetch endpoints.
///
/// [`PluginClient::execute_function_with_fetch`] manages one of these
/// per outer call; hosts driving their own transport can start and
/// scope endpoints directly.
///
/// [`PluginClient::execute_function_with_fetch`]:
///     crate::bridge::PluginClient::execute_function_with_fetch
pub struct FetchEndpoint;

impl FetchEndpoint {
    /// Bind a transient listener and serve it on its own thread until
    /// the returned guard is dropped.
    pub fn start(
        handler: Arc<dyn FetchHandler>,
        functions: Arc<FunctionRegistry>,
        config: &BridgeConfig,
    ) -> Result<FetchGuard> {
        let listener = TcpListener::bind(config.fetch_bind_addr.as_str())?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let poll_interval = config.poll_interval;
        let max_frame_size = config.max_frame_size;

        let thread = std::thread::Builder::new()
            .name("plugbus-fetch".to_string())
            .spawn(move || {
                log::debug!("fetch endpoint listening on {}", addr);
                while !flag.load(Ordering::Relaxed) {
                    match listener.accept() {
                        Ok((stream, peer)) => {
                            log::debug!("fetch endpoint: connection from {}", peer);
                            if let Err(e) = serve_connection(
                                stream,
                                &flag,
                                &handler,
                                &functions,
                                max_frame_size,
                            ) {
                                log::warn!("fetch endpoint: connection error: {}", e);
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                            std::thread::sleep(poll_interval);
                        }
                        Err(e) => {
                            log::warn!("fetch endpoint: accept error: {}", e);
                            break;
                        }
                    }
                }
                log::debug!("fetch endpoint on {} stopped", addr);
            })
            .map_err(Error::Io)?;

        Ok(FetchGuard {
            addr,
            shutdown,
            thread: Some(thread),
        })
    }
}

fn serve_connection(
    stream: TcpStream,
    shutdown: &AtomicBool,
    handler: &Arc<dyn FetchHandler>,
    functions: &Arc<FunctionRegistry>,
    max_frame_size: usize,
) -> Result<()> {
    let mut stream = stream;
    stream.set_nonblocking(false)?;
    // Wake up periodically so teardown is not stuck behind an idle peer.
    stream.set_read_timeout(Some(Duration::from_millis(50)))?;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Ok(());
        }
        let payload = match read_frame(&mut stream, max_frame_size) {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(()),
            Err(Error::Io(e))
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => return Err(e),
        };

        let request: FetchRequest = serde_json::from_slice(&payload)?;
        let response = dispatch(&request, handler, functions);
        let body = serde_json::to_vec(&response)?;
        write_frame(&mut stream, &body, max_frame_size)?;
    }
}

fn dispatch(
    request: &FetchRequest,
    handler: &Arc<dyn FetchHandler>,
    functions: &Arc<FunctionRegistry>,
) -> FetchResponse {
    match request {
        FetchRequest::Fetch {
            resource_type,
            name,
            request,
        } => {
            let decoded = match codec::decode(request, &TypeDescriptor::Unknown) {
                Ok(value) => value,
                Err(e) => {
                    return FetchResponse::Error {
                        message: e.to_string(),
                    }
                }
            };
            let (value, diagnostics) = handler.fetch(resource_type, name, &decoded);
            match codec::encode(&value, &TypeDescriptor::Unknown) {
                Ok(value) => FetchResponse::Value { value, diagnostics },
                Err(e) => FetchResponse::Error {
                    message: e.to_string(),
                },
            }
        }
        FetchRequest::Function { name, arguments } => {
            // The callee has no signature for caller functions, so the
            // result travels self-describing.
            let encoded = invoke_registered(functions, &CallContext::local(), name, arguments)
                .and_then(|(result, _)| codec::encode(&result, &TypeDescriptor::Unknown));
            match encoded {
                Ok(result) => FetchResponse::Result { result },
                Err(e) => FetchResponse::Error {
                    message: e.to_string(),
                },
            }
        }
    }
}

/// Keeps the transient endpoint alive; dropping it tears the endpoint
/// down and waits for the service thread.
pub struct FetchGuard {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FetchGuard {
    /// Address the endpoint is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Callee-side proxy for a caller's fetch endpoint, connected lazily on
/// first use. Implements [`Fetcher`] so executing functions can reach
/// it through their call context.
pub(crate) struct FetchProxy {
    addr: String,
    max_frame_size: usize,
    stream: Mutex<Option<TcpStream>>,
}

impl FetchProxy {
    pub(crate) fn new(addr: impl Into<String>, config: &BridgeConfig) -> Self {
        Self {
            addr: addr.into(),
            max_frame_size: config.max_frame_size,
            stream: Mutex::new(None),
        }
    }

    fn round_trip(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let mut guard = self.stream.lock();
        if guard.is_none() {
            *guard = Some(TcpStream::connect(self.addr.as_str())?);
        }
        let stream = guard.as_mut().expect("connected above");

        let body = serde_json::to_vec(request)?;
        write_frame(stream, &body, self.max_frame_size)?;
        let payload = read_frame(stream, self.max_frame_size)?
            .ok_or_else(|| Error::Protocol("fetch endpoint closed".to_string()))?;
        Ok(serde_json::from_slice(&payload)?)
    }
}

impl Fetcher for FetchProxy {
    fn fetch(
        &self,
        resource_type: &str,
        name: &str,
        request: &DynamicValue,
    ) -> Result<(DynamicValue, Vec<Diagnostic>)> {
        let wire = codec::encode(request, &TypeDescriptor::Unknown)?;
        let response = self.round_trip(&FetchRequest::Fetch {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            request: wire,
        })?;
        match response {
            FetchResponse::Value { value, diagnostics } => {
                let value = codec::decode(&value, &TypeDescriptor::Unknown)?;
                Ok((value, diagnostics))
            }
            FetchResponse::Error { message } => Err(Error::Call(message)),
            FetchResponse::Result { .. } => {
                Err(Error::Protocol("unexpected fetch response".to_string()))
            }
        }
    }

    fn call(&self, name: &str, args: &[DynamicValue]) -> Result<DynamicValue> {
        let mut arguments = Vec::with_capacity(args.len());
        for arg in args {
            arguments.push(codec::encode(arg, &TypeDescriptor::Unknown)?);
        }
        let response = self.round_trip(&FetchRequest::Function {
            name: name.to_string(),
            arguments,
        })?;
        match response {
            FetchResponse::Result { result } => {
                codec::decode(&result, &TypeDescriptor::Unknown)
            }
            FetchResponse::Error { message } => Err(Error::Call(message)),
            FetchResponse::Value { .. } => {
                Err(Error::Protocol("unexpected fetch response".to_string()))
            }
        }
    }
}
