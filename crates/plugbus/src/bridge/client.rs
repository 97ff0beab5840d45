// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Calling side of the bridge.
//!
//! A `PluginClient` wraps a connected stream and exposes the three
//! boundary operations. `ListFunctions` yields [`RemoteFunction`]
//! proxies carrying the remote signatures, so the host can bind them
//! into its own evaluation environment and call through them.
//!
//! Failures of Setup and ListFunctions surface as diagnostics rather
//! than errors; a plugin that cannot even describe itself should
//! degrade into a report the host can show.

use crate::bridge::fetch::{FetchEndpoint, FetchHandler};
use crate::bridge::frame::{read_frame, write_frame};
use crate::bridge::{Request, Response, ServerCapabilities};
use crate::config::{BridgeConfig, PROTOCOL_VERSION};
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::function::{FunctionRegistry, Parameter};
use crate::types::TypeDescriptor;
use crate::value::DynamicValue;
use crate::wire::{codec, WireFunction};
use parking_lot::Mutex;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;

/// Bridge client over one connected transport.
pub struct PluginClient {
    stream: Mutex<TcpStream>,
    config: BridgeConfig,
}

impl PluginClient {
    /// Connect to a serving endpoint.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::with_config(TcpStream::connect(addr)?, BridgeConfig::default())
    }

    /// Wrap an already-connected transport, as supplied by the host's
    /// process-launch machinery.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        Self::with_config(stream, BridgeConfig::default())
    }

    pub fn with_config(stream: TcpStream, config: BridgeConfig) -> Result<Self> {
        stream.set_read_timeout(config.io_timeout)?;
        Ok(Self {
            stream: Mutex::new(stream),
            config,
        })
    }

    fn round_trip(&self, request: &Request) -> Result<Response> {
        let mut stream = self.stream.lock();
        let body = serde_json::to_vec(request)?;
        write_frame(&mut *stream, &body, self.config.max_frame_size)?;
        let payload = read_frame(&mut *stream, self.config.max_frame_size)?
            .ok_or_else(|| Error::Protocol("server closed the connection".to_string()))?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Negotiate capabilities. Transport failures come back as
    /// diagnostics, not errors.
    pub fn setup(&self) -> (Option<ServerCapabilities>, Vec<Diagnostic>) {
        match self.round_trip(&Request::Setup {
            protocol_version: PROTOCOL_VERSION,
        }) {
            Ok(Response::Setup {
                capabilities,
                diagnostics,
            }) => (Some(capabilities), diagnostics),
            Ok(Response::Error { message }) => (
                None,
                vec![Diagnostic::error("Failed to set up plugin").with_detail(message)],
            ),
            Ok(_) => (
                None,
                vec![Diagnostic::error("Failed to set up plugin")
                    .with_detail("unexpected response")],
            ),
            Err(e) => (
                None,
                vec![Diagnostic::from_failure("Failed to set up plugin", &e)],
            ),
        }
    }

    /// Fetch the remote signatures. Failures come back as diagnostics.
    pub fn list_functions(&self) -> (Vec<RemoteFunction>, Vec<Diagnostic>) {
        match self.round_trip(&Request::ListFunctions) {
            Ok(Response::Functions { functions }) => {
                let mut out = Vec::with_capacity(functions.len());
                for wire in functions {
                    match RemoteFunction::from_wire(&wire) {
                        Ok(function) => out.push(function),
                        Err(e) => {
                            return (
                                Vec::new(),
                                vec![Diagnostic::from_failure(
                                    "Failed to list plugin functions",
                                    &e,
                                )],
                            )
                        }
                    }
                }
                (out, Vec::new())
            }
            Ok(Response::Error { message }) => (
                Vec::new(),
                vec![Diagnostic::error("Failed to list plugin functions").with_detail(message)],
            ),
            Ok(_) => (
                Vec::new(),
                vec![Diagnostic::error("Failed to list plugin functions")
                    .with_detail("unexpected response")],
            ),
            Err(e) => (
                Vec::new(),
                vec![Diagnostic::from_failure("Failed to list plugin functions", &e)],
            ),
        }
    }

    /// Execute a remote function. Arguments travel typed by their own
    /// type; the result decodes against `return_type`.
    pub fn execute_function(
        &self,
        name: &str,
        return_type: &TypeDescriptor,
        args: &[DynamicValue],
    ) -> Result<DynamicValue> {
        self.execute_inner(name, return_type, args, None)
    }

    /// Execute a remote function with a fetch side channel attached.
    ///
    /// A transient endpoint is opened for exactly this call, serving
    /// `handler` and `functions` to the callee, and is torn down when
    /// this method returns, on every path.
    pub fn execute_function_with_fetch(
        &self,
        name: &str,
        return_type: &TypeDescriptor,
        args: &[DynamicValue],
        handler: Arc<dyn FetchHandler>,
        functions: Arc<FunctionRegistry>,
    ) -> Result<DynamicValue> {
        let guard = FetchEndpoint::start(handler, functions, &self.config)?;
        let fetch_addr = guard.addr().to_string();
        self.execute_inner(name, return_type, args, Some(fetch_addr))
        // guard drops here, stopping the endpoint.
    }

    fn execute_inner(
        &self,
        name: &str,
        return_type: &TypeDescriptor,
        args: &[DynamicValue],
        fetch: Option<String>,
    ) -> Result<DynamicValue> {
        let mut arguments = Vec::with_capacity(args.len());
        for arg in args {
            arguments.push(codec::encode(arg, arg.ty())?);
        }
        let response = self.round_trip(&Request::ExecuteFunction {
            name: name.to_string(),
            arguments,
            fetch,
        })?;
        match response {
            Response::Result { result } => codec::decode(&result, return_type),
            Response::Error { message } => Err(Error::Call(message)),
            _ => Err(Error::Protocol("unexpected response".to_string())),
        }
    }
}

/// Signature of a remote function, usable as a local proxy callable.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFunction {
    name: String,
    description: String,
    parameters: Vec<Parameter>,
    variadic: Option<Parameter>,
    return_type: TypeDescriptor,
}

impl RemoteFunction {
    fn from_wire(wire: &WireFunction) -> Result<Self> {
        let mut parameters = Vec::with_capacity(wire.parameters.len());
        for parameter in &wire.parameters {
            parameters.push(parameter.to_parameter()?);
        }
        Ok(Self {
            name: wire.name.clone(),
            description: wire.description.clone(),
            parameters,
            variadic: wire
                .variadic
                .as_ref()
                .map(|p| p.to_parameter())
                .transpose()?,
            return_type: wire.return_type.to_descriptor()?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn variadic(&self) -> Option<&Parameter> {
        self.variadic.as_ref()
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    /// Call through the client, decoding the result by this signature's
    /// return type.
    pub fn call(&self, client: &PluginClient, args: &[DynamicValue]) -> Result<DynamicValue> {
        client.execute_function(&self.name, &self.return_type, args)
    }

    /// [`call`](RemoteFunction::call) with a fetch side channel.
    pub fn call_with_fetch(
        &self,
        client: &PluginClient,
        args: &[DynamicValue],
        handler: Arc<dyn FetchHandler>,
        functions: Arc<FunctionRegistry>,
    ) -> Result<DynamicValue> {
        client.execute_function_with_fetch(&self.name, &self.return_type, args, handler, functions)
    }
}
