// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remote function bridge.
//!
//! Exposes a [`FunctionRegistry`](crate::FunctionRegistry) across a
//! process boundary over a connected TCP transport. Three operations:
//! Setup (capability negotiation), ListFunctions (signatures for
//! building local proxies), and ExecuteFunction. An outer call may
//! additionally carry a fetch endpoint: a transient server on the
//! caller's side that the callee can query mid-call, torn down when the
//! outer call returns.
//!
//! Process launch, handshake, and transport security are the host's
//! concern; the bridge starts from an already-connected socket.

pub mod frame;

mod client;
mod fetch;
mod server;

pub use client::{PluginClient, RemoteFunction};
pub use fetch::{FetchEndpoint, FetchGuard, FetchHandler};
pub use server::{PluginServer, ServerHandle};

use crate::error::{Error, Result};
use crate::function::{CallContext, FunctionRegistry};
use crate::types::TypeDescriptor;
use crate::value::DynamicValue;
use crate::wire::{codec, WireFunction, WireValue};
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;

/// Capabilities reported by the serving side during Setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub protocol_version: u32,
    /// The server exposes registered functions.
    pub functions: bool,
    /// The server can use a caller-provided fetch endpoint.
    pub fetch: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Request {
    Setup {
        protocol_version: u32,
    },
    ListFunctions,
    ExecuteFunction {
        name: String,
        arguments: Vec<WireValue>,
        /// Address of the caller's transient fetch endpoint.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fetch: Option<String>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Response {
    Setup {
        capabilities: ServerCapabilities,
        #[serde(default)]
        diagnostics: Vec<Diagnostic>,
    },
    Functions {
        functions: Vec<WireFunction>,
    },
    Result {
        result: WireValue,
    },
    Error {
        message: String,
    },
}

/// Messages on the nested fetch channel, callee to caller.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FetchRequest {
    Fetch {
        resource_type: String,
        name: String,
        request: WireValue,
    },
    Function {
        name: String,
        arguments: Vec<WireValue>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FetchResponse {
    Value {
        value: WireValue,
        #[serde(default)]
        diagnostics: Vec<Diagnostic>,
    },
    Result {
        result: WireValue,
    },
    Error {
        message: String,
    },
}

/// Decode wire arguments by parameter type (fixed first, then the
/// variadic slot), dispatch to the registry, and hand back the result
/// with the return type computed from the actual argument types. Shared
/// between the main server and the nested fetch server's Function
/// operation.
pub(crate) fn invoke_registered(
    registry: &FunctionRegistry,
    ctx: &CallContext,
    name: &str,
    arguments: &[WireValue],
) -> Result<(DynamicValue, TypeDescriptor)> {
    let function = registry
        .get(name)
        .ok_or_else(|| Error::FunctionNotFound(name.to_string()))?;

    let mut args = Vec::with_capacity(arguments.len());
    for (index, wire) in arguments.iter().enumerate() {
        let parameter = function
            .parameter_for(index)
            .ok_or(Error::TooManyArguments {
                expected: function.parameters().len(),
                given: arguments.len(),
            })?;
        args.push(codec::decode(wire, &parameter.ty)?);
    }

    let result = function.call_with(ctx, &args)?;

    let arg_types: Vec<TypeDescriptor> = args.iter().map(|a| a.ty().clone()).collect();
    let return_type = function.return_type_for(&arg_types)?;
    Ok((result, return_type))
}

/// [`invoke_registered`], encoded by the computed return type.
pub(crate) fn execute_call(
    registry: &FunctionRegistry,
    ctx: &CallContext,
    name: &str,
    arguments: &[WireValue],
) -> Result<WireValue> {
    let (result, return_type) = invoke_registered(registry, ctx, name, arguments)?;
    codec::encode(&result, &return_type)
}
