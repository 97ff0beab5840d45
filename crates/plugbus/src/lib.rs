// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # plugbus - typed value exchange for policy-engine plugins
//!
//! plugbus moves richly-typed dynamic values and native function calls
//! across a process boundary. A host process and a plugin process each
//! hold a [`FunctionRegistry`]; the bridge exposes one side's registry
//! to the other over a connected transport, packing arguments and
//! results through a lossless, type-directed codec.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use plugbus::{FunctionRegistry, PluginServer, Result};
//!
//! fn main() -> Result<()> {
//!     let registry = Arc::new(FunctionRegistry::new());
//!     registry.register_native("concat", |a: String, b: String| {
//!         Ok::<_, std::convert::Infallible>(a + &b)
//!     })?;
//!
//!     let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
//!     PluginServer::new(registry).serve(listener)
//! }
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DynamicValue`] | Runtime-typed value: payload or null or unknown, plus marks |
//! | [`TypeDescriptor`] | Closed structural tag describing a value's shape |
//! | [`Plug`] | Native types that can cross the boundary (derivable) |
//! | [`FunctionRegistry`] | Name-to-function table served over the bridge |
//! | [`PluginServer`] / [`PluginClient`] | The two ends of the bridge |
//!
//! ## Modules Overview
//!
//! - [`value`] - dynamic values, exact decimal numbers, taint marks
//! - [`types`] - structural type descriptors
//! - [`wire`] - wire schema and the encode/decode codec
//! - [`native`] - native type mapping and the [`Plug`] trait
//! - [`function`] - signatures, call policy, the registry
//! - [`bridge`] - framed transport, server, client, fetch side channel
//!
//! Process launch, handshake, and transport security live in the host;
//! plugbus starts from an already-connected socket.

/// Remote function bridge (server, client, fetch side channel).
pub mod bridge;
/// Protocol constants and bridge configuration.
pub mod config;
/// Diagnostics carried, never interpreted.
pub mod diagnostics;
/// Error taxonomy.
pub mod error;
/// Callable functions and the registry.
pub mod function;
/// Native type and value mapping.
pub mod native;
/// Error attribution paths.
pub mod path;
/// Structural type descriptors.
pub mod types;
/// Dynamic values, numbers, and marks.
pub mod value;
/// Wire schema and codec.
pub mod wire;

pub use bridge::{
    FetchHandler, PluginClient, PluginServer, RemoteFunction, ServerCapabilities, ServerHandle,
};
pub use config::BridgeConfig;
pub use diagnostics::{Diagnostic, Severity};
pub use error::{Error, Result};
pub use function::{
    CallContext, Fetcher, Function, FunctionRegistry, IntoFunction, IntoVariadicFunction,
    Parameter, ReturnType,
};
pub use native::{native_type_to_descriptor, NativeField, NativeType, Plug};
pub use path::{Path, PathStep};
pub use types::TypeDescriptor;
pub use value::{DynamicValue, MarkSet, Number, SENSITIVE};
pub use wire::codec::{decode, encode};
pub use wire::{WireType, WireValue};

// Derive macro for exchanging user structs.
pub use plugbus_codegen::Plug;

// Allow the derive macro's `plugbus::` paths to resolve inside this
// crate's own tests.
extern crate self as plugbus;
