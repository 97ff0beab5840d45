// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types.
//!
//! Configuration-time errors (`UnsupportedType`, `Configuration`) are
//! fatal and abort host startup. Everything else is scoped to a single
//! call and returned to its caller.

use crate::path::Path;
use std::fmt;
use std::io;

/// Result type for plugbus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the codec, the registry, and the bridge.
#[derive(Debug)]
pub enum Error {
    /// A native type has no descriptor mapping. Raised at registration,
    /// never at call time.
    UnsupportedType { path: Path, reason: String },

    /// Invalid host configuration (duplicate function name, malformed
    /// callable shape). Fatal at startup.
    Configuration(String),

    /// A value did not match the expected descriptor during decode.
    Conversion { path: Path, detail: String },

    /// Call names a function that was never registered.
    FunctionNotFound(String),

    /// More arguments than fixed parameters and no variadic parameter.
    TooManyArguments { expected: usize, given: usize },

    /// The native callable itself failed; its message is forwarded
    /// verbatim.
    Call(String),

    /// Transport failure on the bridge.
    Io(io::Error),

    /// Malformed frame or message on the bridge.
    Protocol(String),
}

impl Error {
    /// Conversion error at `path`.
    pub fn conversion(path: &Path, detail: impl Into<String>) -> Self {
        Self::Conversion {
            path: path.clone(),
            detail: detail.into(),
        }
    }

    /// Unsupported native type at `path`.
    pub fn unsupported(path: &Path, reason: impl Into<String>) -> Self {
        Self::UnsupportedType {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// True for errors that must abort host startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedType { .. } | Self::Configuration(_))
    }
}

fn write_at(f: &mut fmt::Formatter<'_>, path: &Path) -> fmt::Result {
    if path.is_empty() {
        Ok(())
    } else {
        write!(f, " at {}", path)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedType { path, reason } => {
                write!(f, "unsupported type: {}", reason)?;
                write_at(f, path)
            }
            Self::Configuration(msg) => write!(f, "configuration error: {}", msg),
            Self::Conversion { path, detail } => {
                write!(f, "conversion error: {}", detail)?;
                write_at(f, path)
            }
            Self::FunctionNotFound(name) => write!(f, "function {:?} not found", name),
            Self::TooManyArguments { expected, given } => write!(
                f,
                "too many arguments: function accepts at most {}, got {}",
                expected, given
            ),
            Self::Call(msg) => write!(f, "call failed: {}", msg),
            Self::Io(e) => write!(f, "transport error: {}", e),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}
