//! Error types for the Fury engine
//!
//! Two families of failures flow through the engine:
//! - configuration errors (malformed descriptor, unresolved pass input),
//!   which abort `RenderPipeline::load` before any frame executes
//! - resource errors (allocation failure, invalid shape, missing program),
//!   which degrade a single pass while the frame carries on

use std::fmt;

/// Result type for Fury engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fury engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (device, command recording, lock poisoning)
    BackendError(String),

    /// Out of GPU memory (device failure or pool budget exceeded)
    OutOfMemory,

    /// Invalid resource (stale handle, double release, unknown key)
    InvalidResource(String),

    /// Resource shape that cannot be allocated (zero extent, bad layer count)
    InvalidShape(String),

    /// Shader program not found in the program registry
    MissingProgram(String),

    /// Malformed pipeline or engine configuration
    ConfigurationError(String),

    /// A pass input or output references a name nothing provides
    UnresolvedName {
        /// Pass declaring the binding
        pass: String,
        /// The name that could not be resolved
        name: String,
    },
}

impl Error {
    /// Errors that are fatal to pipeline startup
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::ConfigurationError(_) | Error::UnresolvedName { .. })
    }

    /// Errors recovered locally by degrading a single pass
    pub fn is_resource(&self) -> bool {
        !self.is_configuration()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InvalidShape(msg) => write!(f, "Invalid resource shape: {}", msg),
            Error::MissingProgram(name) => write!(f, "Missing program: '{}'", name),
            Error::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            Error::UnresolvedName { pass, name } => {
                write!(f, "Configuration error: pass '{}' references unresolved name '{}'", pass, name)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
