//! Configuration-time error definitions.
//!
//! Request-time outcomes (unknown path, unknown method, unregistered
//! action) are HTTP statuses written by the dispatcher, never values of
//! this type. Everything here surfaces to the integrator while the
//! resource tree is being assembled.

use thiserror::Error;

use crate::host::HostName;
use crate::resource::ResourceName;

/// Errors raised while assembling or configuring the resource tree.
#[derive(Debug, Error)]
pub enum Error {
    /// A non-instanced resource with this name is already registered in
    /// the target collection.
    #[error("resource '{0}' already exists")]
    ResourceExists(ResourceName),

    /// An instanced child resource with this name is already registered
    /// under the parent.
    #[error("child resource '{0}' already exists")]
    ChildResourceExists(ResourceName),

    /// A host with this name is already registered on the server.
    #[error("host '{0}' already exists")]
    HostExists(HostName),

    /// The supplied identifier pattern failed to compile; the previous
    /// matcher stays installed.
    #[error("invalid identifier pattern: {0}")]
    InvalidIdPattern(#[from] regex::Error),

    /// No identifier was extracted for this resource on the current
    /// request.
    #[error("no identifier found for resource '{0}'")]
    IdentifierNotFound(ResourceName),

    /// Configuration file could not be read.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
