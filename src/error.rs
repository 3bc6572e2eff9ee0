//! Error types for fleetrun.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for fleetrun operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Inventory or operation configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Device selection errors
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Transport-level errors (connection, command delivery)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Structured-output parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Command template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Result store lookup errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Inventory and operation configuration errors.
///
/// These are fatal: they surface before any device is touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Two devices in the source share a name
    #[error("Duplicate device name '{name}' in inventory source")]
    DuplicateDevice { name: String },

    /// A device references a group the source never declares
    #[error("Device '{device}' references undefined group '{group}'")]
    UndefinedGroup { device: String, group: String },

    /// A group is declared more than once
    #[error("Duplicate group '{name}' in inventory source")]
    DuplicateGroup { name: String },

    /// The inventory source failed basic validation
    #[error("Invalid inventory source: {message}")]
    InvalidSource { message: String },

    /// No operation registered under this name
    #[error("Unknown operation '{name}'")]
    UnknownOperation { name: String },

    /// An operation with this name is already registered
    #[error("Operation '{name}' already registered")]
    OperationAlreadyRegistered { name: String },
}

/// Device selection errors.
#[derive(Error, Debug)]
pub enum FilterError {
    /// Predicate references a group the inventory does not define.
    ///
    /// An empty match is not an error; naming a group that cannot exist is.
    #[error("Predicate references unknown group '{group}'")]
    UnknownGroup { group: String },
}

/// Transport layer errors (connection, authentication, command delivery).
///
/// Recorded per device by the dispatcher; they never abort other devices.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {message}")]
    ConnectionFailed {
        host: String,
        port: u16,
        message: String,
    },

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// The device rejected or could not execute the command
    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    /// Operation timed out (per-device deadline expired)
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Structured-output parsing errors.
///
/// The raw device output is retained for diagnostics.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Raw output did not match the expected grammar
    #[error("Output of '{command}' on platform '{platform}' did not match the expected shape")]
    NoMatch {
        platform: String,
        command: String,
        /// Unparsed device output, kept verbatim.
        raw: String,
    },

    /// The parser's grammar itself is invalid
    #[error("Invalid parser template: {message}")]
    Template { message: String },
}

/// Command template rendering errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// A placeholder resolved to nothing on this device
    #[error("Placeholder '{{{placeholder}}}' not resolvable on device '{device}'")]
    UnresolvedPlaceholder { placeholder: String, device: String },

    /// A placeholder resolved to a value with no command-line form
    #[error("Placeholder '{{{placeholder}}}' on device '{device}' is not a scalar value")]
    UnrenderableValue { placeholder: String, device: String },

    /// An opening brace was never closed
    #[error("Unclosed placeholder in template '{template}'")]
    UnclosedPlaceholder { template: String },
}

/// Result store lookup errors.
///
/// A missing key is always surfaced, never defaulted to empty, so a consumer
/// cannot mistake "task never ran" for "task produced nothing".
#[derive(Error, Debug)]
pub enum StoreError {
    /// No results recorded for this device at all
    #[error("No results for device '{device}'")]
    DeviceNotFound { device: String },

    /// The device has results, but not under this key
    #[error("No result under key '{key}' for device '{device}'")]
    KeyNotFound { device: String, key: String },
}

/// Result type alias using fleetrun's Error.
pub type Result<T> = std::result::Result<T, Error>;
