//! Structured-output parser contract.
//!
//! Text-to-structure grammars live outside this crate (TextFSM templates,
//! vendor RPC decoders, ...). The engine only depends on the return shape:
//! a sequence of field-name -> value records per command output.

use crate::error::ParseError;
use crate::task::Record;

/// Maps (platform, command, raw text) to structured records.
///
/// Implementations must be deterministic and side-effect free; the
/// dispatcher calls them from concurrent device workers.
pub trait OutputParser: Send + Sync {
    /// Parse one command's raw output.
    ///
    /// Returns [`ParseError::NoMatch`] (with the raw text preserved) when
    /// the output does not fit the grammar for this platform/command pair.
    fn parse(&self, platform: &str, command: &str, raw: &str) -> Result<Vec<Record>, ParseError>;
}
