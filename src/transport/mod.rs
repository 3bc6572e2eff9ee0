//! Transport contract for reaching devices.
//!
//! Connection handling (SSH, NETCONF, console servers, ...) lives outside
//! this crate. The engine dials through an injected [`Transport`] and talks
//! through the [`Session`] it returns; both are object-safe so fakes can
//! stand in during tests.

mod canned;

pub use canned::CannedTransport;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::inventory::Device;

/// Dials a device and hands back an interactive session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect and authenticate to `device`.
    async fn connect(&self, device: &Device) -> Result<Box<dyn Session>, TransportError>;
}

/// An established connection to one device.
#[async_trait]
pub trait Session: Send {
    /// Send one command and return its raw output.
    async fn send_command(&mut self, command: &str) -> Result<String, TransportError>;

    /// Tear the connection down. Best-effort; the dispatcher ignores errors.
    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
