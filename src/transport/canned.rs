//! Canned transport with scripted responses.
//!
//! Useful for dry runs, demos, and as a stand-in device fleet in tests:
//! responses are keyed by (device name, rendered command).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use super::{Session, Transport};
use crate::error::TransportError;
use crate::inventory::Device;

/// Transport answering from a scripted response table.
#[derive(Debug, Default)]
pub struct CannedTransport {
    responses: HashMap<String, Arc<HashMap<String, String>>>,
    unreachable: HashSet<String>,
}

impl CannedTransport {
    /// Create an empty transport; every connection attempt will fail until
    /// responses are scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output `device` returns for `command`.
    pub fn respond(
        mut self,
        device: impl Into<String>,
        command: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        let entry = self.responses.entry(device.into()).or_default();
        Arc::make_mut(entry).insert(command.into(), output.into());
        self
    }

    /// Mark `device` as unreachable: connecting to it fails.
    pub fn unreachable(mut self, device: impl Into<String>) -> Self {
        self.unreachable.insert(device.into());
        self
    }
}

#[async_trait]
impl Transport for CannedTransport {
    async fn connect(&self, device: &Device) -> Result<Box<dyn Session>, TransportError> {
        if self.unreachable.contains(&device.name) {
            return Err(TransportError::ConnectionFailed {
                host: device.connection.host.clone(),
                port: device.connection.port,
                message: "no route to host".to_string(),
            });
        }

        let responses = self
            .responses
            .get(&device.name)
            .cloned()
            .ok_or_else(|| TransportError::ConnectionFailed {
                host: device.connection.host.clone(),
                port: device.connection.port,
                message: "connection refused".to_string(),
            })?;

        Ok(Box::new(CannedSession { responses }))
    }
}

struct CannedSession {
    responses: Arc<HashMap<String, String>>,
}

#[async_trait]
impl Session for CannedSession {
    async fn send_command(&mut self, command: &str) -> Result<String, TransportError> {
        self.responses
            .get(command)
            .cloned()
            .ok_or_else(|| TransportError::CommandFailed {
                message: format!("no scripted response for '{command}'"),
            })
    }
}
