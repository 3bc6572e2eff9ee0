//! Device identity, grouping, and connection attributes.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use secrecy::SecretString;
use serde_json::Value;

/// Connection attributes for reaching a device.
///
/// The engine never interprets these beyond handing them to the injected
/// transport; they are opaque dial parameters.
pub struct ConnectionOptions {
    /// Target host (hostname or IP address).
    pub host: String,

    /// Transport port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password, if password authentication is used.
    pub password: Option<SecretString>,

    /// Platform name (e.g., "cisco_ios", "juniper_junos").
    ///
    /// Forwarded to the structured-output parser so it can pick the right
    /// grammar for this device family.
    pub platform: String,
}

impl ConnectionOptions {
    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("platform", &self.platform)
            .finish()
    }
}

/// A managed network element addressed by name.
///
/// Devices are constructed once at inventory load and immutable afterward.
/// Task outputs never land here; they flow through the per-device scope the
/// dispatcher passes to each task and into the result store.
#[derive(Debug)]
pub struct Device {
    /// Unique device name.
    pub name: String,

    /// Group memberships, in declaration order.
    pub groups: IndexSet<String>,

    /// Connection attributes.
    pub connection: ConnectionOptions,

    /// Attribute bag seeded at load: task inputs (e.g. `ntp_server`) and
    /// expected-state values, with group defaults already merged in.
    data: IndexMap<String, Value>,
}

impl Device {
    /// Create a device with an already-merged attribute bag.
    pub(crate) fn new(
        name: impl Into<String>,
        groups: IndexSet<String>,
        connection: ConnectionOptions,
        data: IndexMap<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            groups,
            connection,
            data,
        }
    }

    /// Check membership in a group.
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    /// Look up an attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The full attribute bag, in merge order.
    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.data
    }
}
