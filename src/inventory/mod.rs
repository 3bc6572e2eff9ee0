//! Device inventory: a static registry of devices tagged by group.
//!
//! The inventory is loaded once from a serde-deserializable source and is
//! read-only afterward. The exact file syntax (YAML, JSON, ...) is the
//! caller's business; the engine only requires the record shapes below.

mod device;

pub use device::{ConnectionOptions, Device};

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;

/// One device entry in an inventory source.
#[derive(Debug, Deserialize)]
pub struct DeviceRecord {
    /// Unique device name.
    pub name: String,

    /// Groups this device belongs to. Every name must be declared in
    /// [`InventorySource::groups`].
    #[serde(default)]
    pub groups: Vec<String>,

    /// Hostname or IP address to dial.
    pub host: String,

    /// Transport port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password, if password authentication is used.
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Platform name, forwarded to the structured-output parser.
    pub platform: String,

    /// Per-device attribute bag (task inputs, expected state).
    #[serde(default)]
    pub data: IndexMap<String, Value>,
}

/// One group declaration in an inventory source.
#[derive(Debug, Deserialize)]
pub struct GroupRecord {
    /// Group name.
    pub name: String,

    /// Defaults merged into member devices' attribute bags.
    #[serde(default)]
    pub data: IndexMap<String, Value>,
}

/// Deserialized inventory source: group declarations plus device records.
#[derive(Debug, Default, Deserialize)]
pub struct InventorySource {
    #[serde(default)]
    pub groups: Vec<GroupRecord>,

    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

fn default_port() -> u16 {
    22
}

/// Static registry of devices, unique by name.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    devices: IndexMap<String, Arc<Device>>,
    groups: IndexSet<String>,
}

impl Inventory {
    /// Load and validate an inventory from a deserialized source.
    ///
    /// Fails if a device or group name repeats, or if a device references a
    /// group the source never declares. Group data is merged into each
    /// member's attribute bag: the device's own values win, then groups in
    /// the device's declaration order.
    pub fn load(source: InventorySource) -> Result<Self, ConfigError> {
        let mut group_data: IndexMap<String, IndexMap<String, Value>> = IndexMap::new();
        for group in source.groups {
            if group_data.contains_key(&group.name) {
                return Err(ConfigError::DuplicateGroup { name: group.name });
            }
            group_data.insert(group.name, group.data);
        }

        let mut devices: IndexMap<String, Arc<Device>> = IndexMap::new();
        for record in source.devices {
            if record.name.is_empty() {
                return Err(ConfigError::InvalidSource {
                    message: "device with empty name".to_string(),
                });
            }
            if devices.contains_key(&record.name) {
                return Err(ConfigError::DuplicateDevice { name: record.name });
            }

            let mut data = record.data;
            let mut groups = IndexSet::new();
            for group in &record.groups {
                let defaults =
                    group_data
                        .get(group)
                        .ok_or_else(|| ConfigError::UndefinedGroup {
                            device: record.name.clone(),
                            group: group.clone(),
                        })?;
                for (key, value) in defaults {
                    if !data.contains_key(key) {
                        data.insert(key.clone(), value.clone());
                    }
                }
                groups.insert(group.clone());
            }

            let connection = ConnectionOptions {
                host: record.host,
                port: record.port,
                username: record.username,
                password: record.password,
                platform: record.platform,
            };

            let device = Device::new(record.name.clone(), groups, connection, data);
            devices.insert(record.name, Arc::new(device));
        }

        Ok(Self {
            devices,
            groups: group_data.into_keys().collect(),
        })
    }

    /// All devices, in source order.
    pub fn all_devices(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.values()
    }

    /// Look up a device by name.
    pub fn get(&self, name: &str) -> Option<&Arc<Device>> {
        self.devices.get(name)
    }

    /// Check whether a group is declared in this inventory.
    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains(name)
    }

    /// All declared group names.
    pub fn groups(&self) -> impl Iterator<Item = &String> {
        self.groups.iter()
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// True if the inventory holds no devices.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
