//! Shared fixtures for unit tests.

use std::time::Duration;

use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use serde_json::{json, Value};

use crate::error::{ParseError, TransportError};
use crate::inventory::{ConnectionOptions, Device, DeviceRecord, GroupRecord, Inventory, InventorySource};
use crate::parser::OutputParser;
use crate::task::Record;
use crate::transport::{CannedTransport, Session, Transport};

/// Two OSPF neighbours, both FULL, in the line shape [`FieldParser`] reads.
pub const OSPF_NEIGHBORS_RAW: &str = "\
neighbor_id=10.255.0.2 state=FULL/DR address=192.0.2.2 interface=GigabitEthernet0/1
neighbor_id=10.255.0.3 state=FULL/BDR address=192.0.2.3 interface=GigabitEthernet0/2
";

/// Two BGP peers, one established (numeric prefix count) and one stuck in
/// Active.
pub const BGP_SUMMARY_RAW: &str = "\
neighbor=192.0.2.2 remote_as=65002 state_pfxrcd=42
neighbor=192.0.2.3 remote_as=65003 state_pfxrcd=Active
";

/// An inventory with one ios router (`r1`) and one junos router (`r2`).
pub fn two_router_inventory() -> Inventory {
    let source = InventorySource {
        groups: vec![
            GroupRecord {
                name: "ios".to_string(),
                data: IndexMap::new(),
            },
            GroupRecord {
                name: "junos".to_string(),
                data: IndexMap::new(),
            },
        ],
        devices: vec![
            DeviceRecord {
                name: "r1".to_string(),
                groups: vec!["ios".to_string()],
                host: "192.0.2.11".to_string(),
                port: 22,
                username: "admin".to_string(),
                password: None,
                platform: "cisco_ios".to_string(),
                data: IndexMap::from_iter([
                    ("ntp_server".to_string(), json!("10.0.0.50")),
                    ("expected_ospf_neighbours".to_string(), json!(2)),
                ]),
            },
            DeviceRecord {
                name: "r2".to_string(),
                groups: vec!["junos".to_string()],
                host: "192.0.2.12".to_string(),
                port: 22,
                username: "admin".to_string(),
                password: None,
                platform: "juniper_junos".to_string(),
                data: IndexMap::new(),
            },
        ],
    };

    Inventory::load(source).unwrap()
}

/// A standalone device with the given attribute bag.
pub fn device_with_data(name: &str, pairs: &[(&str, Value)]) -> Device {
    Device::new(
        name,
        IndexSet::from_iter(["ios".to_string()]),
        ConnectionOptions {
            host: format!("{name}.lab.example.net"),
            port: 22,
            username: "admin".to_string(),
            password: None,
            platform: "cisco_ios".to_string(),
        },
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

/// Fake structured parser: each non-empty output line is one record of
/// space-separated `field=value` pairs. Anything else is a parse mismatch,
/// which is exactly what real grammar misses look like to the engine.
pub struct FieldParser;

impl OutputParser for FieldParser {
    fn parse(&self, platform: &str, command: &str, raw: &str) -> Result<Vec<Record>, ParseError> {
        let mut records = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let mut record = Record::new();
            for pair in line.split_whitespace() {
                let (field, value) = pair.split_once('=').ok_or_else(|| ParseError::NoMatch {
                    platform: platform.to_string(),
                    command: command.to_string(),
                    raw: raw.to_string(),
                })?;
                record.insert(field.to_string(), value.to_string());
            }
            records.push(record);
        }
        Ok(records)
    }
}

/// Transport whose named device hangs forever on connect; everything else
/// passes through to the wrapped canned transport.
pub struct SlowTransport {
    inner: CannedTransport,
    stuck: String,
}

impl SlowTransport {
    pub fn new(inner: CannedTransport, stuck: impl Into<String>) -> Self {
        Self {
            inner,
            stuck: stuck.into(),
        }
    }
}

#[async_trait]
impl Transport for SlowTransport {
    async fn connect(&self, device: &Device) -> Result<Box<dyn Session>, TransportError> {
        if device.name == self.stuck {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.inner.connect(device).await
    }
}
