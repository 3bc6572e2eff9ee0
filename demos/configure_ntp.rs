//! Configure NTP Demo
//!
//! Pushes a parameterized NTP server line to every ios device and reads the
//! config back in the same run: the second task verifies what the first one
//! wrote. The server address comes from each device's attribute bag.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example configure_ntp
//! ```

use std::sync::Arc;

use fleetrun::error::ParseError;
use fleetrun::{
    AggregateRunner, CannedTransport, Inventory, InventorySource, Operation, OutputParser,
    Predicate, Record, TaskSpec,
};

/// This demo only runs raw tasks; structured mode has no grammar here.
struct NoGrammar;

impl OutputParser for NoGrammar {
    fn parse(&self, platform: &str, command: &str, _raw: &str) -> Result<Vec<Record>, ParseError> {
        Err(ParseError::Template {
            message: format!("no grammar for '{command}' on '{platform}'"),
        })
    }
}

fn inventory() -> Result<Inventory, Box<dyn std::error::Error>> {
    let source: InventorySource = serde_json::from_str(
        r#"{
            "groups": [{"name": "ios", "data": {"ntp_server": "10.0.0.50"}}],
            "devices": [
                {
                    "name": "r1", "groups": ["ios"], "host": "192.0.2.11",
                    "username": "admin", "password": "secret", "platform": "cisco_ios"
                },
                {
                    "name": "r2", "groups": ["ios"], "host": "192.0.2.12",
                    "username": "admin", "password": "secret", "platform": "cisco_ios",
                    "data": {"ntp_server": "10.0.0.51"}
                }
            ]
        }"#,
    )?;
    Ok(Inventory::load(source)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Fleetrun NTP Configuration Demo ===\n");

    // r1 inherits the group default; r2 overrides it.
    let transport = CannedTransport::new()
        .respond("r1", "ntp server 10.0.0.50", "")
        .respond("r1", "show run | inc ntp server", "ntp server 10.0.0.50\n")
        .respond("r2", "ntp server 10.0.0.51", "")
        .respond("r2", "show run | inc ntp server", "ntp server 10.0.0.51\n");

    let mut runner = AggregateRunner::new(inventory()?, Arc::new(transport), Arc::new(NoGrammar));
    runner.register(
        Operation::new("configure ntp", Predicate::group("ios"))
            .with_task(TaskSpec::raw("ntp_config", "ntp server {ntp_server}"))
            .with_task(TaskSpec::raw("ntp_check", "show run | inc ntp server")),
    )?;

    let outcome = runner.run("configure ntp").await?;
    println!("{}\n", outcome.report);

    for device in ["r1", "r2"] {
        let check = outcome.store.get(device, "ntp_check")?;
        print!("{device} running config: {}", check.raw().unwrap_or(""));
    }

    Ok(())
}
