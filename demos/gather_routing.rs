//! Gather Routing State Demo
//!
//! Runs the "gather routing state" operation against a canned two-router
//! fleet: OSPF and BGP state is collected from the ios router, parsed with
//! textfsm-rust templates, and counted the way a verification layer would.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example gather_routing
//! ```
//!
//! With debug logging:
//!
//! ```bash
//! RUST_LOG=debug cargo run --example gather_routing
//! ```

use std::sync::Arc;

use fleetrun::error::ParseError;
use fleetrun::{
    AggregateRunner, CannedTransport, Inventory, InventorySource, Operation, OutputParser,
    Predicate, Record, TaskSpec,
};
use textfsm_rust::Template;

const OSPF_TEMPLATE: &str = "\
Value neighbor_id (\\S+)
Value priority (\\d+)
Value state (\\S+)
Value dead_time (\\S+)
Value address (\\S+)
Value interface (\\S+)

Start
  ^${neighbor_id}\\s+${priority}\\s+${state}\\s+${dead_time}\\s+${address}\\s+${interface}\\s*$$ -> Record
";

const BGP_TEMPLATE: &str = "\
Value neighbor (\\d+\\.\\d+\\.\\d+\\.\\d+)
Value version (\\d+)
Value remote_as (\\d+)
Value msg_rcvd (\\d+)
Value msg_sent (\\d+)
Value tbl_ver (\\d+)
Value in_q (\\d+)
Value out_q (\\d+)
Value up_down (\\S+)
Value state_pfxrcd (\\S+)

Start
  ^${neighbor}\\s+${version}\\s+${remote_as}\\s+${msg_rcvd}\\s+${msg_sent}\\s+${tbl_ver}\\s+${in_q}\\s+${out_q}\\s+${up_down}\\s+${state_pfxrcd}\\s*$$ -> Record
";

const OSPF_OUTPUT: &str = "\
Neighbor ID     Pri   State           Dead Time   Address         Interface
10.255.0.2        1   FULL/DR         00:00:31    192.0.2.2       GigabitEthernet0/1
10.255.0.3        1   FULL/BDR        00:00:36    192.0.2.3       GigabitEthernet0/2
";

const BGP_OUTPUT: &str = "\
Neighbor        V           AS MsgRcvd MsgSent   TblVer  InQ OutQ Up/Down  State/PfxRcd
192.0.2.2       4        65002    4321    4299       12    0    0 5d02h          42
192.0.2.3       4        65003       9      11        1    0    0 00:01:22 Active
";

/// Parser adapter mapping (command) -> TextFSM template.
struct TextFsmParser;

impl OutputParser for TextFsmParser {
    fn parse(&self, platform: &str, command: &str, raw: &str) -> Result<Vec<Record>, ParseError> {
        let template_str = match command {
            "show ip ospf neighbor" => OSPF_TEMPLATE,
            "show ip bgp summary" => BGP_TEMPLATE,
            _ => {
                return Err(ParseError::Template {
                    message: format!("no template for '{command}' on '{platform}'"),
                })
            }
        };

        let template = Template::parse_str(template_str).map_err(|e| ParseError::Template {
            message: e.to_string(),
        })?;
        let mut parser = template.parser();
        let rows = parser
            .parse_text_to_dicts(raw)
            .map_err(|_| ParseError::NoMatch {
                platform: platform.to_string(),
                command: command.to_string(),
                raw: raw.to_string(),
            })?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().collect::<Record>())
            .collect())
    }
}

fn inventory() -> Result<Inventory, Box<dyn std::error::Error>> {
    let source: InventorySource = serde_json::from_str(
        r#"{
            "groups": [{"name": "ios"}, {"name": "junos"}],
            "devices": [
                {
                    "name": "r1", "groups": ["ios"], "host": "192.0.2.11",
                    "username": "admin", "password": "secret", "platform": "cisco_ios",
                    "data": {"expected_ospf_neighbours": 2}
                },
                {
                    "name": "r2", "groups": ["junos"], "host": "192.0.2.12",
                    "username": "admin", "password": "secret", "platform": "juniper_junos"
                }
            ]
        }"#,
    )?;
    Ok(Inventory::load(source)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Fleetrun Routing State Demo ===\n");

    let transport = CannedTransport::new()
        .respond("r1", "show ip ospf neighbor", OSPF_OUTPUT)
        .respond("r1", "show ip bgp summary", BGP_OUTPUT);

    let mut runner = AggregateRunner::new(inventory()?, Arc::new(transport), Arc::new(TextFsmParser));
    runner.register(
        Operation::new("gather routing state", Predicate::group("ios"))
            .with_task(TaskSpec::structured("ospf_output", "show ip ospf neighbor"))
            .with_task(TaskSpec::structured("bgp_output", "show ip bgp summary")),
    )?;

    let outcome = runner.run("gather routing state").await?;

    println!("{}\n", outcome.report);

    for device in outcome.store.devices() {
        let ospf = outcome.store.get(&device, "ospf_output")?;
        let full = ospf.count_where("state", |s| s.contains("FULL"));
        println!("{device}: {full} OSPF neighbour(s) in FULL state");

        // An established peer shows a prefix count in the state column;
        // Idle, Active, and Connect all mean the session is down.
        let bgp = outcome.store.get(&device, "bgp_output")?;
        let established = bgp.count_where("state_pfxrcd", |s| {
            !s.contains("Idle") && !s.contains("Active") && !s.contains("Connect")
        });
        println!("{device}: {established} BGP peer(s) established");
    }

    Ok(())
}
