//! # Fleetrun
//!
//! Async task execution and result aggregation engine for network device
//! fleets.
//!
//! Fleetrun holds an inventory of devices tagged by group, selects subsets
//! with boolean predicates, and dispatches ordered command lists against the
//! selection concurrently, one worker per device. Raw output is handed to an
//! injected structured-output parser and every completed result lands in a
//! per-device, task-keyed store that consumers (verification code, further
//! automation) read after the run.
//!
//! ## Features
//!
//! - Inventory with group tags and per-device attribute bags
//! - Predicate filtering with `and`/`or`/`not` composition
//! - Concurrent per-device dispatch with a configurable cap and deadline
//! - Per-device failure isolation: one dead router never hides the rest
//! - Injected transport and parser, substitutable with fakes for testing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fleetrun::{
//!     AggregateRunner, CannedTransport, Inventory, InventorySource, Operation,
//!     OutputParser, Predicate, Record, TaskSpec,
//! };
//! use fleetrun::error::ParseError;
//!
//! // Any (platform, command, raw text) -> records mapper will do; real
//! // deployments adapt a TextFSM template set here.
//! struct MyParser;
//!
//! impl OutputParser for MyParser {
//!     fn parse(&self, _: &str, _: &str, raw: &str) -> Result<Vec<Record>, ParseError> {
//!         Ok(raw
//!             .lines()
//!             .map(|l| Record::from_iter([("line".to_string(), l.to_string())]))
//!             .collect())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source: InventorySource = serde_json::from_str(
//!         r#"{
//!             "groups": [{"name": "ios"}],
//!             "devices": [{
//!                 "name": "r1", "groups": ["ios"], "host": "192.0.2.11",
//!                 "username": "admin", "platform": "cisco_ios"
//!             }]
//!         }"#,
//!     )?;
//!     let inventory = Inventory::load(source)?;
//!
//!     let transport = Arc::new(
//!         CannedTransport::new().respond("r1", "show ip ospf neighbor", "..."),
//!     );
//!
//!     let mut runner = AggregateRunner::new(inventory, transport, Arc::new(MyParser));
//!     runner.register(
//!         Operation::new("gather routing state", Predicate::group("ios"))
//!             .with_task(TaskSpec::structured("ospf_output", "show ip ospf neighbor")),
//!     )?;
//!
//!     let outcome = runner.run("gather routing state").await?;
//!     println!("{}", outcome.report);
//!
//!     let ospf = outcome.store.get("r1", "ospf_output")?;
//!     println!("{} neighbours", ospf.records().map_or(0, |r| r.len()));
//!     Ok(())
//! }
//! ```

pub mod dispatch;
pub mod error;
pub mod filter;
pub mod inventory;
pub mod parser;
pub mod runner;
pub mod store;
pub mod task;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types for convenience
pub use dispatch::{
    DeviceReport, DispatchOptions, Dispatcher, FailureKind, RunReport, TaskOutcome, TaskStatus,
};
pub use error::Error;
pub use filter::{select, DeviceSet, Predicate};
pub use inventory::{
    ConnectionOptions, Device, DeviceRecord, GroupRecord, Inventory, InventorySource,
};
pub use parser::OutputParser;
pub use runner::{AggregateRunner, Operation, RunOutcome};
pub use store::ResultStore;
pub use task::{ParseMode, Record, TaskContext, TaskResult, TaskSpec};
pub use transport::{CannedTransport, Session, Transport};
