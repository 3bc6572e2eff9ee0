//! Top-level entry point composing filter, dispatch, and storage.
//!
//! An [`AggregateRunner`] is built once from an explicit inventory and the
//! injected transport/parser pair; named [`Operation`]s are registered on it
//! and run on demand. There is no ambient global instance: everything a run
//! needs is owned by the runner it was registered on.

use std::sync::Arc;

use indexmap::IndexMap;
use log::info;

use crate::dispatch::{DispatchOptions, Dispatcher, RunReport};
use crate::error::{ConfigError, Result};
use crate::filter::{self, Predicate};
use crate::inventory::Inventory;
use crate::parser::OutputParser;
use crate::store::ResultStore;
use crate::task::TaskSpec;
use crate::transport::Transport;

/// A named operation: a device predicate plus an ordered task list.
///
/// ```
/// use fleetrun::{Operation, Predicate, TaskSpec};
///
/// let op = Operation::new("gather routing state", Predicate::group("ios"))
///     .with_task(TaskSpec::structured("ospf_output", "show ip ospf neighbor"))
///     .with_task(TaskSpec::structured("bgp_output", "show ip bgp summary"));
/// ```
#[derive(Debug, Clone)]
pub struct Operation {
    name: String,
    predicate: Predicate,
    tasks: Vec<TaskSpec>,
}

impl Operation {
    /// Create an operation targeting the devices matching `predicate`.
    pub fn new(name: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            predicate,
            tasks: Vec::new(),
        }
    }

    /// Append a task; tasks run per device in the order appended.
    pub fn with_task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }

    /// The operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The device predicate.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// The ordered task list.
    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }
}

/// What one [`AggregateRunner::run`] call produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Per-device, per-task statuses for this run.
    pub report: RunReport,

    /// The runner's store, populated with this run's results. Shared across
    /// runs, so results persist for the runner's lifetime.
    pub store: Arc<ResultStore>,
}

/// Composes filter, dispatcher, and result store for named operations.
///
/// The sole entry point exposed to external consumers: verification code
/// runs an operation by name and reads the store afterwards.
pub struct AggregateRunner {
    inventory: Inventory,
    dispatcher: Dispatcher,
    store: Arc<ResultStore>,
    operations: IndexMap<String, Operation>,
}

impl AggregateRunner {
    /// Create a runner over an explicit inventory and injected collaborators.
    pub fn new(
        inventory: Inventory,
        transport: Arc<dyn Transport>,
        parser: Arc<dyn OutputParser>,
    ) -> Self {
        Self {
            inventory,
            dispatcher: Dispatcher::new(transport, parser),
            store: Arc::new(ResultStore::new()),
            operations: IndexMap::new(),
        }
    }

    /// Replace the default dispatch options.
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.dispatcher = self.dispatcher.with_options(options);
        self
    }

    /// Register a named operation.
    pub fn register(&mut self, operation: Operation) -> Result<()> {
        if self.operations.contains_key(operation.name()) {
            return Err(ConfigError::OperationAlreadyRegistered {
                name: operation.name().to_string(),
            }
            .into());
        }
        self.operations
            .insert(operation.name().to_string(), operation);
        Ok(())
    }

    /// The inventory this runner was built over.
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// The runner's result store.
    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    /// Run a registered operation by name.
    ///
    /// Fatal problems (unknown operation, predicate naming an undefined
    /// group) return `Err` before any device is touched. Per-device
    /// transport and parse failures never surface here; they are captured
    /// in the returned report.
    pub async fn run(&self, operation: &str) -> Result<RunOutcome> {
        let op = self
            .operations
            .get(operation)
            .ok_or_else(|| ConfigError::UnknownOperation {
                name: operation.to_string(),
            })?;

        let device_set = filter::select(&self.inventory, op.predicate())?;
        info!(
            "operation '{}': {} device(s) selected, {} task(s)",
            op.name(),
            device_set.len(),
            op.tasks().len()
        );

        let report = self
            .dispatcher
            .run(&device_set, op.tasks(), &self.store)
            .await;

        info!(
            "operation '{}': {} ok, {} failed",
            op.name(),
            report.ok_count(),
            report.failed_count()
        );

        Ok(RunOutcome {
            report,
            store: Arc::clone(&self.store),
        })
    }
}
