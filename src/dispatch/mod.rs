//! Concurrent task dispatch across a device set.
//!
//! One worker per device, capped by a semaphore; within a device, tasks run
//! in declared order so later tasks can read earlier tasks' stored results.
//! Failures are captured per device and never abort the rest of the fleet.

mod report;

pub use report::{DeviceReport, FailureKind, RunReport, TaskOutcome, TaskStatus};

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use log::{debug, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::TransportError;
use crate::filter::DeviceSet;
use crate::inventory::Device;
use crate::parser::OutputParser;
use crate::store::ResultStore;
use crate::task::{ParseMode, TaskContext, TaskResult, TaskSpec};
use crate::transport::Transport;

/// Tuning knobs for one dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Maximum number of devices worked on at once.
    pub max_concurrency: usize,

    /// Deadline applied to each transport call (connect and per command).
    ///
    /// On expiry the call is recorded as a transport failure for that device
    /// and the run proceeds; an unreachable device cannot stall the fleet.
    pub device_deadline: Option<Duration>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 20,
            device_deadline: None,
        }
    }
}

/// Runs ordered task lists across a device set, concurrently per device.
///
/// The dispatcher never retries: a failed task is recorded and the caller
/// decides whether to run again.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    parser: Arc<dyn OutputParser>,
    options: DispatchOptions,
}

impl Dispatcher {
    /// Create a dispatcher over the injected transport and parser.
    pub fn new(transport: Arc<dyn Transport>, parser: Arc<dyn OutputParser>) -> Self {
        Self {
            transport,
            parser,
            options: DispatchOptions::default(),
        }
    }

    /// Replace the default options.
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Run `tasks`, in order, against every device in `device_set`.
    ///
    /// Completed results land in `store` keyed by (device name, task key);
    /// only devices inside `device_set` are ever written. The returned
    /// report lists every targeted device with a status for every task.
    /// All workers are joined before this returns, so the store is safe to
    /// read afterwards.
    pub async fn run(
        &self,
        device_set: &DeviceSet,
        tasks: &[TaskSpec],
        store: &Arc<ResultStore>,
    ) -> RunReport {
        let tasks: Arc<[TaskSpec]> = Arc::from(tasks.to_vec());
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let mut workers = JoinSet::new();

        for device in device_set.iter() {
            let device = Arc::clone(device);
            let tasks = Arc::clone(&tasks);
            let transport = Arc::clone(&self.transport);
            let parser = Arc::clone(&self.parser);
            let store = Arc::clone(store);
            let semaphore = Arc::clone(&semaphore);
            let deadline = self.options.device_deadline;

            workers.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let name = device.name.clone();
                let report = run_device(device, tasks, transport, parser, store, deadline).await;
                (name, report)
            });
        }

        let mut finished: HashMap<String, DeviceReport> = HashMap::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((name, report)) => {
                    finished.insert(name, report);
                }
                Err(err) => warn!("device worker died: {err}"),
            }
        }

        // Reassemble in device-set order; a dead worker leaves a gap. The
        // store records exactly the writes that completed before the worker
        // died, so a task whose key landed is still done and only the rest
        // are worker failures.
        let mut devices = IndexMap::with_capacity(device_set.len());
        for device in device_set.iter() {
            let report = finished.remove(&device.name).unwrap_or_else(|| {
                DeviceReport::from_outcomes(
                    tasks
                        .iter()
                        .map(|spec| {
                            if store.has_key(&device.name, spec.key()) {
                                TaskOutcome::done(spec.key())
                            } else {
                                TaskOutcome::failed(
                                    spec.key(),
                                    FailureKind::Worker,
                                    "device worker died",
                                )
                            }
                        })
                        .collect(),
                )
            });
            devices.insert(device.name.clone(), report);
        }

        RunReport::new(devices)
    }
}

/// Run the full task list against one device.
///
/// A task failure is recorded and the remaining tasks still attempt; only a
/// failed connect fails everything, since there is no session to talk over.
async fn run_device(
    device: Arc<Device>,
    tasks: Arc<[TaskSpec]>,
    transport: Arc<dyn Transport>,
    parser: Arc<dyn OutputParser>,
    store: Arc<ResultStore>,
    deadline: Option<Duration>,
) -> DeviceReport {
    debug!(
        "{}: connecting to {}",
        device.name,
        device.connection.socket_addr()
    );

    let mut session = match with_deadline(deadline, transport.connect(&device)).await {
        Ok(session) => session,
        Err(err) => {
            warn!("{}: connect failed: {err}", device.name);
            return DeviceReport::all_failed(&tasks, FailureKind::Transport, &err.to_string());
        }
    };

    let mut outcomes = Vec::with_capacity(tasks.len());
    let mut completed: IndexMap<String, TaskResult> = IndexMap::new();

    for spec in tasks.iter() {
        let ctx = TaskContext::new(&device, &completed);
        let command = match ctx.render(spec.template()) {
            Ok(command) => command,
            Err(err) => {
                warn!("{}: {}: {err}", device.name, spec.key());
                outcomes.push(TaskOutcome::failed(
                    spec.key(),
                    FailureKind::Template,
                    err.to_string(),
                ));
                continue;
            }
        };

        debug!("{}: sending '{command}'", device.name);
        let raw = match with_deadline(deadline, session.send_command(&command)).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!("{}: {}: {err}", device.name, spec.key());
                outcomes.push(TaskOutcome::failed(
                    spec.key(),
                    FailureKind::Transport,
                    err.to_string(),
                ));
                continue;
            }
        };

        let result = match spec.mode() {
            ParseMode::Raw => TaskResult::Raw(raw),
            ParseMode::Structured => {
                match parser.parse(&device.connection.platform, &command, &raw) {
                    Ok(records) => TaskResult::Structured(records),
                    Err(err) => {
                        warn!("{}: {}: {err}", device.name, spec.key());
                        outcomes.push(TaskOutcome::failed(
                            spec.key(),
                            FailureKind::Parse,
                            err.to_string(),
                        ));
                        continue;
                    }
                }
            }
        };

        store.put(&device.name, spec.key(), result.clone());
        completed.insert(spec.key().to_string(), result);
        outcomes.push(TaskOutcome::done(spec.key()));
    }

    if let Err(err) = session.close().await {
        debug!("{}: close: {err}", device.name);
    }

    DeviceReport::from_outcomes(outcomes)
}

/// Apply the per-device deadline to one transport call.
async fn with_deadline<T, F>(deadline: Option<Duration>, call: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Timeout(limit)),
        },
        None => call.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::filter::{self, Predicate};
    use crate::testutil::{two_router_inventory, FieldParser, SlowTransport, OSPF_NEIGHBORS_RAW};
    use crate::transport::{CannedTransport, Session};

    fn dispatcher(transport: CannedTransport) -> Dispatcher {
        Dispatcher::new(Arc::new(transport), Arc::new(FieldParser))
    }

    #[tokio::test]
    async fn structured_results_land_per_device() {
        let inventory = two_router_inventory();
        let set = filter::select(&inventory, &Predicate::group("ios")).unwrap();

        let transport =
            CannedTransport::new().respond("r1", "show ip ospf neighbor", OSPF_NEIGHBORS_RAW);
        let store = Arc::new(ResultStore::new());
        let tasks = vec![TaskSpec::structured("ospf_output", "show ip ospf neighbor")];

        let report = dispatcher(transport).run(&set, &tasks, &store).await;

        assert!(report.is_clean());
        let result = store.get("r1", "ospf_output").unwrap();
        let records = result.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(result.count_where("state", |s| s.contains("FULL")), 2);

        // Only devices in the set are touched.
        assert!(!store.has_key("r2", "ospf_output"));
        assert!(report.device("r2").is_none());
    }

    #[tokio::test]
    async fn one_device_failure_is_isolated() {
        let inventory = two_router_inventory();
        let set = filter::select(
            &inventory,
            &Predicate::group("ios").or(Predicate::group("junos")),
        )
        .unwrap();

        let transport = CannedTransport::new()
            .unreachable("r1")
            .respond("r2", "show version", "Junos: 21.4R3\n");
        let store = Arc::new(ResultStore::new());
        let tasks = vec![TaskSpec::raw("version", "show version")];

        let report = dispatcher(transport).run(&set, &tasks, &store).await;

        // r1 failed, r2 is intact.
        assert!(!store.has_key("r1", "version"));
        assert_eq!(
            store.get("r2", "version").unwrap().raw(),
            Some("Junos: 21.4R3\n")
        );

        let r1 = report.device("r1").unwrap();
        assert!(matches!(
            r1.task("version").unwrap().status,
            TaskStatus::Failed {
                kind: FailureKind::Transport,
                ..
            }
        ));
        assert!(report.device("r2").unwrap().is_clean());
        assert_eq!(report.ok_count(), 1);
        assert_eq!(report.failed_count(), 1);
    }

    #[tokio::test]
    async fn task_failure_does_not_skip_remaining_tasks() {
        let inventory = two_router_inventory();
        let set = filter::select(&inventory, &Predicate::group("ios")).unwrap();

        // First task has no scripted response, second does.
        let transport = CannedTransport::new().respond("r1", "show ip route", "gateway of last resort\n");
        let store = Arc::new(ResultStore::new());
        let tasks = vec![
            TaskSpec::raw("arp", "show arp"),
            TaskSpec::raw("routes", "show ip route"),
        ];

        let report = dispatcher(transport).run(&set, &tasks, &store).await;

        let r1 = report.device("r1").unwrap();
        assert!(!r1.task("arp").unwrap().is_done());
        assert!(r1.task("routes").unwrap().is_done());
        assert!(store.has_key("r1", "routes"));
        assert!(!store.has_key("r1", "arp"));
    }

    #[tokio::test]
    async fn later_task_reads_earlier_result() {
        let inventory = two_router_inventory();
        let set = filter::select(&inventory, &Predicate::group("ios")).unwrap();

        let transport = CannedTransport::new()
            .respond("r1", "show run | inc hostname", "edge-r1\n")
            .respond("r1", "ping edge-r1", "!!!!!\n");
        let store = Arc::new(ResultStore::new());

        // The second task's template reads the first task's stored result.
        let tasks = vec![
            TaskSpec::raw("target", "show run | inc hostname"),
            TaskSpec::raw("ping", "ping {target}"),
        ];

        let report = dispatcher(transport).run(&set, &tasks, &store).await;

        assert!(report.is_clean(), "{report}");
        assert_eq!(store.get("r1", "ping").unwrap().raw(), Some("!!!!!\n"));
    }

    #[tokio::test]
    async fn parse_failure_records_and_continues() {
        let inventory = two_router_inventory();
        let set = filter::select(&inventory, &Predicate::group("ios")).unwrap();

        let transport = CannedTransport::new()
            .respond("r1", "show ip ospf neighbor", "% Invalid input detected\n")
            .respond("r1", "show clock", "12:00:00 UTC\n");
        let store = Arc::new(ResultStore::new());
        let tasks = vec![
            TaskSpec::structured("ospf_output", "show ip ospf neighbor"),
            TaskSpec::raw("clock", "show clock"),
        ];

        let report = dispatcher(transport).run(&set, &tasks, &store).await;

        let r1 = report.device("r1").unwrap();
        assert!(matches!(
            r1.task("ospf_output").unwrap().status,
            TaskStatus::Failed {
                kind: FailureKind::Parse,
                ..
            }
        ));
        assert!(r1.task("clock").unwrap().is_done());
        assert!(!store.has_key("r1", "ospf_output"));
    }

    #[tokio::test]
    async fn second_run_overwrites_the_key() {
        let inventory = two_router_inventory();
        let set = filter::select(&inventory, &Predicate::group("ios")).unwrap();
        let store = Arc::new(ResultStore::new());
        let tasks = vec![TaskSpec::raw("version", "show version")];

        let first = CannedTransport::new().respond("r1", "show version", "IOS 15.1\n");
        dispatcher(first).run(&set, &tasks, &store).await;

        let second = CannedTransport::new().respond("r1", "show version", "IOS 15.2\n");
        dispatcher(second).run(&set, &tasks, &store).await;

        assert_eq!(store.get("r1", "version").unwrap().raw(), Some("IOS 15.2\n"));
        assert_eq!(store.keys("r1"), vec!["version"]);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_is_a_transport_failure() {
        let inventory = two_router_inventory();
        let set = filter::select(
            &inventory,
            &Predicate::group("ios").or(Predicate::group("junos")),
        )
        .unwrap();

        // r1 hangs forever on connect; r2 answers normally.
        let inner = CannedTransport::new().respond("r2", "show version", "Junos: 21.4R3\n");
        let transport = SlowTransport::new(inner, "r1");

        let store = Arc::new(ResultStore::new());
        let tasks = vec![TaskSpec::raw("version", "show version")];

        let dispatcher = Dispatcher::new(Arc::new(transport), Arc::new(FieldParser))
            .with_options(DispatchOptions {
                max_concurrency: 20,
                device_deadline: Some(Duration::from_secs(5)),
            });

        let report = dispatcher.run(&set, &tasks, &store).await;

        let r1 = report.device("r1").unwrap();
        match &r1.task("version").unwrap().status {
            TaskStatus::Failed { kind, message } => {
                assert_eq!(*kind, FailureKind::Transport);
                assert!(message.contains("timed out"), "{message}");
            }
            TaskStatus::Done => panic!("expected r1 to time out"),
        }
        assert!(report.device("r2").unwrap().is_clean());
        assert!(store.has_key("r2", "version"));
    }

    #[tokio::test]
    async fn concurrency_cap_of_one_still_covers_all_devices() {
        let inventory = two_router_inventory();
        let set = filter::select(
            &inventory,
            &Predicate::group("ios").or(Predicate::group("junos")),
        )
        .unwrap();

        let transport = CannedTransport::new()
            .respond("r1", "show version", "IOS 15.1\n")
            .respond("r2", "show version", "Junos: 21.4R3\n");
        let store = Arc::new(ResultStore::new());
        let tasks = vec![TaskSpec::raw("version", "show version")];

        let dispatcher = Dispatcher::new(Arc::new(transport), Arc::new(FieldParser))
            .with_options(DispatchOptions {
                max_concurrency: 1,
                device_deadline: None,
            });

        let report = dispatcher.run(&set, &tasks, &store).await;
        assert!(report.is_clean());
        assert!(store.has_key("r1", "version"));
        assert!(store.has_key("r2", "version"));
    }

    /// Wraps a canned transport in a session that panics on one command,
    /// taking its worker down mid-run.
    struct FaultingTransport {
        inner: CannedTransport,
        fault_on: String,
    }

    #[async_trait]
    impl Transport for FaultingTransport {
        async fn connect(&self, device: &Device) -> Result<Box<dyn Session>, TransportError> {
            let inner = self.inner.connect(device).await?;
            Ok(Box::new(FaultingSession {
                inner,
                fault_on: self.fault_on.clone(),
            }))
        }
    }

    struct FaultingSession {
        inner: Box<dyn Session>,
        fault_on: String,
    }

    #[async_trait]
    impl Session for FaultingSession {
        async fn send_command(&mut self, command: &str) -> Result<String, TransportError> {
            if command == self.fault_on {
                panic!("session fault on '{command}'");
            }
            self.inner.send_command(command).await
        }
    }

    #[tokio::test]
    async fn dead_worker_keeps_stored_results_done() {
        let inventory = two_router_inventory();
        let set = filter::select(&inventory, &Predicate::group("ios")).unwrap();

        let transport = FaultingTransport {
            inner: CannedTransport::new()
                .respond("r1", "show version", "IOS 15.1\n")
                .respond("r1", "show ip route", "gateway of last resort\n"),
            fault_on: "show ip route".to_string(),
        };
        let store = Arc::new(ResultStore::new());
        let tasks = vec![
            TaskSpec::raw("version", "show version"),
            TaskSpec::raw("routes", "show ip route"),
        ];

        let report = Dispatcher::new(Arc::new(transport), Arc::new(FieldParser))
            .run(&set, &tasks, &store)
            .await;

        // The first task's result landed before the worker died; the report
        // must agree with the store about it.
        let r1 = report.device("r1").unwrap();
        assert!(r1.task("version").unwrap().is_done());
        assert_eq!(store.get("r1", "version").unwrap().raw(), Some("IOS 15.1\n"));

        assert!(matches!(
            r1.task("routes").unwrap().status,
            TaskStatus::Failed {
                kind: FailureKind::Worker,
                ..
            }
        ));
        assert!(!store.has_key("r1", "routes"));
    }

    #[test]
    fn report_display_lists_every_device_and_task() {
        let mut devices = IndexMap::new();
        devices.insert(
            "r1".to_string(),
            DeviceReport::from_outcomes(vec![TaskOutcome::done("ospf_output")]),
        );
        devices.insert(
            "r2".to_string(),
            DeviceReport::from_outcomes(vec![TaskOutcome::failed(
                "ospf_output",
                FailureKind::Transport,
                "Connection disconnected",
            )]),
        );
        let report = RunReport::new(devices);

        let rendered = report.to_string();
        assert!(rendered.contains("---- r1 ----"));
        assert!(rendered.contains("ospf_output: done"));
        assert!(rendered.contains("---- r2 ----"));
        assert!(rendered.contains("FAILED [transport] Connection disconnected"));
        assert!(rendered.contains("1 ok, 1 failed across 2 device(s)"));
    }
}
