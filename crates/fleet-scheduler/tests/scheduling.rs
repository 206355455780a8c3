use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleet_core::dependency::DependencyDecl;
use fleet_core::manifest::Manifest;
use fleet_core::package::PackageKind;
use fleet_graph::{collection, DependencyGraph, GraphError, WorkingSet};
use fleet_scheduler::{
    BuildOutcome, BuildPlan, BuildRequest, BuildUnit, FailureReason, NoopObserver, PackagePlan,
    ScheduleEvent, ScheduleObserver, Scheduler, SchedulerError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Start(String),
    End(String),
}

/// In-memory build unit that logs start/end, fails or panics on demand and
/// keeps every request it receives.
#[derive(Default)]
struct Recorder {
    log: Mutex<Vec<Event>>,
    requests: Mutex<HashMap<String, BuildRequest>>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    versions: HashMap<String, String>,
    delay: Duration,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl Recorder {
    fn new() -> Self {
        Self {
            delay: Duration::from_millis(5),
            ..Default::default()
        }
    }

    fn failing(mut self, ids: &[&str]) -> Self {
        self.failing = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    fn panicking(mut self, ids: &[&str]) -> Self {
        self.panicking = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    fn version(mut self, id: &str, v: &str) -> Self {
        self.versions.insert(id.to_string(), v.to_string());
        self
    }

    fn log(&self) -> Vec<Event> {
        self.log.lock().unwrap().clone()
    }

    fn position(&self, event: Event) -> Option<usize> {
        self.log().iter().position(|e| *e == event)
    }

    fn started(&self, id: &str) -> bool {
        self.position(Event::Start(id.to_string())).is_some()
    }

    fn request(&self, id: &str) -> BuildRequest {
        self.requests.lock().unwrap()[id].clone()
    }
}

impl BuildUnit for Recorder {
    async fn build(&self, request: BuildRequest) -> BuildOutcome {
        let id = request.package.clone();
        self.log.lock().unwrap().push(Event::Start(id.clone()));
        self.requests
            .lock()
            .unwrap()
            .insert(id.clone(), request);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Event::End(id.clone()));

        if self.panicking.contains(&id) {
            panic!("simulated crash in {id}");
        }
        if self.failing.contains(&id) {
            return BuildOutcome::failure(format!("{id} failed to compile"));
        }
        let version = self
            .versions
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("1.0.0.{}", id.len()));
        BuildOutcome::success(version)
    }
}

fn plan(edges: &[(&str, Vec<&str>)]) -> BuildPlan {
    BuildPlan::from_dependencies(edges.iter().map(|(id, deps)| {
        (
            id.to_string(),
            deps.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        )
    }))
}

fn diamond() -> BuildPlan {
    plan(&[
        ("A", vec![]),
        ("B", vec!["A"]),
        ("C", vec!["A"]),
        ("D", vec!["B", "C"]),
    ])
}

async fn run(plan: &BuildPlan, unit: Arc<Recorder>, jobs: usize) -> Result<fleet_scheduler::BuildReport, SchedulerError> {
    Scheduler::from_arc(unit, jobs)
        .run(plan, &mut NoopObserver)
        .await
}

fn sorted(ids: Vec<&str>) -> Vec<&str> {
    let mut ids = ids;
    ids.sort();
    ids
}

#[tokio::test]
async fn diamond_builds_in_dependency_order() {
    let unit = Arc::new(Recorder::new());
    let report = run(&diamond(), unit.clone(), 4).await.unwrap();

    assert_eq!(sorted(report.built_ids()), vec!["A", "B", "C", "D"]);
    assert!(report.failed.is_empty());
    assert!(report.is_success());

    let pos = |e: Event| unit.position(e).unwrap();
    assert_eq!(unit.log()[0], Event::Start("A".into()));
    assert!(pos(Event::Start("B".into())) > pos(Event::End("A".into())));
    assert!(pos(Event::Start("C".into())) > pos(Event::End("A".into())));
    assert!(pos(Event::Start("D".into())) > pos(Event::End("B".into())));
    assert!(pos(Event::Start("D".into())) > pos(Event::End("C".into())));

    // B and C are independent and run side by side.
    assert!(pos(Event::Start("C".into())) < pos(Event::End("B".into())));
    assert!(unit.max_running.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn failure_is_contained_to_dependent_subtree() {
    let unit = Arc::new(Recorder::new().failing(&["B"]));
    let report = run(&diamond(), unit.clone(), 4).await.unwrap();

    assert_eq!(sorted(report.built_ids()), vec!["A", "C"]);
    assert_eq!(sorted(report.failed_ids()), vec!["B", "D"]);
    assert!(!unit.started("D"), "D must never be dispatched");

    let b = report.failure("B").unwrap();
    assert_eq!(
        b.reason,
        FailureReason::Build {
            message: "B failed to compile".into()
        }
    );
    assert!(b.duration.is_some());

    let d = report.failure("D").unwrap();
    assert_eq!(d.reason, FailureReason::Cascade { origin: "B".into() });
    assert!(d.duration.is_none());
    assert_eq!(report.direct_failures().count(), 1);
    assert_eq!(report.cascade_failures().count(), 1);
}

#[tokio::test]
async fn cycle_is_rejected_before_any_dispatch() {
    let unit = Arc::new(Recorder::new());
    let cyclic = plan(&[
        ("A", vec!["C"]),
        ("B", vec!["A"]),
        ("C", vec!["B"]),
        ("E", vec![]),
    ]);
    let err = run(&cyclic, unit.clone(), 2).await.unwrap_err();
    match err {
        SchedulerError::Graph(GraphError::Cycle { members }) => {
            assert_eq!(members, vec!["A", "B", "C"]);
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
    assert!(unit.log().is_empty(), "nothing may be built when the graph has a cycle");
}

#[tokio::test]
async fn self_dependency_is_rejected_as_cycle() {
    let unit = Arc::new(Recorder::new());
    let looped = plan(&[("A", vec!["A"]), ("B", vec![])]);
    let err = run(&looped, unit.clone(), 2).await.unwrap_err();
    match err {
        SchedulerError::Graph(GraphError::Cycle { members }) => assert_eq!(members, vec!["A"]),
        other => panic!("expected a cycle error, got {other:?}"),
    }
    assert!(unit.log().is_empty());
}

#[tokio::test]
async fn resolved_versions_reach_pending_dependents() {
    let unit = Arc::new(
        Recorder::new()
            .version("A", "4.2.0.17")
            .version("B", "0.3.0.1"),
    );
    let report = run(&diamond(), unit.clone(), 2).await.unwrap();
    assert!(report.is_success());

    assert_eq!(unit.request("A").dependencies, Vec::<DependencyDecl>::new());
    assert_eq!(unit.request("B").dependency_version("A"), Some("4.2.0.17"));
    assert_eq!(unit.request("C").dependency_version("A"), Some("4.2.0.17"));
    assert_eq!(unit.request("D").dependency_version("B"), Some("0.3.0.1"));
    assert_eq!(
        report.built_package("A").map(|b| b.version.as_str()),
        Some("4.2.0.17")
    );
}

#[tokio::test]
async fn pinned_constraints_are_left_alone() {
    let graph = DependencyGraph::from_dependencies([
        ("A".to_string(), vec![]),
        ("B".to_string(), vec!["A".to_string()]),
    ]);
    let mut packages = BTreeMap::new();
    packages.insert("A".to_string(), PackagePlan::with_dependencies(Vec::<String>::new()));
    let mut b = PackagePlan::with_dependencies(Vec::<String>::new());
    b.dependencies
        .push(DependencyDecl::latest("A").resolved_to("0.0.1.1"));
    packages.insert("B".to_string(), b);
    let plan = BuildPlan::new(graph, packages).unwrap();

    let unit = Arc::new(Recorder::new().version("A", "9.9.9.9"));
    run(&plan, unit.clone(), 2).await.unwrap();
    assert_eq!(unit.request("B").dependency_version("A"), Some("0.0.1.1"));
    // B still waited for A even though its version was pinned.
    assert!(unit.position(Event::Start("B".into())) > unit.position(Event::End("A".into())));
}

#[tokio::test]
async fn concurrency_never_exceeds_jobs() {
    let edges: Vec<(String, Vec<&str>)> = (0..12).map(|i| (format!("p{i:02}"), vec![])).collect();
    let edges: Vec<(&str, Vec<&str>)> = edges.iter().map(|(id, d)| (id.as_str(), d.clone())).collect();
    let unit = Arc::new(Recorder::new());
    let report = run(&plan(&edges), unit.clone(), 3).await.unwrap();
    assert_eq!(report.built.len(), 12);
    assert_eq!(unit.max_running.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn jobs_zero_is_clamped_to_one() {
    let unit = Arc::new(Recorder::new());
    let scheduler = Scheduler::from_arc(unit.clone(), 0);
    assert_eq!(scheduler.jobs(), 1);
    let report = scheduler.run(&diamond(), &mut NoopObserver).await.unwrap();
    assert_eq!(report.built.len(), 4);
    assert_eq!(unit.max_running.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panicking_build_is_recorded_as_direct_failure() {
    let unit = Arc::new(Recorder::new().panicking(&["A"]));
    let report = run(&diamond(), unit, 2).await.unwrap();
    assert!(report.built.is_empty());
    let a = report.failure("A").unwrap();
    match &a.reason {
        FailureReason::Build { message } => assert!(message.contains("simulated crash in A"), "{message}"),
        other => panic!("unexpected reason {other:?}"),
    }
    for id in ["B", "C", "D"] {
        assert_eq!(
            report.failure(id).unwrap().reason,
            FailureReason::Cascade { origin: "A".into() }
        );
    }
}

#[tokio::test]
async fn priority_prefers_blocking_work_then_versioned_packages() {
    let graph = DependencyGraph::from_dependencies([
        ("data".to_string(), vec![]),
        ("lib".to_string(), vec![]),
        ("tool".to_string(), vec![]),
        ("app".to_string(), vec!["lib".to_string()]),
    ]);
    let mut packages = BTreeMap::new();
    let mut data = PackagePlan::with_dependencies(Vec::<String>::new());
    data.kind = PackageKind::Data;
    packages.insert("data".to_string(), data);
    packages.insert("lib".to_string(), PackagePlan::with_dependencies(Vec::<String>::new()));
    packages.insert("tool".to_string(), PackagePlan::with_dependencies(Vec::<String>::new()));
    packages.insert("app".to_string(), PackagePlan::with_dependencies(["lib"]));
    let plan = BuildPlan::new(graph, packages).unwrap();

    let unit = Arc::new(Recorder::new());
    let report = run(&plan, unit.clone(), 1).await.unwrap();
    let mut order: Vec<_> = report.built.iter().collect();
    order.sort_by_key(|b| b.dispatch_seq);
    let order: Vec<&str> = order.iter().map(|b| b.package.as_str()).collect();
    assert_eq!(order, vec!["lib", "tool", "app", "data"]);
}

#[tokio::test]
async fn empty_plan_drains_immediately() {
    let unit = Arc::new(Recorder::new());
    let report = run(&plan(&[]), unit.clone(), 4).await.unwrap();
    assert_eq!(report.total(), 0);
    assert!(unit.log().is_empty());
}

#[derive(Default)]
struct EventLog(Vec<String>);

impl ScheduleObserver for EventLog {
    fn on_event(&mut self, event: &ScheduleEvent<'_>) {
        let line = match event {
            ScheduleEvent::Dispatched { package, .. } => format!("dispatch {package}"),
            ScheduleEvent::Succeeded { package, .. } => format!("ok {package}"),
            ScheduleEvent::Failed { package, .. } => format!("fail {package}"),
            ScheduleEvent::Cascaded { package, origin } => format!("skip {package} ({origin})"),
        };
        self.0.push(line);
    }
}

#[tokio::test]
async fn observer_sees_every_transition() {
    let unit = Arc::new(Recorder::new().failing(&["C"]));
    let mut events = EventLog::default();
    Scheduler::from_arc(unit, 1)
        .run(&diamond(), &mut events)
        .await
        .unwrap();
    let events = events.0;
    assert_eq!(events[0], "dispatch A");
    assert_eq!(events[1], "ok A");
    assert!(events.contains(&"fail C".to_string()));
    assert!(events.contains(&"skip D (C)".to_string()));
    assert!(!events.contains(&"dispatch D".to_string()));
    assert_eq!(events.iter().filter(|e| e.starts_with("dispatch")).count(), 3);
}

#[tokio::test]
async fn build_collection_members_are_all_scheduled() {
    let manifest = Manifest::from_str(
        r#"
[[package]]
name = "X"
[[package]]
name = "Y"
dependencies = ["X"]
[[package]]
name = "Z"
[[package]]
name = "W"

[[collection]]
members = ["X", "Y"]
[[collection]]
members = ["Y", "Z"]
"#,
    )
    .unwrap();
    let selected = WorkingSet::select(&manifest, ["X"]).unwrap();
    let expanded = collection::expand(&manifest, &selected).unwrap();
    let plan = BuildPlan::from_manifest(&manifest, &expanded, Path::new(".")).unwrap();

    let unit = Arc::new(Recorder::new());
    let report = run(&plan, unit, 2).await.unwrap();
    assert_eq!(sorted(report.built_ids()), vec!["X", "Y", "Z"]);
}

/// Tiny deterministic generator so the property checks below need no extra crates.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn chance(&mut self, percent: u64) -> bool {
        self.next() % 100 < percent
    }
}

fn random_dag(seed: u64, size: usize) -> (Vec<(String, Vec<String>)>, Vec<String>) {
    let mut rng = Lcg(seed);
    let mut edges = Vec::new();
    let mut failing = Vec::new();
    for i in 0..size {
        let id = format!("n{i:02}");
        let deps: Vec<String> = (0..i)
            .filter(|_| rng.chance(15))
            .map(|j| format!("n{j:02}"))
            .collect();
        if rng.chance(10) {
            failing.push(id.clone());
        }
        edges.push((id, deps));
    }
    (edges, failing)
}

#[tokio::test]
async fn partition_ordering_and_containment_hold_on_random_graphs() {
    for seed in 1..=12u64 {
        let (edges, failing) = random_dag(seed, 30);
        let plan = BuildPlan::from_dependencies(edges.clone());
        let failing_refs: Vec<&str> = failing.iter().map(String::as_str).collect();
        let unit = Arc::new(Recorder {
            delay: Duration::from_millis(1),
            ..Recorder::new().failing(&failing_refs)
        });
        let report = run(&plan, unit.clone(), 4).await.unwrap();

        // Partition completeness.
        let built: BTreeSet<&str> = report.built_ids().into_iter().collect();
        let failed: BTreeSet<&str> = report.failed_ids().into_iter().collect();
        assert_eq!(built.len(), report.built.len(), "seed {seed}: duplicate built");
        assert_eq!(failed.len(), report.failed.len(), "seed {seed}: duplicate failed");
        assert!(built.is_disjoint(&failed), "seed {seed}");
        assert_eq!(built.len() + failed.len(), 30, "seed {seed}");

        // Containment: descendants of a failure fail, everything else builds.
        let graph = plan.graph();
        let mut doomed: BTreeSet<String> = BTreeSet::new();
        for f in &failing {
            doomed.insert(f.clone());
            doomed.extend(graph.descendants(f));
        }
        for (id, _) in &edges {
            if doomed.contains(id) {
                assert!(failed.contains(id.as_str()), "seed {seed}: {id} should have failed");
            } else {
                assert!(built.contains(id.as_str()), "seed {seed}: {id} should have built");
            }
        }

        // Cascade victims were never dispatched and name a real failed origin.
        for f in report.cascade_failures() {
            assert!(!unit.started(&f.package), "seed {seed}: {} was dispatched", f.package);
            let origin = f.reason.origin(&f.package);
            assert!(failing.iter().any(|x| x == origin), "seed {seed}: bad origin {origin}");
            assert!(graph.descendants(origin).contains(&f.package));
        }

        // Ordering: a built package starts only after all its parents ended.
        for id in &built {
            let start = unit.position(Event::Start(id.to_string())).unwrap();
            for parent in graph.parents_of(id) {
                let end = unit.position(Event::End(parent.clone())).unwrap();
                assert!(end < start, "seed {seed}: {id} started before {parent} ended");
            }
        }
    }
}
