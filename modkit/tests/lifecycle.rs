use async_trait::async_trait;
use modkit::module::{LifecycleHook, Module, ModuleConfig, ModuleCore, ModuleExt, ModuleState};
use modkit::{ModkitError, ModkitResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Journal = Arc<Mutex<Vec<String>>>;

struct Probe {
    core: ModuleCore,
    journal: Journal,
    setups: AtomicUsize,
    fail_setup: AtomicBool,
    fail_teardown: AtomicBool,
    setup_delay: Duration,
}

impl Probe {
    fn new(name: &str, journal: &Journal) -> Arc<Self> {
        Self::slow(name, journal, Duration::ZERO)
    }

    fn slow(name: &str, journal: &Journal, setup_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            core: ModuleCore::named(name).unwrap(),
            journal: journal.clone(),
            setups: AtomicUsize::new(0),
            fail_setup: AtomicBool::new(false),
            fail_teardown: AtomicBool::new(false),
            setup_delay,
        })
    }

    fn failing(name: &str, journal: &Journal) -> Arc<Self> {
        let probe = Self::new(name, journal);
        probe.fail_setup.store(true, Ordering::SeqCst);
        probe
    }
}

#[async_trait]
impl Module for Probe {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    async fn setup(&self) -> ModkitResult<()> {
        if !self.setup_delay.is_zero() {
            tokio::time::sleep(self.setup_delay).await;
        }
        self.setups.fetch_add(1, Ordering::SeqCst);
        if self.fail_setup.load(Ordering::SeqCst) {
            return Err(ModkitError::module(self.core.name(), "setup refused"));
        }
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}.setup", self.core.name()));
        Ok(())
    }

    async fn teardown(&self) -> ModkitResult<()> {
        if self.fail_teardown.load(Ordering::SeqCst) {
            return Err(ModkitError::module(self.core.name(), "teardown refused"));
        }
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}.teardown", self.core.name()));
        Ok(())
    }
}

struct Recorder {
    journal: Journal,
    fail_after_setup: bool,
}

#[async_trait]
impl LifecycleHook for Recorder {
    fn hook_name(&self) -> &'static str {
        "recorder"
    }

    async fn before_setup(&self, module: &str) -> ModkitResult<()> {
        self.journal.lock().unwrap().push(format!("before_setup:{module}"));
        Ok(())
    }

    async fn after_setup(&self, module: &str) -> ModkitResult<()> {
        if self.fail_after_setup {
            return Err(ModkitError::module(module, "hook refused"));
        }
        self.journal.lock().unwrap().push(format!("after_setup:{module}"));
        Ok(())
    }

    async fn before_cleanup(&self, module: &str) -> ModkitResult<()> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("before_cleanup:{module}"));
        Ok(())
    }

    async fn after_cleanup(&self, module: &str) -> ModkitResult<()> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("after_cleanup:{module}"));
        Ok(())
    }
}

fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_initialize_runs_setup_once() {
    let j = journal();
    let probe = Probe::slow("db", &j, Duration::from_millis(50));

    let (a, b) = tokio::join!(
        {
            let p = probe.clone();
            async move { p.initialize().await }
        },
        {
            let p = probe.clone();
            async move { p.initialize().await }
        }
    );

    a.unwrap();
    b.unwrap();
    assert_eq!(probe.setups.load(Ordering::SeqCst), 1);
    assert_eq!(probe.state(), ModuleState::Initialized);

    // 已初始化时再次调用为空操作
    probe.initialize().await.unwrap();
    assert_eq!(probe.setups.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn waiter_sees_failure_of_in_flight_initialize() {
    let j = journal();
    let probe = Probe::slow("db", &j, Duration::from_millis(100));
    probe.fail_setup.store(true, Ordering::SeqCst);

    let first = tokio::spawn({
        let p = probe.clone();
        async move { p.initialize().await }
    });
    tokio::time::timeout(Duration::from_secs(5), async {
        while probe.state() != ModuleState::Initializing {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();

    let waiter = probe.initialize().await.unwrap_err();
    assert!(matches!(waiter, ModkitError::ErrorState { .. }));
    let first = first.await.unwrap().unwrap_err();
    assert!(matches!(first, ModkitError::Initialization { .. }));

    assert_eq!(probe.setups.load(Ordering::SeqCst), 1);
    assert_eq!(probe.state(), ModuleState::Error);
}

#[tokio::test]
async fn teardown_failure_moves_module_to_error() {
    let j = journal();
    let app = Probe::new("app", &j);
    app.initialize().await.unwrap();
    app.fail_teardown.store(true, Ordering::SeqCst);

    let err = app.cleanup().await.unwrap_err();
    assert!(matches!(err, ModkitError::Cleanup { .. }));
    assert_eq!(app.state(), ModuleState::Error);

    match app.ensure_initialized().unwrap_err() {
        ModkitError::ErrorState { module, source } => {
            assert_eq!(module, "app");
            assert!(matches!(*source, ModkitError::Module { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(app.get_stats().has_error);

    // Error 状态下可重新初始化
    app.fail_teardown.store(false, Ordering::SeqCst);
    app.initialize().await.unwrap();
    app.cleanup().await.unwrap();
    assert_eq!(app.state(), ModuleState::Created);
}

#[tokio::test]
async fn dependencies_initialize_in_order_and_clean_up_in_reverse() {
    let j = journal();
    let app = Probe::new("app", &j);
    let db = Probe::new("db", &j);
    let cache = Probe::new("cache", &j);

    app.add_dependency("db", db.clone(), false, false).unwrap();
    app.add_dependency("cache", cache.clone(), false, false).unwrap();
    app.core().add_hook(Arc::new(Recorder {
        journal: j.clone(),
        fail_after_setup: false,
    }));

    app.initialize().await.unwrap();
    assert!(db.core().is_initialized());
    assert!(cache.core().is_initialized());
    assert_eq!(
        entries(&j),
        vec![
            "db.setup",
            "cache.setup",
            "before_setup:app",
            "app.setup",
            "after_setup:app"
        ]
    );

    j.lock().unwrap().clear();
    app.cleanup().await.unwrap();
    assert_eq!(
        entries(&j),
        vec![
            "before_cleanup:app",
            "app.teardown",
            "cache.teardown",
            "db.teardown",
            "after_cleanup:app"
        ]
    );
    assert_eq!(app.state(), ModuleState::Created);
    assert_eq!(db.state(), ModuleState::Created);
}

#[test]
fn cyclic_dependency_is_rejected_without_leaving_an_edge() {
    let j = journal();
    let a = Probe::new("a", &j);
    let b = Probe::new("b", &j);
    let c = Probe::new("c", &j);

    a.add_dependency("b", b.clone(), false, false).unwrap();
    b.add_dependency("c", c.clone(), false, false).unwrap();

    let before = c.core().dependency_graph().edge_count();
    let err = c.add_dependency("a", a.clone(), false, false).unwrap_err();
    assert!(matches!(err, ModkitError::Dependency { .. }));
    assert!(err.is_module_error());
    assert_eq!(c.core().dependency_graph().edge_count(), before);
    assert!(c.core().dependencies().is_empty());

    assert!(a.core().dependency_graph().contains_edge("a", "b"));
    assert!(a.add_dependency("self", a.clone(), false, false).is_err());
    // 同名依赖
    assert!(a.add_dependency("b", c.clone(), false, false).is_err());
    assert!(a.add_dependency("", c.clone(), false, false).is_err());
}

#[tokio::test]
async fn dependencies_cannot_be_added_after_initialization() {
    let j = journal();
    let app = Probe::new("app", &j);
    app.initialize().await.unwrap();

    let err = app
        .add_dependency("late", Probe::new("late", &j), false, false)
        .unwrap_err();
    assert!(matches!(err, ModkitError::Dependency { .. }));
}

#[tokio::test]
async fn required_dependency_failure_moves_module_to_error() {
    let j = journal();
    let app = Probe::new("app", &j);
    let db = Probe::failing("db", &j);
    app.add_dependency("db", db.clone(), false, false).unwrap();

    let err = app.initialize().await.unwrap_err();
    assert!(matches!(err, ModkitError::Initialization { .. }));
    assert_eq!(app.state(), ModuleState::Error);
    assert_eq!(db.state(), ModuleState::Error);
    assert_eq!(app.setups.load(Ordering::SeqCst), 0);

    match app.ensure_initialized().unwrap_err() {
        ModkitError::ErrorState { module, source } => {
            assert_eq!(module, "app");
            assert!(matches!(*source, ModkitError::Dependency { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }

    let stats = app.get_stats();
    assert!(stats.has_error);
    assert!(stats.error_message.is_some());

    // 修复后可从 Error 重新初始化
    db.fail_setup.store(false, Ordering::SeqCst);
    app.initialize().await.unwrap();
    assert_eq!(app.state(), ModuleState::Initialized);
    assert!(app.core().last_error().is_none());
}

#[tokio::test]
async fn optional_dependency_failure_is_swallowed() {
    let j = journal();
    let app = Probe::new("app", &j);
    let metrics = Probe::failing("metrics", &j);
    app.add_dependency("metrics", metrics.clone(), true, false)
        .unwrap();

    app.initialize().await.unwrap();
    assert_eq!(app.state(), ModuleState::Initialized);
    assert_eq!(metrics.state(), ModuleState::Error);

    let stats = app.get_stats();
    let dep = &stats.dependencies["metrics"];
    assert!(dep.optional);
    assert!(!dep.initialized);

    // 未初始化的依赖在清理时跳过
    app.cleanup().await.unwrap();
    assert_eq!(entries(&j), vec!["app.setup", "app.teardown"]);
}

#[tokio::test]
async fn failing_hook_moves_module_to_error() {
    let j = journal();
    let app = Probe::new("app", &j);
    app.core().add_hook(Arc::new(Recorder {
        journal: j.clone(),
        fail_after_setup: true,
    }));

    let err = app.initialize().await.unwrap_err();
    assert!(matches!(err, ModkitError::Initialization { .. }));
    assert_eq!(app.state(), ModuleState::Error);
    assert_eq!(app.get_stats().hooks, vec!["recorder"]);
}

#[tokio::test]
async fn lazy_dependency_initializes_on_first_resolve() {
    let j = journal();
    let app = Probe::new("app", &j);
    let reports = Probe::new("reports", &j);
    app.add_dependency("reports", reports.clone(), false, true)
        .unwrap();

    app.initialize().await.unwrap();
    assert_eq!(reports.state(), ModuleState::Created);

    let resolved = app.resolve_dependency("reports").await.unwrap();
    assert_eq!(resolved.core().name(), "reports");
    assert!(reports.core().is_initialized());
    assert_eq!(reports.setups.load(Ordering::SeqCst), 1);

    assert!(app.resolve_dependency("missing").await.is_err());
}

#[tokio::test]
async fn cleanup_requires_initialized_state() {
    let j = journal();
    let app = Probe::new("app", &j);
    let err = app.cleanup().await.unwrap_err();
    assert!(matches!(
        err,
        ModkitError::State {
            state: ModuleState::Created,
            ..
        }
    ));
}

#[test]
fn stats_expose_config_and_metadata() {
    let config = ModuleConfig::builder()
        .name("billing")
        .enabled(false)
        .build();
    let core = ModuleCore::new(config).unwrap();
    core.set_metadata("region", serde_json::json!("eu-west"));

    let stats = core.stats();
    assert_eq!(stats.name, "billing");
    assert!(!stats.enabled);
    assert_eq!(stats.state, ModuleState::Created);
    assert!(!stats.initialized);
    assert_eq!(stats.metadata["region"], "eu-west");

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["state"], "created");

    assert!(ModuleCore::named("").is_err());
}
