//! 模块内核（Module Kernel）
//!
//! `ModuleCore` 保存单个模块的配置、生命周期状态、依赖边与钩子；
//! `Module` 由具体模块实现（提供 `core` 以及可选的 `setup/teardown`）；
//! `ModuleExt` 为所有模块统一提供编排逻辑：
//! - `initialize`：依赖（非惰性，按注册顺序）→ before 钩子 → setup → after 钩子；
//! - `cleanup`：before 钩子 → teardown → 依赖（逆序）→ after 钩子；
//! - `add_dependency`：注册依赖并做环检测；
//! - `ensure_initialized`：业务方法的前置状态检查。
//!
use super::graph::DependencyGraph;
use super::hook::{HookPhase, LifecycleHook};
use super::state::{Lifecycle, ModuleState};
use super::stats::{DependencyStats, ModuleStats};
use super::ModuleConfig;
use crate::error::{ModkitError, ModkitResult};
use crate::sync::lock;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// 依赖边：名称 + 共享的目标模块引用。模块本身的生命周期由外部管理。
#[derive(Clone)]
pub struct Dependency {
    name: String,
    module: Arc<dyn Module>,
    optional: bool,
    lazy: bool,
}

impl Dependency {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &Arc<dyn Module> {
        &self.module
    }

    pub fn optional(&self) -> bool {
        self.optional
    }

    pub fn lazy(&self) -> bool {
        self.lazy
    }
}

/// 单个模块实例的共享状态
pub struct ModuleCore {
    name: String,
    config: Mutex<ModuleConfig>,
    lifecycle: Mutex<Lifecycle>,
    // 串行化 initialize/cleanup；并发调用者在此等待在途的初始化完成
    gate: tokio::sync::Mutex<()>,
    dependencies: Mutex<Vec<Dependency>>,
    graph: Mutex<DependencyGraph>,
    hooks: Mutex<Vec<Arc<dyn LifecycleHook>>>,
}

impl ModuleCore {
    pub fn new(config: ModuleConfig) -> ModkitResult<Self> {
        config.validate()?;

        Ok(Self {
            name: config.name().to_string(),
            config: Mutex::new(config),
            lifecycle: Mutex::new(Lifecycle::default()),
            gate: tokio::sync::Mutex::new(()),
            dependencies: Mutex::new(Vec::new()),
            graph: Mutex::new(DependencyGraph::new()),
            hooks: Mutex::new(Vec::new()),
        })
    }

    /// 以默认配置创建
    pub fn named(name: impl Into<String>) -> ModkitResult<Self> {
        Self::new(ModuleConfig::new(name)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ModuleState {
        lock(&self.lifecycle).state()
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == ModuleState::Initialized
    }

    /// 最近一次导致进入 Error 的原因
    pub fn last_error(&self) -> Option<Arc<ModkitError>> {
        lock(&self.lifecycle).error().cloned()
    }

    pub fn config(&self) -> ModuleConfig {
        lock(&self.config).clone()
    }

    pub fn enabled(&self) -> bool {
        lock(&self.config).enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        lock(&self.config).set_enabled(enabled);
    }

    pub fn set_metadata(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        lock(&self.config).set_metadata(key, value)
    }

    pub fn add_hook(&self, hook: Arc<dyn LifecycleHook>) {
        lock(&self.hooks).push(hook);
    }

    /// 已注册依赖（注册顺序）
    pub fn dependencies(&self) -> Vec<Dependency> {
        lock(&self.dependencies).clone()
    }

    pub fn dependency(&self, name: &str) -> Option<Arc<dyn Module>> {
        lock(&self.dependencies)
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.module.clone())
    }

    /// 本模块自身的依赖边快照
    pub fn dependency_graph(&self) -> DependencyGraph {
        lock(&self.graph).clone()
    }

    /// 业务方法前置检查：必须处于 Initialized
    pub fn ensure_initialized(&self) -> ModkitResult<()> {
        let lifecycle = lock(&self.lifecycle);
        match lifecycle.state() {
            ModuleState::Initialized => Ok(()),
            ModuleState::Error => Err(ModkitError::ErrorState {
                module: self.name.clone(),
                source: lifecycle
                    .error()
                    .cloned()
                    .unwrap_or_else(|| Arc::new(ModkitError::module(&self.name, "unknown error"))),
            }),
            state => Err(ModkitError::State {
                module: self.name.clone(),
                state,
            }),
        }
    }

    pub fn stats(&self) -> ModuleStats {
        let config = self.config();
        let (state, error) = {
            let lifecycle = lock(&self.lifecycle);
            (lifecycle.state(), lifecycle.error().cloned())
        };

        let dependencies = self
            .dependencies()
            .into_iter()
            .map(|d| {
                let stats = DependencyStats {
                    module: d.module.core().name().to_string(),
                    optional: d.optional,
                    lazy: d.lazy,
                    initialized: d.module.core().is_initialized(),
                };
                (d.name, stats)
            })
            .collect();

        let hooks = lock(&self.hooks)
            .iter()
            .map(|h| h.hook_name().to_string())
            .collect();

        ModuleStats {
            name: self.name.clone(),
            enabled: config.enabled(),
            state,
            initialized: state == ModuleState::Initialized,
            has_error: error.is_some(),
            error_message: error.map(|e| e.to_string()),
            metadata: config.metadata().clone(),
            dependencies,
            hooks,
        }
    }

    fn transition(&self, next: ModuleState) -> ModkitResult<()> {
        lock(&self.lifecycle)
            .transition(next)
            .map_err(|state| ModkitError::State {
                module: self.name.clone(),
                state,
            })
    }

    fn fail(&self, error: Arc<ModkitError>) {
        lock(&self.lifecycle).fail(error);
    }

    /// 汇总本模块及其传递依赖的全部边，用于环检测
    fn collect_edges(&self, out: &mut DependencyGraph, visited: &mut HashSet<String>) {
        if !visited.insert(self.name.clone()) {
            return;
        }

        out.merge(&self.dependency_graph());
        for dep in self.dependencies() {
            dep.module.core().collect_edges(out, visited);
        }
    }

    async fn run_hooks(&self, phase: HookPhase) -> ModkitResult<()> {
        let hooks = lock(&self.hooks).clone();
        for hook in hooks {
            phase.run(hook.as_ref(), &self.name).await?;
        }
        Ok(())
    }
}

/// 可插拔模块：实现者仅需提供 `core`，按需覆盖 `setup/teardown`
#[async_trait]
pub trait Module: Send + Sync {
    fn core(&self) -> &ModuleCore;

    /// 模块自身的初始化逻辑（依赖与 before 钩子已完成）
    async fn setup(&self) -> ModkitResult<()> {
        Ok(())
    }

    /// 模块自身的释放逻辑（在依赖清理之前执行）
    async fn teardown(&self) -> ModkitResult<()> {
        Ok(())
    }
}

/// 生命周期编排，对所有 `Module`（含 `dyn Module`）自动可用
#[async_trait]
pub trait ModuleExt: Module {
    fn name(&self) -> &str {
        self.core().name()
    }

    fn state(&self) -> ModuleState {
        self.core().state()
    }

    fn ensure_initialized(&self) -> ModkitResult<()> {
        self.core().ensure_initialized()
    }

    fn get_stats(&self) -> ModuleStats {
        self.core().stats()
    }

    /// 注册依赖：仅在未初始化时允许；名称不可为空或重复；不可成环
    fn add_dependency(
        &self,
        name: &str,
        module: Arc<dyn Module>,
        optional: bool,
        lazy: bool,
    ) -> ModkitResult<()> {
        let core = self.core();
        let dependency_error = |reason: String| ModkitError::Dependency {
            module: core.name().to_string(),
            dependency: name.to_string(),
            reason,
        };

        match core.state() {
            ModuleState::Created | ModuleState::Error => {}
            state => {
                return Err(dependency_error(format!(
                    "dependencies cannot be added in state {state}"
                )));
            }
        }
        if name.trim().is_empty() {
            return Err(dependency_error("dependency name must not be empty".into()));
        }

        let target = module.core().name().to_string();
        if target == core.name() {
            return Err(dependency_error("module cannot depend on itself".into()));
        }

        // 先收集目标模块已知的传递边，再持有本模块的锁
        let mut known = DependencyGraph::new();
        module.core().collect_edges(&mut known, &mut HashSet::new());

        let mut deps = lock(&core.dependencies);
        if deps.iter().any(|d| d.name == name) {
            return Err(dependency_error("dependency already registered".into()));
        }

        let mut graph = lock(&core.graph);
        if !graph.try_add_edge(core.name(), &target, &known) {
            return Err(dependency_error(format!(
                "adding {} -> {target} would create a cycle",
                core.name()
            )));
        }

        deps.push(Dependency {
            name: name.to_string(),
            module,
            optional,
            lazy,
        });
        debug!(module = %core.name(), dependency = %name, %target, optional, lazy, "dependency registered");

        Ok(())
    }

    async fn initialize(&self) -> ModkitResult<()> {
        let core = self.core();
        let observed = core.state();
        if observed == ModuleState::Initialized {
            return Ok(());
        }

        let _gate = core.gate.lock().await;
        match core.state() {
            ModuleState::Initialized => return Ok(()),
            // 等待的在途初始化失败：直接返回其结果，不重复执行
            ModuleState::Error if observed == ModuleState::Initializing => {
                return core.ensure_initialized();
            }
            _ => {}
        }

        core.transition(ModuleState::Initializing)?;
        info!(module = %core.name(), "initializing module");

        match run_setup(self).await {
            Ok(()) => {
                core.transition(ModuleState::Initialized)?;
                info!(module = %core.name(), "module initialized");
                Ok(())
            }
            Err(err) => {
                let cause = Arc::new(err);
                core.fail(cause.clone());
                error!(module = %core.name(), error = %cause, "module initialization failed");
                Err(ModkitError::Initialization {
                    module: core.name().to_string(),
                    source: cause,
                })
            }
        }
    }

    async fn cleanup(&self) -> ModkitResult<()> {
        let core = self.core();
        let _gate = core.gate.lock().await;

        let state = core.state();
        if state != ModuleState::Initialized {
            return Err(ModkitError::State {
                module: core.name().to_string(),
                state,
            });
        }

        core.transition(ModuleState::CleaningUp)?;
        info!(module = %core.name(), "cleaning up module");

        match run_cleanup(self).await {
            Ok(()) => {
                core.transition(ModuleState::Created)?;
                info!(module = %core.name(), "module cleaned up");
                Ok(())
            }
            Err(err) => {
                let cause = Arc::new(err);
                core.fail(cause.clone());
                error!(module = %core.name(), error = %cause, "module cleanup failed");
                Err(ModkitError::Cleanup {
                    module: core.name().to_string(),
                    source: cause,
                })
            }
        }
    }

    /// 取出依赖；惰性依赖在首次访问时初始化
    async fn resolve_dependency(&self, name: &str) -> ModkitResult<Arc<dyn Module>> {
        let core = self.core();
        let dep = core
            .dependencies()
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ModkitError::Dependency {
                module: core.name().to_string(),
                dependency: name.to_string(),
                reason: "dependency not registered".into(),
            })?;

        if !dep.module.core().is_initialized() {
            dep.module
                .initialize()
                .await
                .map_err(|e| ModkitError::Dependency {
                    module: core.name().to_string(),
                    dependency: name.to_string(),
                    reason: e.to_string(),
                })?;
        }

        Ok(dep.module)
    }
}

impl<M: Module + ?Sized> ModuleExt for M {}

async fn run_setup<M: Module + ?Sized>(module: &M) -> ModkitResult<()> {
    let core = module.core();

    for dep in core.dependencies().into_iter().filter(|d| !d.lazy) {
        if let Err(err) = dep.module.initialize().await {
            if dep.optional {
                warn!(module = %core.name(), dependency = %dep.name, error = %err, "optional dependency failed to initialize");
                continue;
            }
            return Err(ModkitError::Dependency {
                module: core.name().to_string(),
                dependency: dep.name,
                reason: err.to_string(),
            });
        }
    }

    core.run_hooks(HookPhase::BeforeSetup).await?;
    module.setup().await?;
    core.run_hooks(HookPhase::AfterSetup).await
}

async fn run_cleanup<M: Module + ?Sized>(module: &M) -> ModkitResult<()> {
    let core = module.core();

    core.run_hooks(HookPhase::BeforeCleanup).await?;
    module.teardown().await?;

    for dep in core.dependencies().into_iter().rev() {
        if !dep.module.core().is_initialized() {
            continue;
        }
        if let Err(err) = dep.module.cleanup().await {
            if dep.optional {
                warn!(module = %core.name(), dependency = %dep.name, error = %err, "optional dependency failed to clean up");
                continue;
            }
            return Err(ModkitError::Dependency {
                module: core.name().to_string(),
                dependency: dep.name,
                reason: err.to_string(),
            });
        }
    }

    core.run_hooks(HookPhase::AfterCleanup).await
}
