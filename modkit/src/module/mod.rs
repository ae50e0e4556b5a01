//! 模块生命周期（module）
//!
//! - `state`：纯逻辑的生命周期状态机；
//! - `graph`：以名称为节点的依赖图与环检测；
//! - `hook`：setup/cleanup 前后的钩子协议；
//! - `kernel`：`ModuleCore` 与 `Module`/`ModuleExt`，负责编排初始化与清理；
//! - `stats`：统一的模块统计结构。
//!
mod config;
mod graph;
mod hook;
mod kernel;
mod state;
mod stats;

pub use config::ModuleConfig;
pub use graph::DependencyGraph;
pub use hook::LifecycleHook;
pub use kernel::{Dependency, Module, ModuleCore, ModuleExt};
pub use state::{Lifecycle, ModuleState};
pub use stats::{DependencyStats, ModuleStats};
