//! 模块化运行时基础库（modkit）
//!
//! 为可插拔子系统提供两块基础设施：
//! - 模块生命周期（`module`）：状态机、依赖图与环检测、钩子、统一统计；
//! - 事件管线（`eventing`）：订阅注册表、优先级分发、有界队列与批处理、中间件链、重试策略；
//! - 持久化边界（`persist`）：事件序列化、存储抽象与内存/文件实现。
//!
//! 所有管线组件本身都是模块，通过 `ModuleExt::initialize` / `cleanup` 统一编排。
//! 不提供全局单例：上下文通过显式传入的模块与事件元数据传递。
//!
//! 典型用法：
//! 1. 构造 `EventManager`，可选地通过 `with_persistence` 挂接 `PersistenceManager`；
//! 2. 注册中间件与订阅，调用 `initialize` 启动批处理循环；
//! 3. `emit` 事件；通过 `failures()` 观察被策略上报的失败；
//! 4. 结束时调用 `cleanup`，等待在途处理任务结束。
//!
pub mod error;
#[cfg(feature = "eventing")]
pub mod eventing;
pub mod module;
#[cfg(feature = "eventing")]
pub mod persist;
#[cfg(feature = "eventing")]
mod serde_secs;
mod sync;
pub mod validation;

pub use error::{ModkitError, ModkitResult};
