//! 事件管线（eventing）
//!
//! 发布/订阅与异步处理的全部构件：
//! - `Event` / `EventMetadata`：不可变事件与其元数据（优先级、状态、重试计数、标签）；
//! - `EventHandler`：消费事件的单一能力，可由对象或 `handler_fn` 闭包实现；
//! - `SubscriptionRegistry`：事件名 → 按优先级降序的订阅列表；
//! - `MiddlewareChain`：分发前依次执行的校验、转换与日志中间件；
//! - `EventManager`：有界队列 + 批处理循环 + 重试策略，本身是一个模块。
//!
//! 同一管理器内按入队顺序处理；不同事件名之间、不同管理器之间不保证顺序。
//!
mod config;
mod event;
mod handler;
mod manager;
mod metadata;
mod middleware;
mod policy;
mod priority;
mod registry;
mod stats;
mod status;
mod subscription;

pub use config::{ErrorHandlingPolicy, EventConfig};
pub use event::Event;
pub use handler::{EventHandler, FnHandler, handler_fn};
pub use manager::EventManager;
pub use metadata::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, EventMetadata};
pub use middleware::{
    LoggingMiddleware, Middleware, MiddlewareChain, TransformMiddleware, ValidationMiddleware,
};
pub use policy::FailureDecision;
pub use priority::EventPriority;
pub use registry::SubscriptionRegistry;
pub use stats::{EventManagerStats, FailureStage, ProcessingFailure};
pub use status::EventStatus;
pub use subscription::{EventFilter, EventSubscription, SubscriptionId};
