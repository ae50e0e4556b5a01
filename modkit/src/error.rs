//! 统一错误定义
//!
//! 按三组归类：模块生命周期、事件管线、持久化；
//! 通过 `is_module_error` / `is_event_error` / `is_persistence_error` 判断所属分组，
//! 便于调用方按类别处理而无需穷举变体。
//!
use crate::module::ModuleState;
use std::sync::Arc;
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ModkitError {
    // --- 模块生命周期 ---
    #[error("module error: module={module}, reason={reason}")]
    Module { module: String, reason: String },
    #[error("initialization failed: module={module}, cause={source}")]
    Initialization {
        module: String,
        #[source]
        source: Arc<ModkitError>,
    },
    #[error("invalid state: module={module}, state={state}")]
    State { module: String, state: ModuleState },
    #[error("cleanup failed: module={module}, cause={source}")]
    Cleanup {
        module: String,
        #[source]
        source: Arc<ModkitError>,
    },
    #[error("module in error state: module={module}, cause={source}")]
    ErrorState {
        module: String,
        #[source]
        source: Arc<ModkitError>,
    },
    #[error("dependency error: module={module}, dependency={dependency}, reason={reason}")]
    Dependency {
        module: String,
        dependency: String,
        reason: String,
    },
    #[error("invalid config: {reason}")]
    Config { reason: String },

    // --- 事件管线 ---
    #[error("event error: {reason}")]
    Event { reason: String },
    #[error("event queue full: capacity={capacity}")]
    QueueFull { capacity: usize },
    #[error("too many handlers: event={event}, limit={limit}")]
    TooManyHandlers { event: String, limit: usize },
    #[error(
        "event handler failed: event={event}, handler={handler}, retry_count={retry_count}, reason={reason}"
    )]
    HandlerFailed {
        event: String,
        handler: String,
        retry_count: u32,
        reason: String,
    },
    #[error("middleware failed: middleware={middleware}, reason={reason}")]
    Middleware { middleware: String, reason: String },

    // --- 持久化 ---
    #[error("persistence error: {reason}")]
    Persistence { reason: String },
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// 统一 Result 类型别名
pub type ModkitResult<T> = Result<T, ModkitError>;

impl ModkitError {
    pub fn module(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Module {
            module: module.into(),
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub fn event(reason: impl Into<String>) -> Self {
        Self::Event {
            reason: reason.into(),
        }
    }

    pub fn persistence(reason: impl Into<String>) -> Self {
        Self::Persistence {
            reason: reason.into(),
        }
    }

    pub fn middleware(middleware: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Middleware {
            middleware: middleware.into(),
            reason: reason.into(),
        }
    }

    /// 生命周期相关错误（含初始化错误与状态错误）
    pub fn is_module_error(&self) -> bool {
        matches!(
            self,
            Self::Module { .. }
                | Self::Initialization { .. }
                | Self::Cleanup { .. }
                | Self::State { .. }
                | Self::ErrorState { .. }
                | Self::Dependency { .. }
                | Self::Config { .. }
        )
    }

    /// 事件管线相关错误（含处理器失败与中间件失败）
    pub fn is_event_error(&self) -> bool {
        matches!(
            self,
            Self::Event { .. }
                | Self::QueueFull { .. }
                | Self::TooManyHandlers { .. }
                | Self::HandlerFailed { .. }
                | Self::Middleware { .. }
        )
    }

    /// 存储或序列化错误
    pub fn is_persistence_error(&self) -> bool {
        matches!(
            self,
            Self::Persistence { .. } | Self::Serde { .. } | Self::Io { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_groups_are_disjoint() {
        let errors = vec![
            ModkitError::module("m", "boom"),
            ModkitError::QueueFull { capacity: 2 },
            ModkitError::persistence("disk"),
            ModkitError::from(std::io::Error::other("io")),
        ];

        for err in &errors {
            let groups = [
                err.is_module_error(),
                err.is_event_error(),
                err.is_persistence_error(),
            ];
            assert_eq!(groups.iter().filter(|g| **g).count(), 1, "{err}");
        }
    }

    #[test]
    fn initialization_error_keeps_cause() {
        let cause = Arc::new(ModkitError::module("db", "connection refused"));
        let err = ModkitError::Initialization {
            module: "db".into(),
            source: cause,
        };

        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("connection refused"));
        assert!(err.is_module_error());
    }
}
