//! 失败处理决策
//!
//! 纯函数：根据管理器策略与事件当前的重试计数，决定处理器失败后的下一步。
//! 执行（记录、休眠、重新入队）由管理器负责。
//!
use super::{ErrorHandlingPolicy, EventMetadata};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    /// 忽略，继续下一个订阅
    Continue,
    /// 中止本事件剩余分发并向上返回错误
    Stop,
    /// 等待 `delay` 后重新入队
    Retry { delay: Duration },
    /// 重试余量已耗尽
    Exhausted,
}

impl ErrorHandlingPolicy {
    pub fn decide(&self, metadata: &EventMetadata) -> FailureDecision {
        match self {
            ErrorHandlingPolicy::Continue => FailureDecision::Continue,
            ErrorHandlingPolicy::Stop => FailureDecision::Stop,
            ErrorHandlingPolicy::Retry if metadata.can_retry() => FailureDecision::Retry {
                delay: metadata.retry_delay(),
            },
            ErrorHandlingPolicy::Retry => FailureDecision::Exhausted,
        }
    }
}
