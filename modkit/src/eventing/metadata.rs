use super::{EventPriority, EventStatus};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// 事件元数据：追踪信息、优先级、重试计数与处理状态
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[builder(default = Utc::now())]
    timestamp: DateTime<Utc>,
    #[builder(into)]
    source: Option<String>,
    /// 关联 ID：同一事件的多次重试共享
    #[builder(into, default = uuid::Uuid::new_v4().to_string())]
    correlation_id: String,
    /// 因果 ID：触发本事件的上游事件
    #[builder(into)]
    causation_id: Option<String>,
    #[builder(default)]
    priority: EventPriority,
    #[builder(default)]
    retry_count: u32,
    #[builder(default = DEFAULT_MAX_RETRIES)]
    max_retries: u32,
    #[builder(default = DEFAULT_RETRY_DELAY)]
    #[serde(with = "crate::serde_secs")]
    retry_delay: Duration,
    #[builder(default)]
    status: EventStatus,
    #[builder(default)]
    error_count: u32,
    #[builder(into)]
    last_error: Option<String>,
    #[builder(default)]
    #[serde(default)]
    tags: BTreeSet<String>,
    /// 为 true 时表示重试参数由事件自身指定，管理器不再以配置覆盖
    #[builder(default)]
    #[serde(default)]
    retry_pinned: bool,
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EventMetadata {
    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn priority(&self) -> EventPriority {
        self.priority
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn retry_pinned(&self) -> bool {
        self.retry_pinned
    }

    /// 是否仍有重试余量
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = Some(source.into());
    }

    pub fn set_causation_id(&mut self, causation_id: impl Into<String>) {
        self.causation_id = Some(causation_id.into());
    }

    pub fn set_priority(&mut self, priority: EventPriority) {
        self.priority = priority;
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    /// 由事件自身指定重试参数（之后不再被管理器配置覆盖）
    pub fn pin_retry_policy(&mut self, max_retries: u32, retry_delay: Duration) {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self.retry_pinned = true;
    }

    /// 以管理器配置填充重试参数；已 pin 的事件保持不变
    pub(crate) fn apply_retry_defaults(&mut self, max_retries: u32, retry_delay: Duration) {
        if !self.retry_pinned {
            self.max_retries = max_retries;
            self.retry_delay = retry_delay;
        }
    }

    /// 按状态机推进；非法迁移返回 false 且不修改
    pub(crate) fn advance(&mut self, next: EventStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    pub(crate) fn record_error(&mut self, error: impl Into<String>) {
        self.error_count = self.error_count.saturating_add(1);
        self.last_error = Some(error.into());
    }

    pub(crate) fn increment_retry(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }

    /// 重放：作为新的一次处理，从 Pending 开始
    pub(crate) fn reset_for_replay(&mut self) {
        self.status = EventStatus::Pending;
    }
}
