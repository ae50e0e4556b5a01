use super::{EventMetadata, EventPriority, EventStatus};
use crate::error::{ModkitError, ModkitResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 事件：名称 + 载荷 + 元数据。
///
/// 构造后不可原地修改；`with_*` 消费自身并返回新值（需要保留原值时先 `clone`）。
/// 唯一的例外是转换中间件：拆解为 `into_parts` 后重组。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent<T>")]
pub struct Event<T> {
    name: String,
    payload: T,
    metadata: EventMetadata,
    /// 重放标记：重放的事件不再次持久化，不参与序列化
    #[serde(skip)]
    replayed: bool,
}

/// 反序列化的中间形态，经 `with_parts` 校验名称
#[derive(Deserialize)]
struct RawEvent<T> {
    name: String,
    payload: T,
    metadata: EventMetadata,
}

impl<T> TryFrom<RawEvent<T>> for Event<T> {
    type Error = ModkitError;

    fn try_from(raw: RawEvent<T>) -> ModkitResult<Self> {
        Self::with_parts(raw.name, raw.payload, raw.metadata)
    }
}

impl<T> Event<T> {
    pub fn new(name: impl Into<String>, payload: T) -> ModkitResult<Self> {
        Self::with_parts(name, payload, EventMetadata::default())
    }

    pub fn with_parts(
        name: impl Into<String>,
        payload: T,
        metadata: EventMetadata,
    ) -> ModkitResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModkitError::event("event name must not be empty"));
        }

        Ok(Self {
            name,
            payload,
            metadata,
            replayed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    pub fn priority(&self) -> EventPriority {
        self.metadata.priority()
    }

    pub fn status(&self) -> EventStatus {
        self.metadata.status()
    }

    pub fn is_replayed(&self) -> bool {
        self.replayed
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    pub fn into_parts(self) -> (String, T, EventMetadata) {
        (self.name, self.payload, self.metadata)
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.metadata.set_priority(priority);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.set_source(source);
        self
    }

    pub fn with_causation_id(mut self, causation_id: impl Into<String>) -> Self {
        self.metadata.set_causation_id(causation_id);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.add_tag(tag);
        self
    }

    pub fn with_retry_policy(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.metadata.pin_retry_policy(max_retries, retry_delay);
        self
    }

    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// 以本事件为因派生新事件：沿用关联 ID，因果 ID 指向本事件
    pub fn derive<U>(&self, name: impl Into<String>, payload: U) -> ModkitResult<Event<U>> {
        let metadata = EventMetadata::builder()
            .correlation_id(self.metadata.correlation_id())
            .causation_id(self.metadata.correlation_id())
            .priority(self.metadata.priority())
            .maybe_source(self.metadata.source())
            .build();
        Event::with_parts(name, payload, metadata)
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut EventMetadata {
        &mut self.metadata
    }

    pub(crate) fn mark_replayed(&mut self) {
        self.replayed = true;
        self.metadata.reset_for_replay();
    }

    /// 转换中间件重组事件，保留重放标记
    pub(crate) fn restore(
        name: String,
        payload: T,
        metadata: EventMetadata,
        replayed: bool,
    ) -> Self {
        Self {
            name,
            payload,
            metadata,
            replayed,
        }
    }
}
