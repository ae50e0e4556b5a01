//! 事件存储抽象（EventStore）
//!
//! 后端实现写入、批量写入、按条件读取与统计；
//! `initialize` / `cleanup` 默认为空操作。
//!
use super::EventQuery;
use crate::error::ModkitResult;
use crate::eventing::Event;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[async_trait]
pub trait EventStore<T>: Send + Sync {
    /// 后端名称
    fn backend(&self) -> &str;

    async fn initialize(&self) -> ModkitResult<()> {
        Ok(())
    }

    async fn cleanup(&self) -> ModkitResult<()> {
        Ok(())
    }

    async fn store(&self, event: &Event<T>) -> ModkitResult<()>;

    /// 批量写入，整体成功或返回第一个错误
    async fn store_batch(&self, events: &[Event<T>]) -> ModkitResult<()>;

    async fn load(&self, query: &EventQuery) -> ModkitResult<Vec<Event<T>>>;

    async fn get_stats(&self) -> ModkitResult<EventStoreStats>;
}

/// 存储统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventStoreStats {
    pub backend: String,
    pub total_events: usize,
    pub events: BTreeMap<String, usize>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    /// 读取时跳过的损坏记录数
    pub skipped_records: u64,
}

impl EventStoreStats {
    pub(crate) fn collect<'a, T: 'a>(
        backend: &str,
        events: impl IntoIterator<Item = &'a Event<T>>,
    ) -> Self {
        let mut stats = Self {
            backend: backend.to_string(),
            ..Self::default()
        };

        for event in events {
            let at = *event.metadata().timestamp();
            stats.total_events += 1;
            *stats.events.entry(event.name().to_string()).or_default() += 1;
            stats.oldest = Some(stats.oldest.map_or(at, |o| o.min(at)));
            stats.newest = Some(stats.newest.map_or(at, |n| n.max(at)));
        }

        stats
    }
}
