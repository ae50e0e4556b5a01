use super::{EventQuery, EventStore, EventStoreStats};
use crate::error::ModkitResult;
use crate::eventing::Event;
use crate::sync::lock;
use async_trait::async_trait;
use std::sync::Mutex;

/// 进程内存储：按写入顺序保存事件拷贝，进程退出即丢失
pub struct MemoryEventStore<T> {
    events: Mutex<Vec<Event<T>>>,
}

impl<T> Default for MemoryEventStore<T> {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<T> MemoryEventStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.events).is_empty()
    }
}

#[async_trait]
impl<T> EventStore<T> for MemoryEventStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn backend(&self) -> &str {
        "memory"
    }

    async fn store(&self, event: &Event<T>) -> ModkitResult<()> {
        lock(&self.events).push(event.clone());
        Ok(())
    }

    async fn store_batch(&self, events: &[Event<T>]) -> ModkitResult<()> {
        lock(&self.events).extend(events.iter().cloned());
        Ok(())
    }

    async fn load(&self, query: &EventQuery) -> ModkitResult<Vec<Event<T>>> {
        let events = lock(&self.events);
        Ok(query.apply(events.iter().cloned()))
    }

    async fn get_stats(&self) -> ModkitResult<EventStoreStats> {
        let events = lock(&self.events);
        Ok(EventStoreStats::collect(self.backend(), events.iter()))
    }
}
