//! 持久化管理器（PersistenceManager）
//!
//! 作为模块参与生命周期：initialize/cleanup 时分别初始化与释放底层存储。
//! 存储失败统一以持久化错误向上返回。
//!
use super::{EventQuery, EventStore, EventStoreStats};
use crate::error::{ModkitError, ModkitResult};
use crate::eventing::Event;
use crate::module::{Module, ModuleCore};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

pub struct PersistenceManager<T> {
    core: ModuleCore,
    store: Arc<dyn EventStore<T>>,
    auto_persist: AtomicBool,
    persisted: AtomicU64,
}

impl<T> PersistenceManager<T>
where
    T: Send + Sync + 'static,
{
    /// `name` 是依赖图中的模块名，同一模块树内应唯一
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn EventStore<T>>,
        auto_persist: bool,
    ) -> ModkitResult<Self> {
        Ok(Self {
            core: ModuleCore::named(name)?,
            store,
            auto_persist: AtomicBool::new(auto_persist),
            persisted: AtomicU64::new(0),
        })
    }

    pub fn auto_persist(&self) -> bool {
        self.auto_persist.load(Ordering::Relaxed)
    }

    pub fn set_auto_persist(&self, enabled: bool) {
        self.auto_persist.store(enabled, Ordering::Relaxed);
    }

    /// 本实例写入的事件数
    pub fn persisted_count(&self) -> u64 {
        self.persisted.load(Ordering::Relaxed)
    }

    pub fn store(&self) -> &Arc<dyn EventStore<T>> {
        &self.store
    }

    pub async fn persist(&self, event: &Event<T>) -> ModkitResult<()> {
        self.core.ensure_initialized()?;
        self.store.store(event).await.map_err(as_persistence)?;
        self.persisted.fetch_add(1, Ordering::Relaxed);
        debug!(event = %event.name(), correlation_id = %event.metadata().correlation_id(), "event persisted");
        Ok(())
    }

    pub async fn persist_batch(&self, events: &[Event<T>]) -> ModkitResult<()> {
        self.core.ensure_initialized()?;
        self.store.store_batch(events).await.map_err(as_persistence)?;
        self.persisted
            .fetch_add(events.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    pub async fn load(&self, query: &EventQuery) -> ModkitResult<Vec<Event<T>>> {
        self.core.ensure_initialized()?;
        self.store.load(query).await.map_err(as_persistence)
    }

    pub async fn store_stats(&self) -> ModkitResult<EventStoreStats> {
        self.store.get_stats().await.map_err(as_persistence)
    }
}

fn as_persistence(err: ModkitError) -> ModkitError {
    if err.is_persistence_error() {
        err
    } else {
        ModkitError::persistence(err.to_string())
    }
}

#[async_trait]
impl<T> Module for PersistenceManager<T>
where
    T: Send + Sync + 'static,
{
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    async fn setup(&self) -> ModkitResult<()> {
        self.store.initialize().await.map_err(as_persistence)
    }

    async fn teardown(&self) -> ModkitResult<()> {
        self.store.cleanup().await.map_err(as_persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleExt, ModuleState};
    use crate::persist::MemoryEventStore;

    #[tokio::test]
    async fn requires_initialization() {
        let pm = PersistenceManager::new("events-store", Arc::new(MemoryEventStore::<i32>::new()), true).unwrap();
        let err = pm.persist(&Event::new("a", 1).unwrap()).await.unwrap_err();
        assert!(matches!(
            err,
            ModkitError::State {
                state: ModuleState::Created,
                ..
            }
        ));

        assert!(PersistenceManager::new("", Arc::new(MemoryEventStore::<i32>::new()), true).is_err());

        pm.initialize().await.unwrap();
        pm.persist(&Event::new("a", 1).unwrap()).await.unwrap();
        assert_eq!(pm.persisted_count(), 1);
        assert_eq!(pm.load(&EventQuery::all()).await.unwrap().len(), 1);

        pm.cleanup().await.unwrap();
        assert_eq!(pm.state(), ModuleState::Created);
    }
}
