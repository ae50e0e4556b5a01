//! 事件持久化
//!
//! - `EventSerializer`：事件 ⇄ 单行字节；
//! - `EventStore`：存储后端抽象，内置内存与行式文件两种实现；
//! - `PersistenceManager`：以模块形式挂接到事件管理器，负责自动持久化与重放读取。
//!
mod file_store;
mod manager;
mod memory_store;
mod query;
mod serializer;
mod store;

pub use file_store::FileEventStore;
pub use manager::PersistenceManager;
pub use memory_store::MemoryEventStore;
pub use query::EventQuery;
pub use serializer::{EventSerializer, JsonEventSerializer};
pub use store::{EventStore, EventStoreStats};
