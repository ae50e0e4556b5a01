//! 文件存储（FileEventStore）
//!
//! 追加写入的行式文件：每行一个序列化事件。
//! - 写入在单个异步锁内完成，批量写入合并为一次 `write_all`；
//! - 读取时逐行反序列化，无法解析的行记录告警后跳过；
//! - 文件不存在视为空存储。
//!
use super::{EventQuery, EventSerializer, EventStore, EventStoreStats, JsonEventSerializer};
use crate::error::{ModkitError, ModkitResult};
use crate::eventing::Event;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct FileEventStore<T> {
    path: PathBuf,
    serializer: Arc<dyn EventSerializer<T>>,
    write_lock: Mutex<()>,
    skipped: AtomicU64,
}

impl<T> FileEventStore<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// 使用 JSON 行格式
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_serializer(path, Arc::new(JsonEventSerializer))
    }
}

impl<T> FileEventStore<T> {
    pub fn with_serializer(
        path: impl Into<PathBuf>,
        serializer: Arc<dyn EventSerializer<T>>,
    ) -> Self {
        Self {
            path: path.into(),
            serializer,
            write_lock: Mutex::new(()),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode_line(&self, event: &Event<T>, out: &mut Vec<u8>) -> ModkitResult<()> {
        let bytes = self.serializer.serialize(event)?;
        if bytes.contains(&b'\n') {
            return Err(ModkitError::persistence(format!(
                "{} serializer produced a multi-line record for event {}",
                self.serializer.format(),
                event.name()
            )));
        }
        out.extend_from_slice(&bytes);
        out.push(b'\n');
        Ok(())
    }

    async fn append(&self, buf: &[u8]) -> ModkitResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buf).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_all(&self) -> ModkitResult<Vec<Event<T>>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut events = Vec::new();
        for (idx, line) in raw.split(|b| *b == b'\n').enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match self.serializer.deserialize(line) {
                Ok(event) => events.push(event),
                Err(err) => {
                    self.skipped.fetch_add(1, Ordering::Relaxed);
                    warn!(path = %self.path.display(), line = idx + 1, error = %err, "skipping corrupt event record");
                }
            }
        }

        Ok(events)
    }
}

#[async_trait]
impl<T> EventStore<T> for FileEventStore<T>
where
    T: Send + Sync + 'static,
{
    fn backend(&self) -> &str {
        "file"
    }

    async fn initialize(&self) -> ModkitResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        debug!(path = %self.path.display(), "file event store ready");
        Ok(())
    }

    async fn store(&self, event: &Event<T>) -> ModkitResult<()> {
        let mut buf = Vec::new();
        self.encode_line(event, &mut buf)?;
        self.append(&buf).await
    }

    async fn store_batch(&self, events: &[Event<T>]) -> ModkitResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        let mut buf = Vec::new();
        for event in events {
            self.encode_line(event, &mut buf)?;
        }
        self.append(&buf).await
    }

    async fn load(&self, query: &EventQuery) -> ModkitResult<Vec<Event<T>>> {
        Ok(query.apply(self.read_all().await?))
    }

    async fn get_stats(&self) -> ModkitResult<EventStoreStats> {
        let events = self.read_all().await?;
        let mut stats = EventStoreStats::collect(self.backend(), events.iter());
        stats.skipped_records = self.skipped.load(Ordering::Relaxed);
        Ok(stats)
    }
}
