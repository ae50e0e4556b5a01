//! 事件管理器（EventManager）
//!
//! 管线：`emit` → 有界队列 → 批处理循环 → 中间件链 → 自动持久化 → 按优先级分发。
//! - 队列满时 `emit` 立即返回 `QueueFull`，已入队的事件不受影响；
//! - 单消费者循环：等待首个事件至多 `batch_timeout`，随后非阻塞地凑满 `batch_size`，按 FIFO 处理；
//! - 异步分发时每个处理器独立成任务并登记在在途集合，teardown 取消并等待全部任务；
//! - 处理器失败按 `ErrorHandlingPolicy` 处理；重试为 Retrying 状态 + 延迟后重新走 emit 入队。
//!
use super::policy::FailureDecision;
use super::{
    Event, EventConfig, EventFilter, EventHandler, EventManagerStats, EventPriority, EventStatus,
    EventSubscription, FailureStage, Middleware, MiddlewareChain, ProcessingFailure,
    SubscriptionId, SubscriptionRegistry,
};
use crate::error::{ModkitError, ModkitResult};
use crate::module::{Module, ModuleCore, ModuleExt};
use crate::persist::{EventQuery, PersistenceManager};
use crate::sync::lock;
use crate::validation::Validator;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const FAILURE_CHANNEL_CAPACITY: usize = 256;

/// 事件管理器；本身是一个模块，`initialize` 启动批处理循环，`cleanup` 停止并回收任务
pub struct EventManager<T> {
    inner: Arc<Shared<T>>,
}

struct Shared<T> {
    core: ModuleCore,
    config: EventConfig,
    registry: SubscriptionRegistry<T>,
    middleware: MiddlewareChain<T>,
    persistence: Mutex<Option<Arc<PersistenceManager<T>>>>,
    queue: Mutex<Option<mpsc::Sender<Event<T>>>>,
    processor: Mutex<Option<Processor>>,
    tasks: Mutex<TaskSet>,
    failures: broadcast::Sender<ProcessingFailure>,
    processed: AtomicU64,
    failed: AtomicU64,
    handler_failures: Mutex<BTreeMap<String, u64>>,
}

struct Processor {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// 在途任务集合：处理器调用与待执行的重试
#[derive(Default)]
struct TaskSet {
    open: bool,
    next_id: u64,
    handles: HashMap<u64, JoinHandle<()>>,
}

enum Verdict {
    Continue,
    Retrying,
    Fail(ModkitError),
}

impl<T> EventManager<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, config: EventConfig) -> ModkitResult<Self> {
        config.validate()?;
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);

        Ok(Self {
            inner: Arc::new(Shared {
                core: ModuleCore::named(name)?,
                registry: SubscriptionRegistry::new(config.max_handlers_per_event),
                middleware: MiddlewareChain::default(),
                config,
                persistence: Mutex::new(None),
                queue: Mutex::new(None),
                processor: Mutex::new(None),
                tasks: Mutex::new(TaskSet::default()),
                failures,
                processed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                handler_failures: Mutex::new(BTreeMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &EventConfig {
        &self.inner.config
    }

    /// 挂接持久化管理器，并登记为必需、非惰性的依赖
    pub fn with_persistence(&self, persistence: Arc<PersistenceManager<T>>) -> ModkitResult<()> {
        self.add_dependency("persistence", persistence.clone(), false, false)?;
        *lock(&self.inner.persistence) = Some(persistence);
        Ok(())
    }

    pub fn persistence(&self) -> Option<Arc<PersistenceManager<T>>> {
        self.inner.persistence()
    }

    pub fn subscribe(
        &self,
        event_name: &str,
        handler: Arc<dyn EventHandler<T>>,
        priority: EventPriority,
        filter: Option<EventFilter<T>>,
        validator: Option<Arc<dyn Validator<Event<T>>>>,
    ) -> ModkitResult<SubscriptionId> {
        if event_name.trim().is_empty() {
            return Err(ModkitError::event("event name must not be empty"));
        }

        let mut subscription = EventSubscription::new(handler, priority);
        if let Some(filter) = filter {
            subscription = subscription.with_filter(filter);
        }
        if let Some(validator) = validator {
            subscription = subscription.with_validator(validator);
        }

        let handler_name = subscription.handler().handler_name().to_string();
        let id = self.inner.registry.insert(event_name, subscription)?;
        debug!(
            module = %self.inner.core.name(),
            event = %event_name,
            handler = %handler_name,
            %priority,
            subscription = %id,
            "handler subscribed"
        );

        Ok(id)
    }

    /// 指定处理器时移除其第一个订阅，否则移除该事件名下全部订阅；返回移除数量
    pub fn unsubscribe(&self, event_name: &str, handler: Option<&Arc<dyn EventHandler<T>>>) -> usize {
        let removed = self.inner.registry.remove(event_name, handler);
        debug!(module = %self.inner.core.name(), event = %event_name, removed, "handlers unsubscribed");
        removed
    }

    pub fn unsubscribe_by_id(&self, id: SubscriptionId) -> bool {
        self.inner.registry.remove_by_id(id)
    }

    pub fn handler_count(&self, event_name: &str) -> usize {
        self.inner.registry.handler_count(event_name)
    }

    pub fn add_middleware(&self, middleware: Arc<dyn Middleware<T>>) {
        debug!(module = %self.inner.core.name(), middleware = %middleware.middleware_name(), "middleware added");
        self.inner.middleware.push(middleware);
    }

    pub fn remove_middleware(&self, name: &str) -> bool {
        self.inner.middleware.remove(name)
    }

    /// 入队；队列已满时立即返回 `QueueFull`
    pub fn emit(&self, event: Event<T>) -> ModkitResult<()> {
        self.inner.emit(event)
    }

    /// 直接处理一批事件（与后台循环相同的逐项流程）；处理完全部事件后返回第一个错误
    pub async fn process_batch(&self, events: Vec<Event<T>>) -> ModkitResult<()> {
        self.inner.core.ensure_initialized()?;
        self.inner.process_batch(events).await
    }

    /// 订阅未被策略吸收的处理失败
    pub fn failures(&self) -> broadcast::Receiver<ProcessingFailure> {
        self.inner.failures.subscribe()
    }

    /// 从存储读取事件并重放：未指定处理器时重新入队（等待队列空位），否则直接交给该处理器。
    /// 重放的事件不会再次持久化。返回重放数量。
    pub async fn replay(
        &self,
        query: &EventQuery,
        handler: Option<Arc<dyn EventHandler<T>>>,
    ) -> ModkitResult<usize> {
        let shared = &self.inner;
        shared.core.ensure_initialized()?;
        let persistence = shared
            .persistence()
            .ok_or_else(|| ModkitError::persistence("no persistence manager configured"))?;

        let events = persistence.load(query).await?;
        let total = events.len();
        for mut event in events {
            event.mark_replayed();
            match &handler {
                Some(handler) => {
                    handler
                        .handle(&event)
                        .await
                        .map_err(|err| ModkitError::HandlerFailed {
                            event: event.name().to_string(),
                            handler: handler.handler_name().to_string(),
                            retry_count: event.metadata().retry_count(),
                            reason: format!("{err:#}"),
                        })?;
                }
                None => shared.requeue(event).await?,
            }
        }

        info!(module = %shared.core.name(), replayed = total, direct = handler.is_some(), "events replayed");
        Ok(total)
    }

    pub fn stats(&self) -> EventManagerStats {
        let shared = &self.inner;
        let (queue_size, queue_full) = match lock(&shared.queue).as_ref() {
            Some(tx) => {
                let free = tx.capacity();
                (tx.max_capacity() - free, free == 0)
            }
            None => (0, false),
        };
        let persistence = shared.persistence();

        EventManagerStats {
            module: shared.core.stats(),
            event_count: shared.registry.event_count(),
            events: shared.registry.counts(),
            running_tasks: lock(&shared.tasks).handles.len(),
            middleware_count: shared.middleware.len(),
            persistence_enabled: persistence.is_some(),
            auto_persist: persistence.as_ref().is_some_and(|pm| pm.auto_persist()),
            queue_size,
            queue_full,
            processed_events: shared.processed.load(Ordering::Relaxed),
            failed_events: shared.failed.load(Ordering::Relaxed),
            handler_failures: lock(&shared.handler_failures).clone(),
        }
    }
}

#[async_trait]
impl<T> Module for EventManager<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn core(&self) -> &ModuleCore {
        &self.inner.core
    }

    async fn setup(&self) -> ModkitResult<()> {
        let shared = &self.inner;
        let (tx, rx) = mpsc::channel(shared.config.max_queue_size);
        let token = CancellationToken::new();

        lock(&shared.tasks).open = true;
        *lock(&shared.queue) = Some(tx);
        let handle = tokio::spawn(Arc::clone(shared).run_processor(rx, token.clone()));
        *lock(&shared.processor) = Some(Processor { token, handle });

        info!(
            module = %shared.core.name(),
            max_queue_size = shared.config.max_queue_size,
            batch_size = shared.config.batch_size,
            async_dispatch = shared.config.enable_async_dispatch,
            policy = %shared.config.error_handling_policy,
            "event processor started"
        );
        Ok(())
    }

    async fn teardown(&self) -> ModkitResult<()> {
        let shared = &self.inner;
        lock(&shared.queue).take();

        let processor = lock(&shared.processor).take();
        if let Some(Processor { token, handle }) = processor {
            token.cancel();
            join_quietly(handle, shared.core.name()).await;
        }

        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = lock(&shared.tasks);
            tasks.open = false;
            tasks.handles.drain().map(|(_, handle)| handle).collect()
        };
        let in_flight = handles.len();
        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            join_quietly(handle, shared.core.name()).await;
        }

        info!(module = %shared.core.name(), in_flight, "event processor stopped");
        Ok(())
    }
}

impl<T> Drop for EventManager<T> {
    fn drop(&mut self) {
        if let Some(processor) = lock(&self.inner.processor).as_ref() {
            processor.token.cancel();
        }
        let mut tasks = lock(&self.inner.tasks);
        tasks.open = false;
        for handle in tasks.handles.values() {
            handle.abort();
        }
    }
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn persistence(&self) -> Option<Arc<PersistenceManager<T>>> {
        lock(&self.persistence).clone()
    }

    fn sender(&self) -> ModkitResult<mpsc::Sender<Event<T>>> {
        lock(&self.queue).clone().ok_or_else(|| ModkitError::State {
            module: self.core.name().to_string(),
            state: self.core.state(),
        })
    }

    fn emit(&self, mut event: Event<T>) -> ModkitResult<()> {
        self.core.ensure_initialized()?;

        let meta = event.metadata_mut();
        meta.apply_retry_defaults(self.config.max_retries, self.config.retry_delay);
        if !matches!(meta.status(), EventStatus::Pending | EventStatus::Retrying) {
            meta.reset_for_replay();
        }

        let name = event.name().to_string();
        match self.sender()?.try_send(event) {
            Ok(()) => {
                debug!(module = %self.core.name(), event = %name, "event queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                warn!(module = %self.core.name(), event = %name, capacity = self.config.max_queue_size, "event queue full");
                Err(ModkitError::QueueFull {
                    capacity: self.config.max_queue_size,
                })
            }
            Err(TrySendError::Closed(_)) => Err(ModkitError::State {
                module: self.core.name().to_string(),
                state: self.core.state(),
            }),
        }
    }

    /// 重放入队：等待队列空位而非立即失败
    async fn requeue(&self, event: Event<T>) -> ModkitResult<()> {
        self.sender()?
            .send(event)
            .await
            .map_err(|_| ModkitError::State {
                module: self.core.name().to_string(),
                state: self.core.state(),
            })
    }

    async fn run_processor(self: Arc<Self>, mut rx: mpsc::Receiver<Event<T>>, token: CancellationToken) {
        let batch_size = self.config.batch_size;
        let batch_timeout = self.config.batch_timeout;
        debug!(module = %self.core.name(), batch_size, ?batch_timeout, "event processor loop running");

        loop {
            let first = tokio::select! {
                _ = token.cancelled() => break,
                received = time::timeout(batch_timeout, rx.recv()) => match received {
                    Ok(Some(event)) => event,
                    Ok(None) => break,
                    // 空闲
                    Err(_) => continue,
                },
            };

            let mut batch = Vec::with_capacity(batch_size);
            batch.push(first);
            while batch.len() < batch_size {
                match rx.try_recv() {
                    Ok(event) => batch.push(event),
                    Err(_) => break,
                }
            }

            let size = batch.len();
            tokio::select! {
                _ = token.cancelled() => break,
                result = self.process_batch(batch) => {
                    if let Err(err) = result {
                        debug!(module = %self.core.name(), size, error = %err, "batch finished with errors");
                    }
                }
            }
        }

        debug!(module = %self.core.name(), "event processor loop exited");
    }

    async fn process_batch(self: &Arc<Self>, events: Vec<Event<T>>) -> ModkitResult<()> {
        let mut first_err = None;
        for event in events {
            if let Err(err) = self.process_event(event).await {
                match first_err {
                    None => first_err = Some(err),
                    Some(_) => debug!(module = %self.core.name(), error = %err, "additional failure in batch"),
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn process_event(self: &Arc<Self>, mut event: Event<T>) -> ModkitResult<()> {
        let name = event.name().to_string();
        let correlation_id = event.metadata().correlation_id().to_string();
        let retry_count = event.metadata().retry_count();
        if !event.metadata_mut().advance(EventStatus::Processing) {
            debug!(module = %self.core.name(), event = %name, status = %event.status(), "event not in a processable status");
        }

        let mut event = match self.middleware.run(event).await {
            Ok(event) => event,
            Err(err) => {
                return Err(self.report(&name, &correlation_id, FailureStage::Middleware, None, retry_count, err));
            }
        };

        if let Some(persistence) = self.persistence().filter(|pm| pm.auto_persist()) {
            // 重放与重试不重复写入
            if !event.is_replayed() && retry_count == 0 {
                if let Err(err) = persistence.persist(&event).await {
                    event.metadata_mut().advance(EventStatus::Failed);
                    return Err(self.report(
                        event.name(),
                        &correlation_id,
                        FailureStage::Persistence,
                        None,
                        retry_count,
                        err,
                    ));
                }
            }
        }

        let subscriptions = self.registry.snapshot(event.name());
        if subscriptions.is_empty() {
            debug!(module = %self.core.name(), event = %event.name(), "no subscribers");
            event.metadata_mut().advance(EventStatus::Completed);
            self.processed.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        if self.config.enable_async_dispatch {
            self.dispatch_async(event, subscriptions);
            Ok(())
        } else {
            self.dispatch_sync(event, subscriptions).await
        }
    }

    async fn dispatch_sync(
        self: &Arc<Self>,
        mut event: Event<T>,
        subscriptions: Vec<EventSubscription<T>>,
    ) -> ModkitResult<()> {
        for subscription in subscriptions {
            if !subscription.accepts(&event) {
                continue;
            }

            let handler = subscription.handler();
            if let Err(err) = handler.handle(&event).await {
                match self.on_handler_failure(&event, handler.handler_name(), err, None) {
                    Verdict::Continue => {}
                    Verdict::Retrying => return Ok(()),
                    Verdict::Fail(err) => {
                        event.metadata_mut().advance(EventStatus::Failed);
                        return Err(err);
                    }
                }
            }
        }

        event.metadata_mut().advance(EventStatus::Completed);
        self.processed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn dispatch_async(self: &Arc<Self>, event: Event<T>, subscriptions: Vec<EventSubscription<T>>) {
        let name = event.name().to_string();
        let event = Arc::new(event);
        // 同一次尝试至多安排一次重试
        let retry_claimed = Arc::new(AtomicBool::new(false));
        let mut spawned = 0usize;

        for subscription in subscriptions {
            if !subscription.accepts(&event) {
                continue;
            }

            let shared = Arc::clone(self);
            let task_event = Arc::clone(&event);
            let task_claim = Arc::clone(&retry_claimed);
            let handler = subscription.handler().clone();
            let accepted = self.spawn_tracked(async move {
                if let Err(err) = handler.handle(&task_event).await {
                    let claim = Some(&*task_claim);
                    let verdict = shared.on_handler_failure(&task_event, handler.handler_name(), err, claim);
                    if let Verdict::Fail(err) = verdict {
                        debug!(module = %shared.core.name(), error = %err, "async handler failure reported");
                    }
                }
            });
            if !accepted {
                warn!(module = %self.core.name(), event = %name, "manager is stopping, remaining handlers not scheduled");
                break;
            }
            spawned += 1;
        }

        self.processed.fetch_add(1, Ordering::Relaxed);
        debug!(module = %self.core.name(), event = %name, spawned, "event dispatched");
    }

    /// `retry_claim` 由同一次尝试的并发任务共享：只有首个失败者安排重试，其余视为继续
    fn on_handler_failure(
        self: &Arc<Self>,
        event: &Event<T>,
        handler: &str,
        err: anyhow::Error,
        retry_claim: Option<&AtomicBool>,
    ) -> Verdict {
        let meta = event.metadata();
        let retry_count = meta.retry_count();
        *lock(&self.handler_failures)
            .entry(handler.to_string())
            .or_default() += 1;
        warn!(
            module = %self.core.name(),
            event = %event.name(),
            handler = %handler,
            retry_count,
            error = %err,
            "event handler failed"
        );

        let handler_failed = || ModkitError::HandlerFailed {
            event: event.name().to_string(),
            handler: handler.to_string(),
            retry_count,
            reason: format!("{err:#}"),
        };

        match self.config.error_handling_policy.decide(meta) {
            FailureDecision::Continue => Verdict::Continue,
            FailureDecision::Stop => Verdict::Fail(self.report(
                event.name(),
                meta.correlation_id(),
                FailureStage::Handler,
                Some(handler),
                retry_count,
                handler_failed(),
            )),
            FailureDecision::Exhausted => {
                error!(module = %self.core.name(), event = %event.name(), handler = %handler, retry_count, "retries exhausted");
                Verdict::Fail(self.report(
                    event.name(),
                    meta.correlation_id(),
                    FailureStage::Handler,
                    Some(handler),
                    retry_count,
                    handler_failed(),
                ))
            }
            FailureDecision::Retry { .. }
                if retry_claim.is_some_and(|claim| claim.swap(true, Ordering::AcqRel)) =>
            {
                debug!(module = %self.core.name(), event = %event.name(), handler = %handler, "retry already scheduled for this attempt");
                Verdict::Continue
            }
            FailureDecision::Retry { delay } => {
                let mut retry = event.clone();
                let retry_meta = retry.metadata_mut();
                retry_meta.record_error(format!("{handler}: {err:#}"));
                retry_meta.increment_retry();
                retry_meta.advance(EventStatus::Retrying);
                info!(
                    module = %self.core.name(),
                    event = %event.name(),
                    attempt = retry_count + 1,
                    ?delay,
                    "scheduling event retry"
                );
                self.schedule_retry(retry, delay);
                Verdict::Retrying
            }
        }
    }

    fn schedule_retry(self: &Arc<Self>, event: Event<T>, delay: Duration) {
        let name = event.name().to_string();
        let correlation_id = event.metadata().correlation_id().to_string();
        let retry_count = event.metadata().retry_count();

        let shared = Arc::clone(self);
        let (task_name, task_cid) = (name.clone(), correlation_id.clone());
        let accepted = self.spawn_tracked(async move {
            time::sleep(delay).await;
            if let Err(err) = shared.emit(event) {
                shared.report(&task_name, &task_cid, FailureStage::Requeue, None, retry_count, err);
            }
        });

        if !accepted {
            self.report(
                &name,
                &correlation_id,
                FailureStage::Requeue,
                None,
                retry_count,
                ModkitError::event("manager is stopping, retry dropped"),
            );
        }
    }

    /// 登记在途任务；集合已关闭（teardown 中）时返回 false 且不启动
    fn spawn_tracked<F>(self: &Arc<Self>, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = lock(&self.tasks);
        if !tasks.open {
            return false;
        }

        let id = tasks.next_id;
        tasks.next_id += 1;
        let shared = Arc::clone(self);
        // 持锁插入：任务即使立即完成，也会在插入之后才移除自身
        let handle = tokio::spawn(async move {
            future.await;
            lock(&shared.tasks).handles.remove(&id);
        });
        tasks.handles.insert(id, handle);
        true
    }

    /// 记录并广播失败，原样交还错误
    fn report(
        &self,
        event_name: &str,
        correlation_id: &str,
        stage: FailureStage,
        handler: Option<&str>,
        retry_count: u32,
        err: ModkitError,
    ) -> ModkitError {
        self.failed.fetch_add(1, Ordering::Relaxed);
        error!(
            module = %self.core.name(),
            event = %event_name,
            correlation_id = %correlation_id,
            ?stage,
            error = %err,
            "event processing failed"
        );

        // 无订阅者时发送失败，忽略
        let _ = self.failures.send(ProcessingFailure {
            event_name: event_name.to_string(),
            correlation_id: correlation_id.to_string(),
            stage,
            handler: handler.map(str::to_string),
            retry_count,
            message: err.to_string(),
        });
        err
    }
}

async fn join_quietly(handle: JoinHandle<()>, module: &str) {
    if let Err(err) = handle.await {
        if !err.is_cancelled() {
            warn!(module = %module, error = %err, "event task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventing::handler_fn;
    use crate::module::ModuleState;

    fn noop() -> Arc<dyn EventHandler<u32>> {
        handler_fn("noop", |_e: Event<u32>| async { anyhow::Ok(()) })
    }

    #[tokio::test]
    async fn emit_requires_initialization() {
        let manager = EventManager::<u32>::new("events", EventConfig::default()).unwrap();
        let err = manager.emit(Event::new("a", 1).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            ModkitError::State {
                state: ModuleState::Created,
                ..
            }
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EventConfig {
            batch_size: 0,
            ..EventConfig::default()
        };
        assert!(EventManager::<u32>::new("events", config).is_err());
    }

    #[tokio::test]
    async fn stats_reflect_subscriptions_and_lifecycle() {
        let manager = EventManager::<u32>::new("events", EventConfig::default()).unwrap();
        manager
            .subscribe("a", noop(), EventPriority::Normal, None, None)
            .unwrap();
        manager
            .subscribe("a", noop(), EventPriority::High, None, None)
            .unwrap();
        let id = manager
            .subscribe("b", noop(), EventPriority::Low, None, None)
            .unwrap();
        assert!(manager.subscribe(" ", noop(), EventPriority::Low, None, None).is_err());

        let stats = manager.stats();
        assert_eq!(stats.event_count, 2);
        assert_eq!(stats.events.get("a"), Some(&2));
        assert!(!stats.persistence_enabled);

        assert!(manager.unsubscribe_by_id(id));
        assert_eq!(manager.stats().event_count, 1);

        manager.initialize().await.unwrap();
        let stats = manager.stats();
        assert!(stats.module.initialized);
        assert_eq!(stats.queue_size, 0);
        assert!(!stats.queue_full);

        manager.cleanup().await.unwrap();
        assert_eq!(manager.state(), ModuleState::Created);
        assert_eq!(manager.stats().running_tasks, 0);
    }

    #[tokio::test]
    async fn reinitialize_after_cleanup_restarts_processor() {
        let manager = EventManager::<u32>::new("events", EventConfig::default()).unwrap();
        manager.initialize().await.unwrap();
        manager.cleanup().await.unwrap();
        assert!(manager.emit(Event::new("a", 1).unwrap()).is_err());

        manager.initialize().await.unwrap();
        manager.emit(Event::new("a", 1).unwrap()).unwrap();
        manager.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn replay_without_persistence_fails() {
        let manager = EventManager::<u32>::new("events", EventConfig::default()).unwrap();
        manager.initialize().await.unwrap();
        let err = manager.replay(&EventQuery::all(), None).await.unwrap_err();
        assert!(err.is_persistence_error());
        manager.cleanup().await.unwrap();
    }
}
