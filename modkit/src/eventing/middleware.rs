//! 中间件链（MiddlewareChain）
//!
//! 事件在分发前依次经过各中间件；任一中间件失败即中止该事件的处理，
//! 并以 `Middleware` 错误上报（不参与重试）。内置三类：
//! - `ValidationMiddleware`：校验结果为 Critical 级无效时拒绝；
//! - `TransformMiddleware`：重写名称、载荷或元数据；
//! - `LoggingMiddleware`：仅记录日志，从不拒绝。
//!
use super::{Event, EventMetadata};
use crate::error::{ModkitError, ModkitResult};
use crate::sync::lock;
use crate::validation::Validator;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::Level;

#[async_trait]
pub trait Middleware<T>: Send + Sync {
    fn middleware_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 处理事件并交还（可能已被改写）；返回错误即中止
    async fn process(&self, event: Event<T>) -> ModkitResult<Event<T>>;
}

/// 有序中间件列表
pub struct MiddlewareChain<T> {
    items: Mutex<Vec<Arc<dyn Middleware<T>>>>,
}

impl<T> Default for MiddlewareChain<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Send + 'static> MiddlewareChain<T> {
    pub fn push(&self, middleware: Arc<dyn Middleware<T>>) {
        lock(&self.items).push(middleware);
    }

    /// 按名称移除，返回是否存在
    pub fn remove(&self, name: &str) -> bool {
        let mut items = lock(&self.items);
        let before = items.len();
        items.retain(|m| m.middleware_name() != name);
        items.len() != before
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }

    /// 依次执行；非 `Middleware` 类错误统一包装为 `Middleware` 错误
    pub async fn run(&self, mut event: Event<T>) -> ModkitResult<Event<T>> {
        let items = lock(&self.items).clone();
        for middleware in items {
            event = middleware.process(event).await.map_err(|err| match err {
                err @ ModkitError::Middleware { .. } => err,
                other => ModkitError::middleware(middleware.middleware_name(), other.to_string()),
            })?;
        }
        Ok(event)
    }
}

/// 校验中间件：仅 Critical 级无效结果拒绝事件，其余级别记录告警后放行
pub struct ValidationMiddleware<T> {
    validator: Arc<dyn Validator<Event<T>>>,
}

impl<T> ValidationMiddleware<T> {
    pub fn new(validator: Arc<dyn Validator<Event<T>>>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Middleware<T> for ValidationMiddleware<T> {
    fn middleware_name(&self) -> &str {
        "validation"
    }

    async fn process(&self, event: Event<T>) -> ModkitResult<Event<T>> {
        let result = self.validator.validate(&event);
        if result.is_critical() {
            return Err(ModkitError::middleware(
                self.middleware_name(),
                format!(
                    "event {} rejected: {}",
                    event.name(),
                    result.message().unwrap_or("critical validation failure")
                ),
            ));
        }
        if !result.is_valid() {
            tracing::warn!(
                event = %event.name(),
                level = %result.level(),
                message = result.message().unwrap_or_default(),
                "event failed non-critical validation"
            );
        }
        Ok(event)
    }
}

type NameFn = dyn Fn(&str) -> String + Send + Sync;
type PayloadFn<T> = dyn Fn(T) -> T + Send + Sync;
type MetadataFn = dyn Fn(&mut EventMetadata) + Send + Sync;

/// 转换中间件：可分别改写名称、载荷与元数据
pub struct TransformMiddleware<T> {
    name: String,
    rename: Option<Box<NameFn>>,
    payload: Option<Box<PayloadFn<T>>>,
    metadata: Option<Box<MetadataFn>>,
}

impl<T> TransformMiddleware<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rename: None,
            payload: None,
            metadata: None,
        }
    }

    pub fn rename(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.rename = Some(Box::new(f));
        self
    }

    pub fn map_payload(mut self, f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        self.payload = Some(Box::new(f));
        self
    }

    pub fn map_metadata(mut self, f: impl Fn(&mut EventMetadata) + Send + Sync + 'static) -> Self {
        self.metadata = Some(Box::new(f));
        self
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Middleware<T> for TransformMiddleware<T> {
    fn middleware_name(&self) -> &str {
        &self.name
    }

    async fn process(&self, event: Event<T>) -> ModkitResult<Event<T>> {
        let replayed = event.is_replayed();
        let (old_name, payload, mut metadata) = event.into_parts();
        let name = match &self.rename {
            Some(f) => f(&old_name),
            None => old_name,
        };
        if name.trim().is_empty() {
            return Err(ModkitError::middleware(
                &self.name,
                "transformed event name is empty",
            ));
        }
        let payload = match &self.payload {
            Some(f) => f(payload),
            None => payload,
        };
        if let Some(f) = &self.metadata {
            f(&mut metadata);
        }

        Ok(Event::restore(name, payload, metadata, replayed))
    }
}

/// 日志中间件：按配置级别输出事件摘要
pub struct LoggingMiddleware {
    level: Level,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingMiddleware {
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Middleware<T> for LoggingMiddleware {
    fn middleware_name(&self) -> &str {
        "logging"
    }

    async fn process(&self, event: Event<T>) -> ModkitResult<Event<T>> {
        let meta = event.metadata();
        macro_rules! emit {
            ($lvl:expr) => {
                tracing::event!(
                    $lvl,
                    event = %event.name(),
                    correlation_id = %meta.correlation_id(),
                    priority = %meta.priority(),
                    retry_count = meta.retry_count(),
                    "event passing through pipeline"
                )
            };
        }

        if self.level == Level::ERROR {
            emit!(Level::ERROR);
        } else if self.level == Level::WARN {
            emit!(Level::WARN);
        } else if self.level == Level::INFO {
            emit!(Level::INFO);
        } else if self.level == Level::DEBUG {
            emit!(Level::DEBUG);
        } else {
            emit!(Level::TRACE);
        }

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventing::EventPriority;
    use crate::validation::{ValidationLevel, ValidationResult};

    struct Reject;

    #[async_trait]
    impl Middleware<i32> for Reject {
        async fn process(&self, _event: Event<i32>) -> ModkitResult<Event<i32>> {
            Err(ModkitError::event("nope"))
        }
    }

    fn level_validator(level: ValidationLevel) -> Arc<dyn Validator<Event<i32>>> {
        Arc::new(move |e: &Event<i32>| {
            if *e.payload() >= 0 {
                ValidationResult::ok()
            } else {
                ValidationResult::invalid(level, "negative")
            }
        })
    }

    #[tokio::test]
    async fn chain_applies_in_order() {
        let chain: MiddlewareChain<i32> = MiddlewareChain::default();
        chain.push(Arc::new(
            TransformMiddleware::new("double").map_payload(|p: i32| p * 2),
        ));
        chain.push(Arc::new(TransformMiddleware::new("inc").map_payload(|p: i32| p + 1)));
        chain.push(Arc::new(LoggingMiddleware::default()));

        let out = chain.run(Event::new("n", 5).unwrap()).await.unwrap();
        assert_eq!(*out.payload(), 11);
        assert_eq!(chain.len(), 3);
    }

    #[tokio::test]
    async fn transform_rewrites_name_and_metadata() {
        let mw = TransformMiddleware::new("upgrade")
            .rename(|n: &str| format!("v2.{n}"))
            .map_metadata(|m: &mut EventMetadata| {
                m.set_priority(EventPriority::Critical);
                m.add_tag("upgraded");
            });

        let out = mw.process(Event::new("user.created", 1).unwrap()).await.unwrap();
        assert_eq!(out.name(), "v2.user.created");
        assert_eq!(out.priority(), EventPriority::Critical);
        assert!(out.metadata().has_tag("upgraded"));
    }

    #[tokio::test]
    async fn only_critical_validation_rejects() {
        let warn = ValidationMiddleware::new(level_validator(ValidationLevel::Warning));
        assert!(warn.process(Event::new("n", -1).unwrap()).await.is_ok());

        let critical = ValidationMiddleware::new(level_validator(ValidationLevel::Critical));
        let err = critical.process(Event::new("n", -1).unwrap()).await.unwrap_err();
        assert!(matches!(err, ModkitError::Middleware { .. }));
        assert!(critical.process(Event::new("n", 1).unwrap()).await.is_ok());
    }

    #[tokio::test]
    async fn failure_is_wrapped_as_middleware_error() {
        let chain: MiddlewareChain<i32> = MiddlewareChain::default();
        chain.push(Arc::new(Reject));
        let err = chain.run(Event::new("n", 1).unwrap()).await.unwrap_err();
        match err {
            ModkitError::Middleware { middleware, reason } => {
                assert!(middleware.ends_with("Reject"));
                assert!(reason.contains("nope"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn remove_by_name() {
        let chain: MiddlewareChain<i32> = MiddlewareChain::default();
        chain.push(Arc::new(LoggingMiddleware::default()));
        assert!(chain.remove("logging"));
        assert!(!chain.remove("logging"));
        assert!(chain.is_empty());
    }
}
