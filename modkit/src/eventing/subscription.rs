use super::{Event, EventHandler, EventPriority};
use crate::validation::Validator;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 订阅过滤器：返回 false 时跳过该事件
pub type EventFilter<T> = Arc<dyn Fn(&Event<T>) -> bool + Send + Sync>;

/// 订阅标识，`subscribe` 返回，用于精确退订
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// 注册表条目：处理器 + 优先级 + 可选过滤器与校验器
pub struct EventSubscription<T> {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler<T>>,
    priority: EventPriority,
    filter: Option<EventFilter<T>>,
    validator: Option<Arc<dyn Validator<Event<T>>>>,
}

// 手写 Clone：字段均为 Arc，无需 T: Clone
impl<T> Clone for EventSubscription<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: self.handler.clone(),
            priority: self.priority,
            filter: self.filter.clone(),
            validator: self.validator.clone(),
        }
    }
}

impl<T> fmt::Debug for EventSubscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("id", &self.id)
            .field("handler", &self.handler.handler_name())
            .field("priority", &self.priority)
            .field("filter", &self.filter.is_some())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl<T> EventSubscription<T> {
    pub fn new(handler: Arc<dyn EventHandler<T>>, priority: EventPriority) -> Self {
        Self {
            id: SubscriptionId::next(),
            handler,
            priority,
            filter: None,
            validator: None,
        }
    }

    pub fn with_filter(mut self, filter: EventFilter<T>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator<Event<T>>>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn handler(&self) -> &Arc<dyn EventHandler<T>> {
        &self.handler
    }

    pub fn priority(&self) -> EventPriority {
        self.priority
    }

    /// 是否为同一个处理器实例（按指针比较）
    pub fn has_handler(&self, handler: &Arc<dyn EventHandler<T>>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.handler), Arc::as_ptr(handler))
    }

    /// 先过滤器、后校验器；两者均通过才应收到事件
    pub fn accepts(&self, event: &Event<T>) -> bool {
        if let Some(filter) = &self.filter {
            if !filter(event) {
                return false;
            }
        }
        if let Some(validator) = &self.validator {
            if !validator.validate(event).is_valid() {
                return false;
            }
        }
        true
    }
}
