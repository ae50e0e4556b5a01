//! 订阅注册表（SubscriptionRegistry）
//!
//! 事件名 → 按优先级降序排列的订阅列表；同优先级保持注册顺序（稳定插入）。
//! 分发时按事件名取快照（copy-on-read），订阅/退订与分发互不阻塞。
//!
use super::{EventHandler, EventSubscription, SubscriptionId};
use crate::error::{ModkitError, ModkitResult};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct SubscriptionRegistry<T> {
    by_event: DashMap<String, Vec<EventSubscription<T>>>,
    max_per_event: usize,
}

impl<T> SubscriptionRegistry<T> {
    pub fn new(max_per_event: usize) -> Self {
        Self {
            by_event: DashMap::new(),
            max_per_event,
        }
    }

    /// 插入订阅；超过上限返回 `TooManyHandlers`
    pub fn insert(
        &self,
        event_name: &str,
        subscription: EventSubscription<T>,
    ) -> ModkitResult<SubscriptionId> {
        let mut list = self.by_event.entry(event_name.to_string()).or_default();
        if list.len() >= self.max_per_event {
            return Err(ModkitError::TooManyHandlers {
                event: event_name.to_string(),
                limit: self.max_per_event,
            });
        }

        // 插在第一个优先级更低的订阅之前，同优先级追加在后
        let pos = list
            .iter()
            .position(|s| s.priority() < subscription.priority())
            .unwrap_or(list.len());
        let id = subscription.id();
        list.insert(pos, subscription);

        Ok(id)
    }

    /// 退订：指定处理器时移除第一个匹配项，否则移除该事件名下全部订阅。返回移除数量。
    pub fn remove(&self, event_name: &str, handler: Option<&Arc<dyn EventHandler<T>>>) -> usize {
        let removed = match handler {
            None => self
                .by_event
                .remove(event_name)
                .map(|(_, list)| list.len())
                .unwrap_or(0),
            Some(handler) => {
                let Some(mut list) = self.by_event.get_mut(event_name) else {
                    return 0;
                };
                match list.iter().position(|s| s.has_handler(handler)) {
                    Some(pos) => {
                        list.remove(pos);
                        1
                    }
                    None => 0,
                }
            }
        };

        self.by_event.remove_if(event_name, |_, list| list.is_empty());
        removed
    }

    pub fn remove_by_id(&self, id: SubscriptionId) -> bool {
        let mut removed_from = None;
        for mut entry in self.by_event.iter_mut() {
            if let Some(pos) = entry.iter().position(|s| s.id() == id) {
                entry.remove(pos);
                removed_from = Some(entry.key().clone());
                break;
            }
        }

        match removed_from {
            Some(name) => {
                self.by_event.remove_if(&name, |_, list| list.is_empty());
                true
            }
            None => false,
        }
    }

    /// 某事件名当前订阅列表的快照（已排序）
    pub fn snapshot(&self, event_name: &str) -> Vec<EventSubscription<T>> {
        self.by_event
            .get(event_name)
            .map(|list| list.value().clone())
            .unwrap_or_default()
    }

    pub fn handler_count(&self, event_name: &str) -> usize {
        self.by_event.get(event_name).map(|l| l.len()).unwrap_or(0)
    }

    /// 事件名 → 订阅数量
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.by_event
            .iter()
            .map(|entry| (entry.key().clone(), entry.len()))
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.by_event.len()
    }

    pub fn clear(&self) {
        self.by_event.clear();
    }
}
