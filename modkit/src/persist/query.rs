use crate::eventing::Event;
use bon::Builder;
use chrono::{DateTime, Utc};

/// 加载/重放时的过滤条件，均为可选；`limit` 作用于过滤后的结果
#[derive(Builder, Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    #[builder(into)]
    event_name: Option<String>,
    #[builder(into)]
    correlation_id: Option<String>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

impl EventQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn matches<T>(&self, event: &Event<T>) -> bool {
        let meta = event.metadata();

        if let Some(name) = &self.event_name {
            if event.name() != name {
                return false;
            }
        }
        if let Some(cid) = &self.correlation_id {
            if meta.correlation_id() != cid {
                return false;
            }
        }
        if let Some(since) = &self.since {
            if meta.timestamp() < since {
                return false;
            }
        }
        if let Some(until) = &self.until {
            if meta.timestamp() > until {
                return false;
            }
        }

        true
    }

    /// 过滤并截断
    pub fn apply<T>(&self, events: impl IntoIterator<Item = Event<T>>) -> Vec<Event<T>> {
        let filtered = events.into_iter().filter(|e| self.matches(e));
        match self.limit {
            Some(n) => filtered.take(n).collect(),
            None => filtered.collect(),
        }
    }
}
