//! 事件序列化器（EventSerializer）
//!
//! 将 `Event<T>` 编码为单行字节串，供文件存储按行落盘。
//!
use crate::error::ModkitResult;
use crate::eventing::Event;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub trait EventSerializer<T>: Send + Sync {
    /// 格式名（用于日志与统计）
    fn format(&self) -> &str;

    /// 输出中不得包含换行符
    fn serialize(&self, event: &Event<T>) -> ModkitResult<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> ModkitResult<Event<T>>;
}

/// 紧凑 JSON 序列化
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEventSerializer;

impl<T> EventSerializer<T> for JsonEventSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn format(&self) -> &str {
        "json"
    }

    fn serialize(&self, event: &Event<T>) -> ModkitResult<Vec<u8>> {
        Ok(serde_json::to_vec(event)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> ModkitResult<Event<T>> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventing::EventPriority;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct OrderPaid {
        order_id: String,
        amount_cents: i64,
    }

    #[test]
    fn roundtrip_preserves_name_payload_and_metadata() {
        let event = Event::new(
            "order.paid",
            OrderPaid {
                order_id: "o-1".into(),
                amount_cents: 1299,
            },
        )
        .unwrap()
        .with_priority(EventPriority::High)
        .with_source("billing")
        .with_causation_id("cmd-7")
        .with_tag("vip")
        .with_tag("eu")
        .with_retry_policy(5, Duration::from_millis(250));

        let bytes = JsonEventSerializer.serialize(&event).unwrap();
        assert!(!bytes.contains(&b'\n'));

        let back: Event<OrderPaid> = JsonEventSerializer.deserialize(&bytes).unwrap();
        assert_eq!(back.name(), event.name());
        assert_eq!(back.payload(), event.payload());
        assert_eq!(back.metadata(), event.metadata());
    }

    #[test]
    fn garbage_is_a_persistence_error() {
        let err = <JsonEventSerializer as EventSerializer<OrderPaid>>::deserialize(
            &JsonEventSerializer,
            b"{not json",
        )
        .unwrap_err();
        assert!(err.is_persistence_error());
    }
}
