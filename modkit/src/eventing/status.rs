use serde::{Deserialize, Serialize};
use std::fmt;

/// 事件处理状态
///
/// 单调推进，唯一的回环是 Retrying -> Processing（重试重新入队后再次处理）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Retrying,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Processing => "processing",
            EventStatus::Completed => "completed",
            EventStatus::Failed => "failed",
            EventStatus::Retrying => "retrying",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Failed)
    }

    pub fn can_transition_to(self, next: EventStatus) -> bool {
        use EventStatus::*;

        matches!(
            (self, next),
            (Pending, Processing | Failed)
                | (Processing, Completed | Failed | Retrying)
                | (Retrying, Processing | Failed)
        )
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
