use crate::module::ModuleStats;
use serde::Serialize;
use std::collections::BTreeMap;

/// 事件管理器统计：模块统计 + 管线运行指标
#[derive(Debug, Clone, Serialize)]
pub struct EventManagerStats {
    #[serde(flatten)]
    pub module: ModuleStats,
    /// 存在订阅的事件名数量
    pub event_count: usize,
    /// 事件名 → 订阅数量
    pub events: BTreeMap<String, usize>,
    pub running_tasks: usize,
    pub middleware_count: usize,
    pub persistence_enabled: bool,
    pub auto_persist: bool,
    pub queue_size: usize,
    pub queue_full: bool,
    pub processed_events: u64,
    pub failed_events: u64,
    /// 处理器名 → 失败次数
    pub handler_failures: BTreeMap<String, u64>,
}

/// 失败发生的环节
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Middleware,
    Persistence,
    Handler,
    /// 重试重新入队失败（如队列已满）
    Requeue,
}

/// 一次未被策略吸收的处理失败，经 `EventManager::failures` 广播
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingFailure {
    pub event_name: String,
    pub correlation_id: String,
    pub stage: FailureStage,
    pub handler: Option<String>,
    pub retry_count: u32,
    pub message: String,
}
