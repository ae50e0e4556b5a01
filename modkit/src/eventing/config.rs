use crate::error::{ModkitError, ModkitResult};
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 处理器失败时的策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandlingPolicy {
    /// 记录并继续分发给下一个订阅
    #[default]
    Continue,
    /// 中止该事件的剩余分发，并将错误返回给批处理调用方
    Stop,
    /// 在重试余量内延迟后重新入队
    Retry,
}

impl FromStr for ErrorHandlingPolicy {
    type Err = ModkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "stop" => Ok(Self::Stop),
            "retry" => Ok(Self::Retry),
            other => Err(ModkitError::config(format!(
                "unknown error handling policy: {other}"
            ))),
        }
    }
}

impl fmt::Display for ErrorHandlingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Continue => "continue",
            Self::Stop => "stop",
            Self::Retry => "retry",
        })
    }
}

/// 事件管理器配置
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// 单个事件名下的订阅上限
    #[builder(default = 100)]
    pub max_handlers_per_event: usize,
    /// 为 true 时每个处理器作为独立任务并发执行
    #[builder(default = true)]
    pub enable_async_dispatch: bool,
    #[builder(default)]
    pub error_handling_policy: ErrorHandlingPolicy,
    #[builder(default = 3)]
    pub max_retries: u32,
    #[builder(default = Duration::from_secs(1))]
    #[serde(with = "crate::serde_secs")]
    pub retry_delay: Duration,
    /// 有界队列容量（超过即拒绝，作为背压信号）
    #[builder(default = 1000)]
    pub max_queue_size: usize,
    #[builder(default = 10)]
    pub batch_size: usize,
    /// 空闲时等待首个事件的最长时间
    #[builder(default = Duration::from_millis(100))]
    #[serde(with = "crate::serde_secs")]
    pub batch_timeout: Duration,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EventConfig {
    pub fn validate(&self) -> ModkitResult<()> {
        if self.max_handlers_per_event == 0 {
            return Err(ModkitError::config("max_handlers_per_event must be > 0"));
        }
        if self.max_queue_size == 0 {
            return Err(ModkitError::config("max_queue_size must be > 0"));
        }
        if self.batch_size == 0 {
            return Err(ModkitError::config("batch_size must be > 0"));
        }
        if self.batch_timeout.is_zero() {
            return Err(ModkitError::config("batch_timeout must be > 0"));
        }
        Ok(())
    }

    /// 从 JSON 文本读取并校验（文件读取由调用方负责）
    pub fn from_json_str(raw: &str) -> ModkitResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }
}
