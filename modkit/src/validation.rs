//! 校验器协议（Validator）
//!
//! 只定义边界：具体规则库由外部提供。订阅在结果无效时跳过该事件；
//! 校验中间件仅在 `Critical` 级别的无效结果时拒绝事件。
//!
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    Info,
    Warning,
    #[default]
    Error,
    Critical,
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationLevel::Info => "info",
            ValidationLevel::Warning => "warning",
            ValidationLevel::Error => "error",
            ValidationLevel::Critical => "critical",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    valid: bool,
    level: ValidationLevel,
    message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            level: ValidationLevel::Info,
            message: None,
        }
    }

    pub fn invalid(level: ValidationLevel, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            level,
            message: Some(message.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn level(&self) -> ValidationLevel {
        self.level
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// 无效且为 Critical 级别
    pub fn is_critical(&self) -> bool {
        !self.valid && self.level == ValidationLevel::Critical
    }
}

/// 校验器：对值给出校验结果
pub trait Validator<V: ?Sized>: Send + Sync {
    fn validate(&self, value: &V) -> ValidationResult;
}

impl<V, F> Validator<V> for F
where
    V: ?Sized,
    F: Fn(&V) -> ValidationResult + Send + Sync,
{
    fn validate(&self, value: &V) -> ValidationResult {
        self(value)
    }
}
