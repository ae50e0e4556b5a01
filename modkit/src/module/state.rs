//! 生命周期状态机
//!
//! 纯逻辑、无 I/O：只负责判定迁移是否合法并记录最近一次错误。
//! 编排（依赖、钩子、setup/teardown）由 `kernel` 完成。
//!
use crate::error::ModkitError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 模块所处的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Created,
    Initializing,
    Initialized,
    CleaningUp,
    Error,
}

impl ModuleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleState::Created => "created",
            ModuleState::Initializing => "initializing",
            ModuleState::Initialized => "initialized",
            ModuleState::CleaningUp => "cleaning_up",
            ModuleState::Error => "error",
        }
    }

    /// 合法迁移表
    pub fn can_transition_to(self, next: ModuleState) -> bool {
        use ModuleState::*;

        matches!(
            (self, next),
            (Created | Error, Initializing)
                | (Initializing, Initialized | Error)
                | (Initialized, CleaningUp)
                | (CleaningUp, Created | Error)
        )
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个模块实例的状态记录：当前状态 + 导致进入 Error 的原因
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: ModuleState,
    error: Option<Arc<ModkitError>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            state: ModuleState::Created,
            error: None,
        }
    }
}

impl Lifecycle {
    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn error(&self) -> Option<&Arc<ModkitError>> {
        self.error.as_ref()
    }

    /// 迁移到 `next`；非法迁移返回当前状态作为错误
    pub fn transition(&mut self, next: ModuleState) -> Result<(), ModuleState> {
        if !self.state.can_transition_to(next) {
            return Err(self.state);
        }

        self.state = next;
        if next == ModuleState::Initialized || next == ModuleState::Created {
            self.error = None;
        }

        Ok(())
    }

    /// 记录失败原因并进入 Error（任意状态均可进入）
    pub fn fail(&mut self, error: Arc<ModkitError>) {
        self.state = ModuleState::Error;
        self.error = Some(error);
    }
}
