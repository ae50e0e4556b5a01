use crate::error::ModkitResult;
use async_trait::async_trait;

/// 生命周期钩子：按注册顺序在 setup/cleanup 前后被调用。
///
/// 任一回调返回错误都会使模块进入 Error 状态。
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    /// 钩子名称（用于统计输出），默认取实现类型名
    fn hook_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    async fn before_setup(&self, _module: &str) -> ModkitResult<()> {
        Ok(())
    }

    async fn after_setup(&self, _module: &str) -> ModkitResult<()> {
        Ok(())
    }

    async fn before_cleanup(&self, _module: &str) -> ModkitResult<()> {
        Ok(())
    }

    async fn after_cleanup(&self, _module: &str) -> ModkitResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HookPhase {
    BeforeSetup,
    AfterSetup,
    BeforeCleanup,
    AfterCleanup,
}

impl HookPhase {
    pub(crate) async fn run(self, hook: &dyn LifecycleHook, module: &str) -> ModkitResult<()> {
        match self {
            HookPhase::BeforeSetup => hook.before_setup(module).await,
            HookPhase::AfterSetup => hook.after_setup(module).await,
            HookPhase::BeforeCleanup => hook.before_cleanup(module).await,
            HookPhase::AfterCleanup => hook.after_cleanup(module).await,
        }
    }
}
