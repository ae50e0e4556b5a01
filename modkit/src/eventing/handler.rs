//! 事件处理器（EventHandler）
//!
//! 单一能力：消费 `&Event<T>`，返回成功或失败。
//! 既可由对象实现，也可通过 `handler_fn` 由异步闭包构造。
//!
use super::Event;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

#[async_trait]
pub trait EventHandler<T>: Send + Sync {
    /// 处理器名称（用于日志与失败统计），默认取实现类型名
    fn handler_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, event: &Event<T>) -> anyhow::Result<()>;
}

type HandlerFn<T> = dyn Fn(Event<T>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// 闭包处理器
pub struct FnHandler<T> {
    name: String,
    f: Box<HandlerFn<T>>,
}

/// 以异步闭包构造处理器；闭包收到事件的一份拷贝
pub fn handler_fn<T, F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn EventHandler<T>>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(Event<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler {
        name: name.into(),
        f: Box::new(move |event| Box::pin(f(event))),
    })
}

#[async_trait]
impl<T> EventHandler<T> for FnHandler<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn handler_name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &Event<T>) -> anyhow::Result<()> {
        (self.f)(event.clone()).await
    }
}
