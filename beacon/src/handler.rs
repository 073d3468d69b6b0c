//! 事件处理器（Handler）
//!
//! 处理器在注册时被擦除为统一的异步闭包 `HandlerFn`，分发时按注册顺序逐个调用。
//! 既可直接注册闭包，也可实现 `EventHandler` trait 后以 `Arc` 注册。
//!
use crate::{error::Error, event::Event};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

pub type HandlerFuture = BoxFuture<'static, Result<(), Error>>;

/// 类型擦除后的处理器
pub type HandlerFn = Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync>;

/// 事件处理器：返回错误将中止本次分发并原样返回给发布方
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: Event) -> anyhow::Result<()>;
}

/// 将闭包擦除为 `HandlerFn`
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |event: Event| -> HandlerFuture {
        let fut = f(event);
        Box::pin(async move { fut.await.map_err(Error::Handler) })
    })
}

/// 将 `EventHandler` 实现擦除为 `HandlerFn`
pub fn from_handler<H>(handler: Arc<H>) -> HandlerFn
where
    H: EventHandler,
{
    Arc::new(move |event: Event| -> HandlerFuture {
        let handler = handler.clone();
        Box::pin(async move { handler.handle(event).await.map_err(Error::Handler) })
    })
}
