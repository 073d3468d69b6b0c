//! 事件引擎（Engine）
//!
//! 持有一份处理器注册表与可选的远程转发策略：
//! - `subscribe`：按事件名追加处理器，注册顺序即调用顺序；
//! - `submit`/`submit_with_context`：构造事件，按策略转发并/或执行本地分发；
//! - 本地分发在独立任务中顺序调用处理器，并与调用方上下文竞速，先完成者决定结果。
//!
//! 上下文先结束时调用立即返回，已开始的处理器链在后台继续运行，结果被丢弃。
//!
use crate::{
    context::Context,
    error::{Error, Result},
    event::Event,
    handler::{EventHandler, HandlerFn, from_handler, handler_fn},
    payload::Payload,
    registry::HandlerRegistry,
    remote::{Transport, TransportPolicy},
};
use bon::Builder;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

// 导入由 bon::Builder 生成的 typestate 模块与状态转换别名
#[cfg(any(feature = "http", feature = "rpc"))]
use self::engine_builder::{IsUnset, SetPolicy, State as BuilderState};

/// 事件引擎：本地订阅/发布，或经远程传输转发
#[derive(Builder)]
pub struct Engine {
    #[builder(default)]
    policy: TransportPolicy,
    #[builder(skip)]
    registry: HandlerRegistry,
}

// 远程传输的快捷配置，受 typestate 限制只能设置一次策略
#[cfg(any(feature = "http", feature = "rpc"))]
impl<S: BuilderState> EngineBuilder<S> {
    /// 所有事件经 HTTP 转发给远端，本地不允许订阅
    #[cfg(feature = "http")]
    pub fn http_remote(
        self,
        client: reqwest::Client,
        url: impl Into<String>,
    ) -> EngineBuilder<SetPolicy<S>>
    where
        <S as BuilderState>::Policy: IsUnset,
    {
        let transport = crate::remote::http::HttpTransport::new(client, url);
        self.policy(TransportPolicy::Exclusive(Arc::new(transport)))
    }

    /// 事件经 gRPC 转发给远端，成功后继续本地分发
    #[cfg(feature = "rpc")]
    pub fn rpc_remote(self, channel: tonic::transport::Channel) -> EngineBuilder<SetPolicy<S>>
    where
        <S as BuilderState>::Policy: IsUnset,
    {
        let transport = crate::remote::rpc::RpcTransport::new(channel);
        self.policy(TransportPolicy::Dual(Arc::new(transport)))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// 仅本地分发的引擎
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn policy(&self) -> &TransportPolicy {
        &self.policy
    }

    pub fn is_remote(&self) -> bool {
        self.policy.transport().is_some()
    }

    /// 已注册的事件名数量（非处理器数量）
    pub fn size(&self) -> usize {
        self.registry.len()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// 注册闭包处理器
    ///
    /// # Panics
    ///
    /// 引擎处于独占远程转发（HTTP）模式时 panic，此时应使用远端引擎订阅。
    pub fn subscribe<F, Fut>(&self, event_name: impl Into<String>, handler: F)
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.subscribe_fn(event_name, handler_fn(handler));
    }

    pub fn try_subscribe<F, Fut>(&self, event_name: impl Into<String>, handler: F) -> Result<()>
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.try_subscribe_fn(event_name, handler_fn(handler))
    }

    /// 注册 `EventHandler` 实现，panic 条件同 `subscribe`
    pub fn subscribe_handler<H: EventHandler>(&self, event_name: impl Into<String>, handler: Arc<H>) {
        self.subscribe_fn(event_name, from_handler(handler));
    }

    pub fn try_subscribe_handler<H: EventHandler>(
        &self,
        event_name: impl Into<String>,
        handler: Arc<H>,
    ) -> Result<()> {
        self.try_subscribe_fn(event_name, from_handler(handler))
    }

    /// 注册已擦除的处理器（如 `typed::wrap` 的返回值），panic 条件同 `subscribe`
    pub fn subscribe_fn(&self, event_name: impl Into<String>, handler: HandlerFn) {
        if let Err(err) = self.try_subscribe_fn(event_name, handler) {
            panic!("{err}");
        }
    }

    pub fn try_subscribe_fn(&self, event_name: impl Into<String>, handler: HandlerFn) -> Result<()> {
        let event_name = event_name.into();

        if !self.policy.allows_local_handlers() {
            return Err(Error::PolicyViolation {
                reason: format!(
                    "cannot subscribe to {event_name:?} when exclusive remote forwarding is enabled"
                ),
            });
        }

        self.registry.insert(event_name, handler);
        Ok(())
    }

    /// 以根上下文发布事件
    pub async fn submit(&self, event_name: &str, data: impl Into<Payload>) -> Result<()> {
        self.submit_with_context(&Context::background(), event_name, data)
            .await
    }

    /// 在给定上下文中发布事件
    ///
    /// 远程转发失败时直接返回错误，不再执行本地分发。
    pub async fn submit_with_context(
        &self,
        ctx: &Context,
        event_name: &str,
        data: impl Into<Payload>,
    ) -> Result<()> {
        if event_name.is_empty() {
            return Err(Error::invalid_argument("event name is required"));
        }

        let event = Event::new(ctx.clone(), data.into());

        match &self.policy {
            TransportPolicy::Local => {}
            TransportPolicy::Exclusive(transport) => {
                return Self::forward(transport.as_ref(), ctx, event_name, &event).await;
            }
            TransportPolicy::Dual(transport) => {
                Self::forward(transport.as_ref(), ctx, event_name, &event).await?;
            }
        }

        self.run_local(event_name, event).await
    }

    /// 接收端入口：跳过转发策略，直接执行本地分发
    pub(crate) async fn dispatch(&self, event_name: &str, event: Event) -> Result<()> {
        if event_name.is_empty() {
            return Err(Error::invalid_argument("event name is required"));
        }

        self.run_local(event_name, event).await
    }

    async fn forward(
        transport: &dyn Transport,
        ctx: &Context,
        event_name: &str,
        event: &Event,
    ) -> Result<()> {
        debug!(event_name, transport = transport.name(), "forwarding event");

        tokio::select! {
            biased;
            reason = ctx.done() => Err(reason.into()),
            res = transport.forward(ctx, event_name, event) => res.map_err(|e| {
                warn!(event_name, transport = transport.name(), error = %e, "forwarding failed");
                Error::from(e)
            }),
        }
    }

    async fn run_local(&self, event_name: &str, event: Event) -> Result<()> {
        let handlers = self.registry.snapshot(event_name);
        if handlers.is_empty() {
            return Ok(());
        }

        let ctx = event.context().clone();
        let mut chain = tokio::spawn(run_chain(handlers, event));

        tokio::select! {
            biased;
            reason = ctx.done() => {
                debug!(event_name, %reason, "context finished before dispatch completed");
                let event_name = event_name.to_string();
                tokio::spawn(async move {
                    if let Ok(Err(err)) = chain.await {
                        debug!(event_name = %event_name, error = %err, "dropped result of abandoned dispatch");
                    }
                });
                Err(reason.into())
            }
            joined = &mut chain => match joined {
                Ok(res) => res,
                Err(err) => Err(Error::HandlerPanicked {
                    reason: err.to_string(),
                }),
            },
        }
    }
}

/// 按注册顺序调用处理器：上下文结束或处理器出错时中止，事件被取消时成功返回
async fn run_chain(handlers: Vec<HandlerFn>, event: Event) -> Result<()> {
    for handler in handlers {
        if let Some(reason) = event.context().err() {
            return Err(reason.into());
        }

        handler(event.clone()).await?;

        if event.is_cancelled() {
            break;
        }
    }

    Ok(())
}
