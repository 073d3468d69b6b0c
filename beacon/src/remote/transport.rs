//! 远程传输（Transport）协议
//!
//! 引擎在发布时通过 `TransportPolicy` 决定是否将事件转发给远端：
//! - `Local`：仅本地分发；
//! - `Exclusive`：仅转发，本地不允许订阅（HTTP 传输）；
//! - `Dual`：先转发，成功后继续本地分发（gRPC 传输）。
//!
//! 连接/客户端由调用方持有，引擎只引用，不做池化、重试与限流。
//!
use crate::{context::Context, error::TransportError, event::Event};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// 远程传输后端：将事件发送给远端引擎
#[async_trait]
pub trait Transport: Send + Sync {
    /// 传输名称（用于日志）
    fn name(&self) -> &str;

    async fn forward(
        &self,
        ctx: &Context,
        event_name: &str,
        event: &Event,
    ) -> Result<(), TransportError>;
}

/// 引擎的转发策略
#[derive(Clone, Default)]
pub enum TransportPolicy {
    #[default]
    Local,
    Exclusive(Arc<dyn Transport>),
    Dual(Arc<dyn Transport>),
}

impl TransportPolicy {
    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        match self {
            TransportPolicy::Local => None,
            TransportPolicy::Exclusive(t) | TransportPolicy::Dual(t) => Some(t),
        }
    }

    /// 是否允许本地订阅
    pub fn allows_local_handlers(&self) -> bool {
        !matches!(self, TransportPolicy::Exclusive(_))
    }
}

impl fmt::Debug for TransportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportPolicy::Local => f.write_str("Local"),
            TransportPolicy::Exclusive(t) => f.debug_tuple("Exclusive").field(&t.name()).finish(),
            TransportPolicy::Dual(t) => f.debug_tuple("Dual").field(&t.name()).finish(),
        }
    }
}
