//! 统一错误定义
//!
//! 区分参数错误、处理器错误、上下文结束、远程传输失败、类型不匹配与策略违例，
//! 处理器返回的错误原样透传给发布方。
//!
use crate::context::ContextError;
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// 处理器返回的错误（透明透传）
    #[error(transparent)]
    Handler(anyhow::Error),

    #[error("event handler panicked: {reason}")]
    HandlerPanicked { reason: String },

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("policy violation: {reason}")]
    PolicyViolation { reason: String },
}

/// 远程转发失败：区分“未发出”（Encode/Request）与“已发出但失败”（Network/Rejected）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not encode event: {reason}")]
    Encode { reason: String },

    #[error("could not build request: {reason}")]
    Request { reason: String },

    #[error("request failed: {reason}")]
    Network { reason: String },

    #[error("event rejected by remote: status={status}")]
    Rejected { status: String },
}

impl Error {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// 是否由调用方上下文结束（取消/超时）引起
    pub fn is_context(&self) -> bool {
        matches!(self, Error::Context(_))
    }
}

impl TransportError {
    pub(crate) fn encode(reason: impl ToString) -> Self {
        TransportError::Encode {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn request(reason: impl ToString) -> Self {
        TransportError::Request {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn network(reason: impl ToString) -> Self {
        TransportError::Network {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn rejected(status: impl ToString) -> Self {
        TransportError::Rejected {
            status: status.to_string(),
        }
    }

    /// 请求是否确定未发出（Network 错误无法判断对端是否已收到）
    pub fn never_sent(&self) -> bool {
        matches!(
            self,
            TransportError::Encode { .. } | TransportError::Request { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
