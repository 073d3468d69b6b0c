//! 调用上下文（Context）
//!
//! 承载一次发布调用的取消信号与截止时间，随 `Event` 传给每个处理器：
//! - 取消基于 `tokio_util::sync::CancellationToken`，子上下文随父上下文一同取消；
//! - 截止时间取父子中较早者，到期后 `done()` 返回 `DeadlineExceeded`；
//! - 取消是协作式的：处理器可在任意等待点观察 `done()`，分发循环在处理器之间轮询 `err()`。
//!
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
#[cfg(any(feature = "http", feature = "rpc"))]
use tokio_util::sync::DropGuard;

/// 上下文结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// 可取消、可设截止时间的调用上下文
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// 根上下文：没有截止时间，除非显式 `cancel()` 否则不会结束
    pub fn background() -> Self {
        Self::default()
    }

    /// 派生可独立取消的子上下文；取消子上下文不影响父上下文
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// 派生带超时的子上下文
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// 派生带截止时间的子上下文，实际截止时间取父子中较早者
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };

        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// 取消当前上下文及其全部子上下文
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// 守卫被丢弃时取消当前上下文（接收端请求被中止时通知处理器）
    #[cfg(any(feature = "http", feature = "rpc"))]
    pub(crate) fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 距截止时间的剩余时长；已过期时为零
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// 非阻塞检查：上下文已结束时返回结束原因
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }

        match self.deadline {
            Some(d) if Instant::now() >= d => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// 等待上下文结束（取消或到期），返回结束原因
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => ContextError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }
}
