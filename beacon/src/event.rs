use crate::{context::Context, payload::Payload};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 一次发布产生的事件：上下文、创建时间与负载
///
/// 每次 `submit` 都会新建事件，取消标记只在该次分发的处理器链内共享，
/// 同名事件的并发发布互不影响。
#[derive(Clone, Debug)]
pub struct Event {
    context: Context,
    timestamp: DateTime<Utc>,
    data: Payload,
    cancelled: Arc<AtomicBool>,
}

impl Event {
    pub fn new(context: Context, data: Payload) -> Self {
        Self::at(context, Utc::now(), data)
    }

    /// 使用给定时间戳构造事件（接收端保留发送方时间）
    pub fn at(context: Context, timestamp: DateTime<Utc>, data: Payload) -> Self {
        Self {
            context,
            timestamp,
            data,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }

    /// 停止后续处理器，本次发布仍视为成功
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
