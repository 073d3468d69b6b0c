use crate::handler::HandlerFn;
use dashmap::DashMap;

/// 处理器注册表：事件名 -> 按注册顺序排列的处理器
///
/// 只追加、不去重、不删除；分发时取快照，调用处理器期间不持有分片锁。
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    by_name: DashMap<String, Vec<HandlerFn>>,
}

impl HandlerRegistry {
    pub(crate) fn insert(&self, name: impl Into<String>, handler: HandlerFn) {
        self.by_name.entry(name.into()).or_default().push(handler);
    }

    pub(crate) fn snapshot(&self, name: &str) -> Vec<HandlerFn> {
        self.by_name
            .get(name)
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    /// 已注册的事件名数量
    pub(crate) fn len(&self) -> usize {
        self.by_name.len()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.by_name.iter().map(|e| e.key().clone()).collect()
    }
}
