//! 强类型适配（typed）
//!
//! 以负载类型的完整路径（`std::any::type_name`）作为事件名，
//! 并将强类型回调包装为运行时做类型检查的处理器，类型不符时返回 `TypeMismatch`。
//!
use crate::{
    engine::Engine,
    error::{Error, Result},
    event::Event,
    handler::{HandlerFn, HandlerFuture},
    payload::Payload,
};
use serde::Serialize;
use std::any::type_name;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

/// 携带强类型负载的事件
#[derive(Debug)]
pub struct TypedEvent<T> {
    pub event: Event,
    pub data: Arc<T>,
}

impl<T> Deref for TypedEvent<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

/// 类型 `T` 对应的事件名：用户类型为带模块路径的全名，内置类型为裸类型名
pub fn event_name<T: ?Sized>() -> String {
    type_name::<T>().to_string()
}

/// 以负载类型推导事件名
pub fn as_event<T>(value: T) -> (String, Payload)
where
    T: Serialize + Send + Sync + 'static,
{
    (event_name::<T>(), Payload::new(value))
}

fn typed_data<T>(event: &Event) -> Result<Arc<T>>
where
    T: Send + Sync + 'static,
{
    event
        .data()
        .clone()
        .downcast_arc::<T>()
        .map_err(|payload| Error::TypeMismatch {
            expected: type_name::<T>(),
            found: payload.type_name(),
        })
}

/// 包装只关心负载的回调，返回 `(事件名, 处理器)`
pub fn wrap<T, F, Fut>(handler: F) -> (String, HandlerFn)
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let f: HandlerFn = Arc::new(move |event: Event| -> HandlerFuture {
        match typed_data::<T>(&event) {
            Ok(data) => {
                let fut = handler(data);
                Box::pin(async move { fut.await.map_err(Error::Handler) })
            }
            Err(err) => Box::pin(async move { Err(err) }),
        }
    });

    (event_name::<T>(), f)
}

/// 包装需要事件元信息（上下文、时间戳、取消）的回调
pub fn wrap_event<T, F, Fut>(handler: F) -> (String, HandlerFn)
where
    T: Send + Sync + 'static,
    F: Fn(TypedEvent<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let f: HandlerFn = Arc::new(move |event: Event| -> HandlerFuture {
        match typed_data::<T>(&event) {
            Ok(data) => {
                let fut = handler(TypedEvent { event, data });
                Box::pin(async move { fut.await.map_err(Error::Handler) })
            }
            Err(err) => Box::pin(async move { Err(err) }),
        }
    });

    (event_name::<T>(), f)
}

impl Engine {
    /// 以类型名订阅，panic 条件同 `subscribe`
    pub fn subscribe_typed<T, F, Fut>(&self, handler: F)
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (name, f) = wrap::<T, F, Fut>(handler);
        self.subscribe_fn(name, f);
    }

    pub fn subscribe_typed_event<T, F, Fut>(&self, handler: F)
    where
        T: Send + Sync + 'static,
        F: Fn(TypedEvent<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (name, f) = wrap_event::<T, F, Fut>(handler);
        self.subscribe_fn(name, f);
    }

    /// 以负载类型名发布
    pub async fn submit_typed<T>(&self, value: T) -> Result<()>
    where
        T: Serialize + Send + Sync + 'static,
    {
        let (name, payload) = as_event(value);
        self.submit(&name, payload).await
    }
}
