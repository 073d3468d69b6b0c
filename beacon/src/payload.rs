//! 事件负载（Payload）
//!
//! 以类型擦除（`Any`）方式承载任意负载，克隆代价仅为一次 `Arc` 计数：
//! - `Payload::new`：可序列化的负载，可跨进程转发；
//! - `Payload::opaque`：仅限进程内的负载（如通道、句柄），转发时返回编码错误；
//! - 经远程传输收到的负载统一还原为 `serde_json::Value`，可用 `decode` 取回强类型。
//!
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

type AnyValue = dyn Any + Send + Sync;

type EncodeFn = fn(&AnyValue) -> Result<Value, serde_json::Error>;

/// 类型擦除后的事件负载
#[derive(Clone)]
pub struct Payload {
    value: Arc<AnyValue>,
    type_name: &'static str,
    encode: Option<EncodeFn>,
}

fn encode_as<T>(value: &AnyValue) -> Result<Value, serde_json::Error>
where
    T: Serialize + 'static,
{
    match value.downcast_ref::<T>() {
        Some(v) => serde_json::to_value(v),
        None => Err(serde::ser::Error::custom(format!(
            "payload is not a {}",
            type_name::<T>()
        ))),
    }
}

impl Payload {
    /// 可序列化负载
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self::shared(Arc::new(value))
    }

    /// 共享已有的 `Arc`，便于发布方与处理器观察同一份状态
    pub fn shared<T>(value: Arc<T>) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self {
            value,
            type_name: type_name::<T>(),
            encode: Some(encode_as::<T>),
        }
    }

    /// 仅限进程内使用的负载，不能经远程传输转发
    pub fn opaque<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::opaque_shared(Arc::new(value))
    }

    pub fn opaque_shared<T>(value: Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            value,
            type_name: type_name::<T>(),
            encode: None,
        }
    }

    /// 空负载，编码为 JSON `null`
    pub fn none() -> Self {
        Self::new(())
    }

    pub fn is_none(&self) -> bool {
        match self.value.downcast_ref::<Value>() {
            Some(v) => v.is_null(),
            None => self.value.is::<()>(),
        }
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// 还原为强类型 `Arc`；类型不符时原样返回
    pub fn downcast_arc<T>(self) -> Result<Arc<T>, Self>
    where
        T: Send + Sync + 'static,
    {
        let Self {
            value,
            type_name,
            encode,
        } = self;

        value.downcast::<T>().map_err(|value| Self {
            value,
            type_name,
            encode,
        })
    }

    /// 负载的具体类型名（用于日志与类型不匹配错误）
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 是否可以跨进程转发
    pub fn is_encodable(&self) -> bool {
        self.encode.is_some()
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        match self.encode {
            Some(encode) => encode(self.value.as_ref()),
            None => Err(serde::ser::Error::custom(format!(
                "payload of type {} is not serializable",
                self.type_name
            ))),
        }
    }

    /// 经 JSON 形态还原为 `T`，对本地负载与远程收到的负载均适用
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self.value.downcast_ref::<Value>() {
            Some(v) => T::deserialize(v),
            None => serde_json::from_value(self.to_json()?),
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("type_name", &self.type_name)
            .field("encodable", &self.encode.is_some())
            .finish()
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Payload::from)
    }
}
