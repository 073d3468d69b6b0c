//! gRPC 传输（tonic）
//!
//! 服务 `beacon.EventService` 只有一个一元方法 `SubmitEvent`：
//! - 请求：`event_name`、`timestamp`（protobuf Timestamp）、`data`（负载的 JSON 编码）；
//! - 响应：`success`。
//!
//! 发送端转发成功后引擎仍会执行本地分发；接收端解码负载为 `serde_json::Value`，
//! 构造事件后直接进入本地分发循环。
//!
use crate::{
    context::Context,
    engine::Engine,
    error::{Error, TransportError},
    event::Event,
    payload::Payload,
    remote::Transport,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tonic::metadata::MetadataMap;
use tonic::transport::Channel;
use tonic::{Code, Request, Response, Status};
use tracing::{debug, warn};

pub mod proto {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SubmitEventRequest {
        #[prost(string, tag = "1")]
        pub event_name: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "2")]
        pub timestamp: ::core::option::Option<::prost_types::Timestamp>,
        /// 负载的 JSON 编码
        #[prost(string, tag = "3")]
        pub data: ::prost::alloc::string::String,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct SubmitEventResponse {
        #[prost(bool, tag = "1")]
        pub success: bool,
    }

    tonic::include_proto!("beacon.EventService");
}

use proto::event_service_client::EventServiceClient;
use proto::event_service_server::{EventService, EventServiceServer};
use proto::{SubmitEventRequest, SubmitEventResponse};

fn to_timestamp(ts: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: ts.timestamp(),
        nanos: ts.timestamp_subsec_nanos() as i32,
    }
}

fn from_timestamp(ts: Option<&prost_types::Timestamp>) -> Option<DateTime<Utc>> {
    let ts = ts?;
    DateTime::from_timestamp(ts.seconds, u32::try_from(ts.nanos).ok()?)
}

/// 解析请求头 `grpc-timeout`：1 到 8 位数字加单位（H/M/S/m/u/n）
fn grpc_timeout(metadata: &MetadataMap) -> Option<Duration> {
    let value = metadata.get("grpc-timeout")?.to_str().ok()?;
    if value.len() < 2 || value.len() > 9 {
        return None;
    }

    let (digits, unit) = value.split_at(value.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let timeout = match unit {
        "H" => Duration::from_secs(amount * 3600),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}

/// 基于 tonic `Channel` 的 gRPC 传输；`Channel` 可廉价克隆，并发调用安全
#[derive(Clone, Debug)]
pub struct RpcTransport {
    client: EventServiceClient<Channel>,
}

impl RpcTransport {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: EventServiceClient::new(channel),
        }
    }
}

#[async_trait]
impl Transport for RpcTransport {
    fn name(&self) -> &str {
        "rpc"
    }

    async fn forward(
        &self,
        ctx: &Context,
        event_name: &str,
        event: &Event,
    ) -> Result<(), TransportError> {
        let data = event.data().to_json().map_err(TransportError::encode)?;

        let mut request = Request::new(SubmitEventRequest {
            event_name: event_name.to_string(),
            timestamp: Some(to_timestamp(event.timestamp())),
            data: data.to_string(),
        });
        if let Some(remaining) = ctx.remaining() {
            request.set_timeout(remaining);
        }

        debug!(event_name, "SubmitEvent to remote");

        let response = self
            .client
            .clone()
            .submit_event(request)
            .await
            .map_err(|status| match status.code() {
                Code::Unavailable | Code::Unknown | Code::Cancelled | Code::DeadlineExceeded => {
                    TransportError::network(status)
                }
                _ => TransportError::rejected(status),
            })?;

        if !response.get_ref().success {
            return Err(TransportError::rejected("success=false"));
        }

        Ok(())
    }
}

/// gRPC 接收端：将收到的事件交给目标引擎的本地分发循环
pub struct RpcReceiver {
    engine: Arc<Engine>,
}

/// 构造可注册到 `tonic::transport::Server` 的事件服务
///
/// ```no_run
/// use beacon::{Engine, remote::rpc};
/// use std::sync::Arc;
///
/// # async fn serve() -> anyhow::Result<()> {
/// let engine = Arc::new(Engine::new());
/// tonic::transport::Server::builder()
///     .add_service(rpc::event_service(engine))
///     .serve("127.0.0.1:8941".parse()?)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub fn event_service(engine: Arc<Engine>) -> EventServiceServer<RpcReceiver> {
    EventServiceServer::new(RpcReceiver { engine })
}

fn status_from(err: Error) -> Status {
    match err {
        Error::InvalidArgument { .. } | Error::TypeMismatch { .. } => {
            Status::invalid_argument(err.to_string())
        }
        Error::Context(crate::context::ContextError::Cancelled) => {
            Status::cancelled(err.to_string())
        }
        Error::Context(crate::context::ContextError::DeadlineExceeded) => {
            Status::deadline_exceeded(err.to_string())
        }
        other => Status::internal(other.to_string()),
    }
}

#[async_trait]
impl EventService for RpcReceiver {
    async fn submit_event(
        &self,
        request: Request<SubmitEventRequest>,
    ) -> Result<Response<SubmitEventResponse>, Status> {
        let timeout = grpc_timeout(request.metadata());
        let req = request.into_inner();

        let data: serde_json::Value = if req.data.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&req.data).map_err(|e| {
                warn!(event_name = %req.event_name, error = %e, "could not decode remote payload");
                Status::invalid_argument(format!("could not decode payload: {e}"))
            })?
        };

        let timestamp = match from_timestamp(req.timestamp.as_ref()) {
            Some(ts) => ts,
            None => {
                warn!(
                    event_name = %req.event_name,
                    "missing or invalid remote timestamp, using local clock"
                );
                Utc::now()
            }
        };

        let ctx = match timeout {
            Some(timeout) => Context::background().with_timeout(timeout),
            None => Context::background().with_cancel(),
        };
        // 客户端取消或请求超时时 tonic 丢弃本 future，守卫随之取消上下文
        let _guard = ctx.drop_guard();

        let event = Event::at(ctx, timestamp, Payload::from(data));

        if let Err(e) = self.engine.dispatch(&req.event_name, event).await {
            warn!(event_name = %req.event_name, error = %e, "could not submit remote event");
            return Err(status_from(e));
        }

        Ok(Response::new(SubmitEventResponse { success: true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_round_trip_keeps_nanos() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let back = from_timestamp(Some(&to_timestamp(ts))).unwrap();
        assert_eq!(ts, back);
    }

    #[test]
    fn invalid_timestamp_is_rejected() {
        let bad = prost_types::Timestamp {
            seconds: 0,
            nanos: -1,
        };
        assert!(from_timestamp(Some(&bad)).is_none());
        assert!(from_timestamp(None).is_none());
    }

    #[test]
    fn grpc_timeout_header_is_parsed() {
        use tonic::metadata::MetadataValue;

        let mut metadata = MetadataMap::new();
        assert_eq!(grpc_timeout(&metadata), None);

        for (raw, expected) in [
            ("50m", Duration::from_millis(50)),
            ("49999u", Duration::from_micros(49_999)),
            ("2S", Duration::from_secs(2)),
            ("1H", Duration::from_secs(3600)),
        ] {
            metadata.insert("grpc-timeout", MetadataValue::from_static(raw));
            assert_eq!(grpc_timeout(&metadata), Some(expected), "{raw}");
        }

        for raw in ["m", "123456789m", "+5m", "10x"] {
            metadata.insert("grpc-timeout", MetadataValue::from_static(raw));
            assert_eq!(grpc_timeout(&metadata), None, "{raw}");
        }
    }

    #[test]
    fn status_mapping_follows_error_kind() {
        let s = status_from(Error::invalid_argument("event name is required"));
        assert_eq!(s.code(), Code::InvalidArgument);

        let s = status_from(Error::Handler(anyhow::anyhow!("boom")));
        assert_eq!(s.code(), Code::Internal);
        assert!(s.message().contains("boom"));

        let s = status_from(Error::Context(crate::context::ContextError::DeadlineExceeded));
        assert_eq!(s.code(), Code::DeadlineExceeded);
    }
}
