//! HTTP + JSON 传输
//!
//! 发送端将 `{event_name, event: {timestamp, data}}` 以 JSON POST 到远端，
//! 非 2xx 状态视为被拒绝。接收端 `receiver` 返回只接受 POST 的 axum 路由，
//! 解码后依次进入各引擎的本地分发循环。
//!
use crate::{
    context::Context, engine::Engine, error::TransportError, event::Event, payload::Payload,
    remote::Transport,
};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, post};
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// 线上格式：事件名与事件本体
#[derive(Debug, Serialize, Deserialize)]
pub struct RemoteHttpPayload {
    pub event_name: String,
    pub event: WireEvent,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Payload,
}

/// 基于 reqwest 的 HTTP 传输；客户端由调用方提供并可在多个引擎间共享
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn forward(
        &self,
        ctx: &Context,
        event_name: &str,
        event: &Event,
    ) -> Result<(), TransportError> {
        let body = serde_json::to_vec(&RemoteHttpPayload {
            event_name: event_name.to_string(),
            event: WireEvent {
                timestamp: event.timestamp(),
                data: event.data().clone(),
            },
        })
        .map_err(TransportError::encode)?;

        let mut builder = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(remaining) = ctx.remaining() {
            builder = builder.timeout(remaining);
        }
        let request = builder.build().map_err(TransportError::request)?;

        debug!(event_name, url = %self.url, "POST event to remote");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(TransportError::network)?;

        if !response.status().is_success() {
            return Err(TransportError::rejected(response.status()));
        }

        Ok(())
    }
}

/// 接收远程事件的 axum 路由，可挂载到任意路径
///
/// ```no_run
/// use axum::Router;
/// use beacon::{Engine, remote::http};
/// use std::sync::Arc;
///
/// let engine = Arc::new(Engine::new());
/// let app: Router = Router::new().route("/events", http::receiver([engine]));
/// ```
pub fn receiver<S>(engines: impl IntoIterator<Item = Arc<Engine>>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let engines: Arc<[Arc<Engine>]> = engines.into_iter().collect();

    post(move |body: Bytes| {
        let engines = engines.clone();
        async move { receive(&engines, body).await }
    })
}

async fn receive(engines: &[Arc<Engine>], body: Bytes) -> Response {
    let payload: RemoteHttpPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "could not decode remote event");
            return (StatusCode::BAD_REQUEST, "could not decode payload").into_response();
        }
    };

    let RemoteHttpPayload { event_name, event } = payload;

    // 客户端断开时 axum 丢弃本 future，守卫随之取消上下文
    let ctx = Context::background().with_cancel();
    let _guard = ctx.drop_guard();

    for engine in engines {
        let event = Event::at(ctx.clone(), event.timestamp, event.data.clone());
        if let Err(e) = engine.dispatch(&event_name, event).await {
            warn!(event_name = %event_name, error = %e, "could not submit remote event");
            return (StatusCode::INTERNAL_SERVER_ERROR, "could not submit event").into_response();
        }
    }

    StatusCode::OK.into_response()
}
