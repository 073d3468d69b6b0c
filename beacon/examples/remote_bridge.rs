/// 远程转发示例
/// 同一进程内启动 HTTP 与 gRPC 接收端，分别由独占转发（HTTP）与双写（gRPC）引擎发布事件
use anyhow::Result as AnyResult;
use axum::Router;
use beacon::remote::{http, rpc};
use beacon::{Engine, Event, Payload};
use std::sync::Arc;
use tokio_stream::wrappers::TcpListenerStream;

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,beacon=debug".into()),
        )
        .init();

    let receiver = Arc::new(Engine::new());
    receiver.subscribe("order.created", |e: Event| async move {
        println!(
            "receiver got order.created at {}: {}",
            e.timestamp(),
            e.data().to_json()?
        );
        anyhow::Ok(())
    });

    // HTTP 接收端
    let app: Router = Router::new().route("/events", http::receiver([receiver.clone()]));
    let http_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let http_addr = http_listener.local_addr()?;
    tokio::spawn(async move { axum::serve(http_listener, app).await });

    // gRPC 接收端
    let rpc_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let rpc_addr = rpc_listener.local_addr()?;
    tokio::spawn(
        tonic::transport::Server::builder()
            .add_service(rpc::event_service(receiver.clone()))
            .serve_with_incoming(TcpListenerStream::new(rpc_listener)),
    );

    let via_http = Engine::builder()
        .http_remote(reqwest::Client::new(), format!("http://{http_addr}/events"))
        .build();
    via_http
        .submit("order.created", serde_json::json!({"id": 1, "via": "http"}))
        .await?;

    let channel = tonic::transport::Endpoint::from_shared(format!("http://{rpc_addr}"))?
        .connect()
        .await?;
    let via_rpc = Engine::builder().rpc_remote(channel).build();
    via_rpc.subscribe("order.created", |_| async {
        println!("sender handled order.created locally after forwarding");
        anyhow::Ok(())
    });
    via_rpc
        .submit("order.created", Payload::new(serde_json::json!({"id": 2, "via": "rpc"})))
        .await?;

    Ok(())
}
