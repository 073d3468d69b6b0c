//! 远程传输子系统（remote）
//!
//! - `Transport`/`TransportPolicy`：转发协议与引擎策略；
//! - `http`：HTTP + JSON，发送端独占转发，接收端为 axum 路由；
//! - `rpc`：gRPC，发送端转发后仍本地分发，接收端为 tonic 服务。
//!
//! 接收端解码后直接进入本地分发循环，不会再次转发。
//!
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "rpc")]
pub mod rpc;
pub mod transport;

pub use transport::{Transport, TransportPolicy};
