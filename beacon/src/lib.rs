//! 进程内事件发布/订阅库（beacon）
//!
//! 组件以事件名注册处理器，发布方以同一个 `submit` 调用发布事件，
//! 无论处理器在本地还是在远端：
//! - `Engine`：处理器注册表与分发协议，支持协作式取消与调用方超时；
//! - `Event`/`Payload`：不可变事件记录与类型擦除的负载；
//! - `remote`：可插拔远程传输（HTTP + JSON 独占转发，gRPC 转发并本地分发）；
//! - `typed`：以负载类型推导事件名，并带运行时类型检查的强类型处理器。
//!
//! 典型用法：
//! ```rust
//! use beacon::{Engine, Payload};
//!
//! # async fn run() -> beacon::Result<()> {
//! let engine = Engine::new();
//! engine.subscribe("greet", |e| async move {
//!     let name: String = e.data().decode()?;
//!     println!("hello {name}");
//!     anyhow::Ok(())
//! });
//! engine.submit("greet", Payload::new("world")).await?;
//! # Ok(())
//! # }
//! ```
//!
pub mod context;
pub mod engine;
pub mod error;
pub mod event;
pub mod handler;
pub mod payload;
mod registry;
pub mod remote;
pub mod typed;

pub use context::{Context, ContextError};
pub use engine::Engine;
pub use error::{Error, Result, TransportError};
pub use event::Event;
pub use handler::{EventHandler, HandlerFn};
pub use payload::Payload;
pub use remote::{Transport, TransportPolicy};
pub use typed::TypedEvent;
