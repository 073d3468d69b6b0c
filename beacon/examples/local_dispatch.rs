/// 进程内分发示例
/// 展示闭包/trait 处理器、取消后续处理器、调用方超时与强类型处理器
use anyhow::Result as AnyResult;
use beacon::{Context, Engine, Event, EventHandler, Payload};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct UserRegistered {
    id: u64,
    email: String,
}

struct Audit;

#[async_trait::async_trait]
impl EventHandler for Audit {
    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        tracing::info!(at = %event.timestamp(), payload = event.data().type_name(), "audit");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,beacon=debug".into()),
        )
        .init();

    let engine = Engine::new();

    // 第一个处理器拦截管理员地址，后续处理器不再执行
    engine.subscribe("signup", |e: Event| async move {
        let email: String = e.data().decode()?;
        if email.ends_with("@admin.local") {
            println!("admin signup handled, stopping chain");
            e.cancel();
        }
        anyhow::Ok(())
    });
    engine.subscribe("signup", |e: Event| async move {
        println!("welcome mail to {}", e.data().decode::<String>()?);
        anyhow::Ok(())
    });
    engine.subscribe_handler("signup", Arc::new(Audit));

    engine.submit("signup", Payload::new("alice@example.com")).await?;
    engine.submit("signup", Payload::new("root@admin.local")).await?;

    // 调用方只等待 50ms，处理器仍在后台完成
    engine.subscribe("report", |_| async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        println!("report finished in background");
        anyhow::Ok(())
    });
    let ctx = Context::background().with_timeout(Duration::from_millis(50));
    let res = engine.submit_with_context(&ctx, "report", Payload::none()).await;
    println!("report submit returned: {res:?}");

    // 强类型处理器：事件名即类型全名
    engine.subscribe_typed(|user: Arc<UserRegistered>| async move {
        println!("typed handler got user #{} <{}>", user.id, user.email);
        anyhow::Ok(())
    });
    engine
        .submit_typed(UserRegistered {
            id: 1,
            email: "alice@example.com".into(),
        })
        .await?;

    println!("registered events: {:?}", engine.event_names());
    tokio::time::sleep(Duration::from_millis(250)).await;
    Ok(())
}
