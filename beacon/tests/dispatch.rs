use anyhow::Result as AnyResult;
use async_trait::async_trait;
use beacon::{Context, ContextError, Engine, Error, Event, EventHandler, Payload};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default, Serialize)]
struct Counter {
    count: AtomicUsize,
}

struct Increment;

#[async_trait]
impl EventHandler for Increment {
    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        let counter = event
            .data()
            .downcast_ref::<Counter>()
            .ok_or_else(|| anyhow::anyhow!("expected Counter, got {}", event.data().type_name()))?;
        counter.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn subscribe_counts_distinct_names() {
    let engine = Engine::new();
    engine.subscribe("test", |_| async { anyhow::Ok(()) });
    engine.subscribe("test", |_| async { anyhow::Ok(()) });
    assert_eq!(engine.size(), 1);

    engine.subscribe("other", |_| async { anyhow::Ok(()) });
    assert_eq!(engine.size(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_invokes_handler() -> AnyResult<()> {
    let engine = Engine::new();
    let success = Arc::new(AtomicBool::new(false));
    {
        let success = success.clone();
        engine.subscribe("test", move |_| {
            let success = success.clone();
            async move {
                success.store(true, Ordering::SeqCst);
                anyhow::Ok(())
            }
        });
    }

    engine.submit("test", Payload::none()).await?;
    assert!(success.load(Ordering::SeqCst));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn counter_is_incremented_once_per_submit() -> AnyResult<()> {
    let engine = Engine::new();
    engine.subscribe_handler("increment", Arc::new(Increment));

    let counter = Arc::new(Counter::default());
    let payload = Payload::shared(counter.clone());
    for _ in 0..3 {
        engine.submit("increment", payload.clone()).await?;
    }

    assert_eq!(counter.count.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_event_name_has_no_side_effect() -> AnyResult<()> {
    let engine = Engine::new();
    let called = Arc::new(AtomicBool::new(false));
    {
        let called = called.clone();
        engine.subscribe("test", move |_| {
            let called = called.clone();
            async move {
                called.store(true, Ordering::SeqCst);
                anyhow::Ok(())
            }
        });
    }

    engine.submit("does not exist", Payload::none()).await?;
    assert!(!called.load(Ordering::SeqCst));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_stops_remaining_handlers_without_error() -> AnyResult<()> {
    let engine = Engine::new();
    let counter = Arc::new(AtomicUsize::new(0));

    for cancel in [true, false] {
        let counter = counter.clone();
        engine.subscribe("test", move |e: Event| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if cancel {
                    e.cancel();
                }
                anyhow::Ok(())
            }
        });
    }

    engine.submit("test", Payload::none()).await?;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn handler_error_is_returned_unchanged() {
    #[derive(Debug, thiserror::Error)]
    #[error("some error message")]
    struct Boom;

    let engine = Engine::new();
    engine.subscribe("test", |_| async { Err(anyhow::Error::new(Boom)) });

    let err = engine.submit("test", Payload::none()).await.unwrap_err();
    match err {
        Error::Handler(inner) => assert!(inner.downcast_ref::<Boom>().is_some()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn context_timeout_returns_deadline_exceeded() {
    let engine = Engine::new();
    engine.subscribe("test", |e: Event| async move {
        // 处理器阻塞直至上下文结束
        e.context().done().await;
        anyhow::Ok(())
    });

    let ctx = Context::background().with_timeout(Duration::from_millis(1));
    let err = engine
        .submit_with_context(&ctx, "test", Payload::none())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Context(ContextError::DeadlineExceeded)));
}

#[tokio::test(flavor = "multi_thread")]
async fn caller_wait_is_bounded_while_handler_keeps_running() {
    let engine = Engine::new();
    let finished = Arc::new(AtomicBool::new(false));
    {
        let finished = finished.clone();
        engine.subscribe("slow", move |_| {
            let finished = finished.clone();
            async move {
                // 不观察上下文的处理器不会被打断
                tokio::time::sleep(Duration::from_millis(100)).await;
                finished.store(true, Ordering::SeqCst);
                anyhow::Ok(())
            }
        });
    }

    let ctx = Context::background().with_timeout(Duration::from_millis(10));
    let err = engine
        .submit_with_context(&ctx, "slow", Payload::none())
        .await
        .unwrap_err();
    assert!(err.is_context());
    assert!(!finished.load(Ordering::SeqCst));

    tokio::time::timeout(Duration::from_secs(2), async {
        while !finished.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("background handler should still complete");
}

#[tokio::test(flavor = "multi_thread")]
async fn context_cancelled_mid_chain_stops_before_next_handler() {
    let engine = Engine::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let ctx = Context::background().with_cancel();

    {
        let log = log.clone();
        let ctx = ctx.clone();
        engine.subscribe("chain", move |_| {
            let log = log.clone();
            let ctx = ctx.clone();
            async move {
                log.lock().unwrap().push("first");
                ctx.cancel();
                anyhow::Ok(())
            }
        });
    }
    {
        let log = log.clone();
        engine.subscribe("chain", move |_| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push("second");
                anyhow::Ok(())
            }
        });
    }

    let err = engine
        .submit_with_context(&ctx, "chain", Payload::none())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Context(ContextError::Cancelled)));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*log.lock().unwrap(), vec!["first"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_subscribe_and_submit_are_safe() {
    let engine = Arc::new(Engine::new());
    let hits = Arc::new(AtomicUsize::new(0));
    let mut set = tokio::task::JoinSet::new();

    for i in 0..50 {
        let engine = engine.clone();
        let hits = hits.clone();
        set.spawn(async move {
            engine.subscribe(format!("e{}", i % 5), move |_| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    anyhow::Ok(())
                }
            });
            engine.submit(&format!("e{}", i % 5), Payload::none()).await
        });
    }

    while let Some(res) = set.join_next().await {
        res.unwrap().unwrap();
    }

    assert_eq!(engine.size(), 5);
    assert!(hits.load(Ordering::SeqCst) >= 50);
}
