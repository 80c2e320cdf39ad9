//! Conversation funnels built on the waiter machine.

use ferrogram::dispatch::{Dispatcher, HandlerCx, View};
use ferrogram::rules::{Command, HasText, Text};
use ferrogram::testing::{message_update, mock_api};
use ferrogram::types::Update;
use ferrogram::waiters::{MESSAGE_FROM_USER, WaitOptions, WaitResult};
use ferrogram_core::Context;
use std::sync::Arc;
use std::time::Duration;

fn funnel_dispatcher() -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new().view(
        View::message()
            .on(Command::new("name"), |cx: HandlerCx| async move {
                let result = cx
                    .waiters
                    .wait(
                        &[MESSAGE_FROM_USER],
                        &cx.update,
                        HasText,
                        &cx.ctx,
                        WaitOptions::new().deadline(Duration::from_secs(60)),
                    )
                    .await;
                match result {
                    WaitResult::Delivered { update, .. } => {
                        format!("hello, {}", update.text().unwrap_or("?"))
                    }
                    WaitResult::Timeout => "too slow".to_string(),
                    WaitResult::Cancelled => "bye".to_string(),
                }
            })
            .on(Text::eq("Alice"), |_cx: HandlerCx| async {
                "this handler must not see funnel traffic"
            }),
    ))
}

#[tokio::test]
async fn funnel_claims_the_next_message_from_the_same_user() {
    let dispatcher = funnel_dispatcher();
    let (api, calls) = mock_api();

    let first = {
        let dispatcher = Arc::clone(&dispatcher);
        let api = api.clone();
        tokio::spawn(async move { dispatcher.feed(&api, message_update(1, 7, "/name")).await })
    };
    while dispatcher.waiters().pending() == 0 {
        tokio::task::yield_now().await;
    }

    // The reply lands in the waiting handler, not the `Alice` handler.
    assert!(dispatcher.feed(&api, message_update(2, 7, "Alice")).await);
    assert!(first.await.unwrap());

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1["text"], "hello, Alice");
}

#[tokio::test]
async fn other_users_bypass_the_funnel() {
    let dispatcher = funnel_dispatcher();
    let (api, calls) = mock_api();

    let first = {
        let dispatcher = Arc::clone(&dispatcher);
        let api = api.clone();
        tokio::spawn(async move { dispatcher.feed(&api, message_update(1, 7, "/name")).await })
    };
    while dispatcher.waiters().pending() == 0 {
        tokio::task::yield_now().await;
    }

    // A different user saying "Alice" hits the regular handler.
    assert!(dispatcher.feed(&api, message_update(2, 8, "Alice")).await);
    assert_eq!(
        calls.lock().unwrap()[0].1["text"],
        "this handler must not see funnel traffic"
    );

    // The funnel is still waiting; feed it and let the task finish.
    assert!(dispatcher.feed(&api, message_update(3, 7, "Bob")).await);
    assert!(first.await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn funnel_times_out_when_the_user_goes_quiet() {
    let dispatcher = funnel_dispatcher();
    let (api, calls) = mock_api();

    let first = {
        let dispatcher = Arc::clone(&dispatcher);
        let api = api.clone();
        tokio::spawn(async move { dispatcher.feed(&api, message_update(1, 7, "/name")).await })
    };
    while dispatcher.waiters().pending() == 0 {
        tokio::task::yield_now().await;
    }

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(first.await.unwrap());
    assert_eq!(calls.lock().unwrap()[0].1["text"], "too slow");
}

#[tokio::test]
async fn shutdown_cancels_a_waiting_funnel() {
    let dispatcher = funnel_dispatcher();
    let (api, calls) = mock_api();

    let first = {
        let dispatcher = Arc::clone(&dispatcher);
        let api = api.clone();
        tokio::spawn(async move { dispatcher.feed(&api, message_update(1, 7, "/name")).await })
    };
    while dispatcher.waiters().pending() == 0 {
        tokio::task::yield_now().await;
    }

    dispatcher.shutdown().await;
    assert!(first.await.unwrap());
    assert_eq!(calls.lock().unwrap()[0].1["text"], "bye");
}

#[tokio::test]
async fn release_rule_context_reaches_the_handler() {
    let dispatcher = Arc::new(Dispatcher::new().view(View::message().on(
        Command::new("pick"),
        |cx: HandlerCx| async move {
            let result = cx
                .waiters
                .wait(
                    &[MESSAGE_FROM_USER],
                    &cx.update,
                    |update: &Update, ctx: &Context| {
                        let Some(text) = update.text() else { return false };
                        let ok = text.starts_with("color ");
                        if ok {
                            ctx.set("color", text["color ".len()..].to_string());
                        }
                        ok
                    },
                    &cx.ctx,
                    WaitOptions::new(),
                )
                .await;
            match result {
                WaitResult::Delivered { context, .. } => {
                    format!("picked {}", context.get::<String>("color").unwrap())
                }
                _ => "no pick".to_string(),
            }
        },
    )));
    let (api, calls) = mock_api();

    let first = {
        let dispatcher = Arc::clone(&dispatcher);
        let api = api.clone();
        tokio::spawn(async move { dispatcher.feed(&api, message_update(1, 7, "/pick")).await })
    };
    while dispatcher.waiters().pending() == 0 {
        tokio::task::yield_now().await;
    }

    assert!(dispatcher.feed(&api, message_update(2, 7, "color teal")).await);
    first.await.unwrap();
    assert_eq!(calls.lock().unwrap()[0].1["text"], "picked teal");
}
