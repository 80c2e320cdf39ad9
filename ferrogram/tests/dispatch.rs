//! End-to-end dispatch behavior over a mock transport.

mod common;

use common::RecordingMiddleware;
use ferrogram::dispatch::{Dispatcher, HandlerCx, HandlerEntry, Reply, View, extract};
use ferrogram::rules::{Command, Markup, Text};
use ferrogram::testing::{message_update, mock_api};
use ferrogram::types::Message;
use ferrogram::Rule;
use thiserror::Error;

#[tokio::test]
async fn ping_gets_ponged() {
    let dispatcher = Dispatcher::new()
        .view(View::message().on(Command::new("ping"), |_cx: HandlerCx| async { "pong" }));
    let (api, calls) = mock_api();

    assert!(dispatcher.feed(&api, message_update(1, 7, "/ping")).await);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "sendMessage");
    assert_eq!(calls[0].1["chat_id"], 7);
    assert_eq!(calls[0].1["text"], "pong");
}

#[tokio::test]
async fn markup_captures_drive_the_handler() {
    let dispatcher = Dispatcher::new().view(View::message().on(
        Markup::new("/split <text:sentence> <sep:char> <count:int>").unwrap(),
        |cx: HandlerCx| async move {
            let text = cx.get::<String>("text").unwrap();
            let sep = *cx.get::<char>("sep").unwrap();
            let count = *cx.get::<i64>("count").unwrap();
            let pieces: Vec<&str> = text.splitn(count as usize + 1, sep).collect();
            pieces.join(" | ")
        },
    ));
    let (api, calls) = mock_api();

    assert!(
        dispatcher
            .feed(&api, message_update(1, 7, "/split 'hello,_my_friend' _ 1"))
            .await
    );
    assert_eq!(calls.lock().unwrap()[0].1["text"], "hello, | my_friend");
}

#[tokio::test]
async fn extractor_handlers_work_in_views() {
    let dispatcher = Dispatcher::new().view(View::message().on(
        Command::new("whoami"),
        extract(|message: Message| async move {
            format!("you are {}", message.from.map(|u| u.id).unwrap_or(0))
        }),
    ));
    let (api, calls) = mock_api();

    assert!(dispatcher.feed(&api, message_update(1, 99, "/whoami")).await);
    assert_eq!(calls.lock().unwrap()[0].1["text"], "you are 99");
}

#[derive(Error, Debug)]
#[error("storage failed: {0}")]
struct StorageError(&'static str);

#[tokio::test]
async fn typed_error_handler_answers_for_the_failed_handler() {
    let dispatcher = Dispatcher::new().view(
        View::message()
            .on(Text::eq("boom"), |_cx: HandlerCx| async {
                Err::<Reply, StorageError>(StorageError("db down"))
            })
            .on_error::<StorageError>(|cx: HandlerCx| async move {
                let err = cx.error.as_ref().unwrap();
                format!("sorry: {err}")
            }),
    );
    let (api, calls) = mock_api();

    assert!(dispatcher.feed(&api, message_update(1, 7, "boom")).await);
    assert_eq!(
        calls.lock().unwrap()[0].1["text"],
        "sorry: storage failed: db down"
    );
}

#[tokio::test]
async fn mismatched_error_type_falls_through_to_catch_all() {
    #[derive(Error, Debug)]
    #[error("other")]
    struct OtherError;

    let dispatcher = Dispatcher::new().view(
        View::message()
            .on(Text::eq("boom"), |_cx: HandlerCx| async {
                Err::<Reply, StorageError>(StorageError("db down"))
            })
            .on_error::<OtherError>(|_cx: HandlerCx| async { "wrong bucket" })
            .on_any_error(|_cx: HandlerCx| async { "caught" }),
    );
    let (api, calls) = mock_api();

    dispatcher.feed(&api, message_update(1, 7, "boom")).await;
    assert_eq!(calls.lock().unwrap()[0].1["text"], "caught");
}

#[tokio::test]
async fn vetoing_middleware_blocks_handlers_and_post_hooks() {
    let veto = RecordingMiddleware::vetoing();
    let dispatcher = Dispatcher::new().view(
        View::message()
            .middleware(veto.clone())
            .on(Text::eq("hi"), |_cx: HandlerCx| async { "hello" }),
    );
    let (api, calls) = mock_api();

    assert!(!dispatcher.feed(&api, message_update(1, 7, "hi")).await);
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(*veto.pre_seen.lock().unwrap(), vec![1]);
    assert!(veto.post_replies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn post_middleware_sees_all_replies_of_the_view() {
    let recorder = RecordingMiddleware::passing();
    let dispatcher = Dispatcher::new().view(
        View::message()
            .middleware(recorder.clone())
            .entry(
                HandlerEntry::new(|_cx: HandlerCx| async { "first" })
                    .rule(Text::eq("hi"))
                    .passthrough(),
            )
            .on(Text::eq("hi"), |_cx: HandlerCx| async { "second" }),
    );
    let (api, calls) = mock_api();

    assert!(dispatcher.feed(&api, message_update(1, 7, "hi")).await);
    // Both handlers ran (the first was passthrough) and both replied.
    assert_eq!(calls.lock().unwrap().len(), 2);
    let posts = recorder.post_replies.lock().unwrap();
    assert_eq!(
        posts[0],
        vec![
            Reply::Text("first".into()),
            Reply::Text("second".into())
        ]
    );
}

#[tokio::test]
async fn preset_pairs_reach_the_handler_context() {
    let dispatcher = Dispatcher::new().view(
        View::message().entry(
            HandlerEntry::new(|cx: HandlerCx| async move {
                format!("greeting: {}", cx.get::<String>("greeting").unwrap())
            })
            .rule(Text::eq("hi"))
            .preset("greeting", "ahoy".to_string()),
        ),
    );
    let (api, calls) = mock_api();

    assert!(dispatcher.feed(&api, message_update(1, 7, "hi")).await);
    assert_eq!(calls.lock().unwrap()[0].1["text"], "greeting: ahoy");
}

#[tokio::test]
async fn final_entry_stops_later_handlers() {
    let dispatcher = Dispatcher::new().view(
        View::message()
            .on(Text::eq("hi"), |_cx: HandlerCx| async { "first" })
            .on(Text::eq("hi"), |_cx: HandlerCx| async { "never" }),
    );
    let (api, calls) = mock_api();

    dispatcher.feed(&api, message_update(1, 7, "hi")).await;
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1["text"], "first");
}

#[tokio::test]
async fn failed_rule_chain_leaves_context_clean_for_later_entries() {
    let dispatcher = Dispatcher::new().view(
        View::message()
            .on(
                Markup::new("<n:int>").unwrap().and(Text::eq("impossible")),
                |_cx: HandlerCx| async { "unreachable" },
            )
            .fallback(|cx: HandlerCx| async move {
                // The failed first entry's capture must not leak here.
                match cx.get::<i64>("n") {
                    Some(_) => "leaked",
                    None => "clean",
                }
            }),
    );
    let (api, calls) = mock_api();

    dispatcher.feed(&api, message_update(1, 7, "42")).await;
    assert_eq!(calls.lock().unwrap()[0].1["text"], "clean");
}
