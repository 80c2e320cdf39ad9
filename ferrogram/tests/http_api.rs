//! HTTP transport behavior against a scripted server.

use ferrogram::api::{Api, ApiError, GetUpdates, Token};
use serde_json::json;

fn token() -> Token {
    Token::new("42:TEST").unwrap()
}

#[tokio::test]
async fn get_updates_decodes_a_batch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/bot42:TEST/getUpdates")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "ok": true,
                "result": [
                    {
                        "update_id": 100,
                        "message": {
                            "message_id": 1,
                            "from": {"id": 7, "is_bot": false, "first_name": "Ada"},
                            "chat": {"id": 7, "type": "private", "first_name": "Ada"},
                            "date": 1_700_000_000,
                            "text": "/ping"
                        }
                    },
                    {"update_id": 101, "poll": {
                        "id": "p1", "question": "?", "options": [],
                        "total_voter_count": 0, "is_closed": false, "is_anonymous": true
                    }}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let api = Api::with_base(token(), server.url());
    let updates = api.get_updates(&GetUpdates::default()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].update_id, 100);
    assert_eq!(updates[0].text(), Some("/ping"));
    assert!(updates[1].poll.is_some());
}

#[tokio::test]
async fn rate_limit_is_surfaced_without_retry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/bot42:TEST/getUpdates")
        .with_status(429)
        .with_body(
            json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 9",
                "parameters": {"retry_after": 9}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let api = Api::with_base(token(), server.url());
    let err = api.get_updates(&GetUpdates::default()).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, ApiError::RateLimited { retry_after: 9 }));
}

#[tokio::test]
async fn http_401_means_invalid_token() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/bot42:TEST/getMe")
        .with_status(401)
        .with_body(json!({"ok": false, "error_code": 401, "description": "Unauthorized"}).to_string())
        .create_async()
        .await;

    let api = Api::with_base(token(), server.url());
    let err = api.get_me().await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidToken));
}

#[tokio::test]
async fn server_errors_are_retried_exactly_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/bot42:TEST/getUpdates")
        .with_status(500)
        .with_body(
            json!({"ok": false, "error_code": 500, "description": "Internal"}).to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let api = Api::with_base(token(), server.url());
    let err = api.get_updates(&GetUpdates::default()).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, ApiError::Telegram { code: 500, .. }));
}

#[tokio::test]
async fn send_message_posts_the_expected_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/bot42:TEST/sendMessage")
        .match_body(mockito::Matcher::PartialJson(json!({
            "chat_id": 7,
            "text": "hello",
            "parse_mode": "HTML"
        })))
        .with_status(200)
        .with_body(json!({"ok": true, "result": {"message_id": 5}}).to_string())
        .create_async()
        .await;

    let api = Api::with_base(token(), server.url());
    api.send_message(7, "hello", json!({"parse_mode": "HTML"}))
        .await
        .unwrap();
    mock.assert_async().await;
}

#[test]
fn file_urls_embed_the_token() {
    let api = Api::with_base(token(), "https://example.org");
    assert_eq!(
        api.file_url("photos/file_1.jpg"),
        "https://example.org/file/bot42:TEST/photos/file_1.jpg"
    );
}
