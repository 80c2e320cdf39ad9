//! The long-poll loop over a scripted transport.

use ferrogram::api::ApiError;
use ferrogram::sources::{Polling, PollingConfig, PollingError};
use ferrogram::testing::{MockTransport, message_update, mock_api_with};
use serde_json::json;
use std::time::Duration;

fn quick_config() -> PollingConfig {
    PollingConfig {
        timeout: Duration::from_secs(1),
        reconnect_after: Duration::from_millis(10),
        ..PollingConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn updates_flow_and_offset_advances() {
    let transport = MockTransport::new();
    let batch = serde_json::to_value(vec![
        message_update(10, 7, "one"),
        message_update(11, 7, "two"),
    ])
    .unwrap();
    transport.queue("getUpdates", Ok(batch));
    transport.queue("getUpdates", Ok(json!([])));
    let (api, calls) = mock_api_with(transport);

    let (mut rx, handle) = Polling::start(api, quick_config());
    assert_eq!(rx.recv().await.unwrap().update_id, 10);
    assert_eq!(rx.recv().await.unwrap().update_id, 11);

    handle.stop();
    handle.join().await.unwrap();

    let calls = calls.lock().unwrap();
    // First request starts unset, the one after the batch asks from 12.
    assert!(calls[0].1.get("offset").is_none());
    assert_eq!(calls[1].1["offset"], 12);
}

#[tokio::test(start_paused = true)]
async fn invalid_token_stops_polling_fatally() {
    let transport = MockTransport::new();
    transport.queue("getUpdates", Err(ApiError::InvalidToken));
    let (api, _) = mock_api_with(transport);

    let (_rx, handle) = Polling::start(api, quick_config());
    assert!(matches!(
        handle.join().await,
        Err(PollingError::InvalidToken)
    ));
}

#[tokio::test(start_paused = true)]
async fn repeated_failures_exhaust_reconnects() {
    // Unqueued methods answer `true`, which doesn't decode as a batch.
    let transport = MockTransport::new();
    let (api, calls) = mock_api_with(transport);

    let config = PollingConfig {
        max_reconnects: 2,
        reconnect_after: Duration::from_millis(10),
        ..quick_config()
    };
    let (_rx, handle) = Polling::start(api, config);

    // Gives up on the second consecutive failure, not after it.
    let result = handle.join().await;
    assert!(matches!(
        result,
        Err(PollingError::ReconnectsExhausted { attempts: 2, .. })
    ));
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn rate_limits_pause_then_resume() {
    let transport = MockTransport::new();
    transport.queue("getUpdates", Err(ApiError::RateLimited { retry_after: 3 }));
    transport.queue(
        "getUpdates",
        Ok(serde_json::to_value(vec![message_update(1, 7, "late")]).unwrap()),
    );
    let (api, _) = mock_api_with(transport);

    let started = tokio::time::Instant::now();
    let (mut rx, handle) = Polling::start(api, quick_config());
    let update = rx.recv().await.unwrap();
    assert_eq!(update.text(), Some("late"));
    // The retry_after pause was honored before the next request.
    assert!(started.elapsed() >= Duration::from_secs(3));

    handle.stop();
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn skip_updates_fast_forwards_the_offset() {
    let transport = MockTransport::new();
    // The drain request sees the newest pending update...
    transport.queue(
        "getUpdates",
        Ok(serde_json::to_value(vec![message_update(55, 7, "stale")]).unwrap()),
    );
    // ...and the first real poll starts past it.
    transport.queue("getUpdates", Ok(json!([])));
    let (api, calls) = mock_api_with(transport);

    let config = PollingConfig {
        skip_updates: true,
        ..quick_config()
    };
    let (mut rx, handle) = Polling::start(api, config);

    // Nothing stale is delivered.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());

    handle.stop();
    handle.join().await.unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].1["timeout"], 0);
    assert_eq!(calls[1].1["offset"], 56);
}
