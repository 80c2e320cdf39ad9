//! Long polling against `getUpdates`.

use crate::{
    api::{Api, ApiError, GetUpdates},
    types::Update,
};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Why the polling loop stopped on its own.
#[derive(Error, Debug)]
pub enum PollingError {
    /// The server rejected the token. Never retried.
    #[error("bot token rejected; polling stopped")]
    InvalidToken,

    /// Consecutive reconnect attempts ran out.
    #[error("giving up after {attempts} failed reconnect attempts")]
    ReconnectsExhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The last failure.
        #[source]
        source: ApiError,
    },
}

/// Knobs of the polling loop.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Long-poll timeout handed to `getUpdates`.
    pub timeout: Duration,
    /// Batch size limit (1..=100).
    pub limit: u32,
    /// Update kinds to receive; `None` means server default.
    pub allowed_updates: Option<Vec<String>>,
    /// Pause between reconnect attempts.
    pub reconnect_after: Duration,
    /// Consecutive failures at which the loop gives up.
    pub max_reconnects: u32,
    /// Drop the backlog accumulated while the bot was down.
    pub skip_updates: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            limit: 100,
            allowed_updates: None,
            reconnect_after: Duration::from_secs(5),
            max_reconnects: 15,
            skip_updates: false,
        }
    }
}

/// Handle to a running polling loop.
pub struct PollingHandle {
    stop: watch::Sender<bool>,
    task: tokio::task::JoinHandle<Result<(), PollingError>>,
}

impl PollingHandle {
    /// Ask the loop to stop after its current request.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Wait for the loop to finish.
    pub async fn join(self) -> Result<(), PollingError> {
        match self.task.await {
            Ok(result) => result,
            Err(join_err) => {
                tracing::error!(error = %join_err, "polling task aborted");
                Ok(())
            }
        }
    }
}

/// The long-polling update source.
pub struct Polling;

impl Polling {
    /// Spawn the polling loop; updates arrive on the returned channel.
    ///
    /// The loop stops when the handle says so, when the receiver is
    /// dropped, or fatally per [`PollingError`]. Rate limits honor the
    /// server's `retry_after`; other failures back off by
    /// `reconnect_after` and the loop gives up on the `max_reconnects`-th
    /// consecutive failure.
    pub fn start(api: Api, config: PollingConfig) -> (mpsc::Receiver<Update>, PollingHandle) {
        let (tx, rx) = mpsc::channel(config.limit.max(1) as usize);
        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run(api, config, tx, stop_rx));
        (rx, PollingHandle { stop, task })
    }
}

async fn run(
    api: Api,
    config: PollingConfig,
    tx: mpsc::Sender<Update>,
    mut stop: watch::Receiver<bool>,
) -> Result<(), PollingError> {
    let mut offset: Option<i64> = None;

    if config.skip_updates {
        offset = skip_backlog(&api).await;
    }

    let mut failures: u32 = 0;
    loop {
        let params = GetUpdates {
            offset,
            timeout: Some(config.timeout.as_secs()),
            limit: Some(config.limit),
            allowed_updates: config.allowed_updates.clone(),
        };

        let batch = tokio::select! {
            biased;
            _ = stop.changed() => return Ok(()),
            result = api.get_updates(&params) => result,
        };

        match batch {
            Ok(updates) => {
                failures = 0;
                for update in updates {
                    offset = Some(offset.unwrap_or(0).max(update.update_id + 1));
                    if tx.send(update).await.is_err() {
                        // Receiver gone: the dispatcher shut down.
                        return Ok(());
                    }
                }
            }
            Err(ApiError::RateLimited { retry_after }) => {
                tracing::warn!(retry_after, "rate limited on getUpdates");
                if sleep_or_stop(Duration::from_secs(retry_after), &mut stop).await {
                    return Ok(());
                }
            }
            Err(ApiError::InvalidToken) => {
                tracing::error!("token rejected, stopping polling");
                return Err(PollingError::InvalidToken);
            }
            Err(err) => {
                failures += 1;
                tracing::warn!(error = %err, attempt = failures, "getUpdates failed");
                if failures >= config.max_reconnects {
                    return Err(PollingError::ReconnectsExhausted {
                        attempts: failures,
                        source: err,
                    });
                }
                if sleep_or_stop(config.reconnect_after, &mut stop).await {
                    return Ok(());
                }
            }
        }
    }
}

/// Drain pending updates with a zero timeout and return the next offset.
async fn skip_backlog(api: &Api) -> Option<i64> {
    let params = GetUpdates {
        offset: Some(-1),
        timeout: Some(0),
        limit: Some(1),
        allowed_updates: None,
    };
    match api.get_updates(&params).await {
        Ok(updates) => {
            let next = updates.iter().map(|u| u.update_id + 1).max();
            if let Some(next) = next {
                tracing::info!(offset = next, "skipped pending updates");
            }
            next
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not skip pending updates");
            None
        }
    }
}

async fn sleep_or_stop(duration: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        biased;
        _ = stop.changed() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}
