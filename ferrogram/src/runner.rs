//! # Runner
//!
//! [`LoopWrapper`] owns the outer lifecycle of a bot: startup hooks,
//! background timers, the update-consuming loop with one task per
//! update, and ordered shutdown (stop source, cancel waiters, tear down
//! global nodes, run shutdown hooks).

use crate::{
    api::Api,
    dispatch::Dispatcher,
    sources::{Polling, PollingConfig, PollingError},
    types::Update,
};
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Hook = Box<dyn Fn(Api) -> HookFuture + Send + Sync>;

struct TimerSpec {
    interval: Duration,
    repeat: bool,
    task: Arc<dyn Fn(Api) -> HookFuture + Send + Sync>,
}

/// Requests a graceful stop of a running [`LoopWrapper`].
#[derive(Clone)]
pub struct StopHandle {
    stop: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Stop the loop after in-flight updates are spawned.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

/// The outer run loop around a [`Dispatcher`].
pub struct LoopWrapper {
    dispatcher: Arc<Dispatcher>,
    startup: Vec<Hook>,
    shutdown: Vec<Hook>,
    timers: Vec<TimerSpec>,
    ctrl_c: bool,
    stop: Arc<watch::Sender<bool>>,
}

impl LoopWrapper {
    /// Wrap `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            dispatcher: Arc::new(dispatcher),
            startup: Vec::new(),
            shutdown: Vec::new(),
            timers: Vec::new(),
            ctrl_c: false,
            stop: Arc::new(stop),
        }
    }

    /// Run `hook` before the first update is consumed. Hooks run in
    /// registration order.
    pub fn on_startup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Api) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.startup
            .push(Box::new(move |api| Box::pin(hook(api)) as HookFuture));
        self
    }

    /// Run `hook` after the loop has drained. Hooks run in registration
    /// order.
    pub fn on_shutdown<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Api) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.shutdown
            .push(Box::new(move |api| Box::pin(hook(api)) as HookFuture));
        self
    }

    /// Run `task` every `interval`, first firing one interval after
    /// startup. With `repeat` false the timer fires once.
    pub fn timer<F, Fut>(mut self, interval: Duration, repeat: bool, task: F) -> Self
    where
        F: Fn(Api) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.timers.push(TimerSpec {
            interval,
            repeat,
            task: Arc::new(move |api| Box::pin(task(api)) as HookFuture),
        });
        self
    }

    /// Also stop on Ctrl-C.
    pub fn enable_ctrl_c(mut self) -> Self {
        self.ctrl_c = true;
        self
    }

    /// A handle that can stop the loop from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
        }
    }

    /// The wrapped dispatcher.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Long-poll for updates and dispatch until stopped or the source
    /// fails fatally.
    pub async fn run_polling(self, api: Api, config: PollingConfig) -> Result<(), PollingError> {
        let (rx, handle) = Polling::start(api.clone(), config);
        self.run_with_updates(api, rx).await;
        handle.stop();
        handle.join().await
    }

    /// Dispatch updates from an arbitrary source (webhook sink, tests).
    pub async fn run_with_updates(self, api: Api, mut updates: mpsc::Receiver<Update>) {
        for hook in &self.startup {
            hook(api.clone()).await;
        }

        let mut timer_tasks = JoinSet::new();
        for spec in &self.timers {
            let api = api.clone();
            let task = Arc::clone(&spec.task);
            let interval = spec.interval;
            let repeat = spec.repeat;
            let mut stop = self.stop.subscribe();
            timer_tasks.spawn(async move {
                // Fixed-period ticks: a slow task does not push later
                // fires off schedule.
                let mut ticker =
                    tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
                loop {
                    tokio::select! {
                        biased;
                        _ = stop.changed() => return,
                        _ = ticker.tick() => {}
                    }
                    task(api.clone()).await;
                    if !repeat {
                        return;
                    }
                }
            });
        }

        let mut in_flight = JoinSet::new();
        let mut stop = self.stop.subscribe();
        loop {
            tokio::select! {
                biased;
                _ = stop.changed() => break,
                _ = tokio::signal::ctrl_c(), if self.ctrl_c => {
                    tracing::info!("ctrl-c received, shutting down");
                    break;
                }
                received = updates.recv() => {
                    let Some(update) = received else { break };
                    let dispatcher = Arc::clone(&self.dispatcher);
                    let api = api.clone();
                    in_flight.spawn(async move {
                        dispatcher.feed(&api, update).await;
                    });
                }
                // Reap finished update tasks so the set stays small.
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }

        timer_tasks.shutdown().await;
        while in_flight.join_next().await.is_some() {}
        self.dispatcher.shutdown().await;

        for hook in &self.shutdown {
            hook(api.clone()).await;
        }
        tracing::info!("run loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{HandlerCx, View};
    use crate::rules::Text;
    use crate::testing::{message_update, mock_api};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn hooks_run_in_order_around_the_loop() {
        let log: Arc<std::sync::Mutex<Vec<&'static str>>> = Arc::default();
        let (api, _) = mock_api();
        let (tx, rx) = mpsc::channel(4);

        let l1 = log.clone();
        let l2 = log.clone();
        let l3 = log.clone();
        let runner = LoopWrapper::new(Dispatcher::new())
            .on_startup(move |_| {
                let log = l1.clone();
                async move { log.lock().unwrap().push("up") }
            })
            .on_shutdown(move |_| {
                let log = l2.clone();
                async move { log.lock().unwrap().push("down1") }
            })
            .on_shutdown(move |_| {
                let log = l3.clone();
                async move { log.lock().unwrap().push("down2") }
            });

        drop(tx);
        runner.run_with_updates(api, rx).await;
        assert_eq!(*log.lock().unwrap(), vec!["up", "down1", "down2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_timer_fires_after_each_interval() {
        let fires = Arc::new(AtomicUsize::new(0));
        let (api, _) = mock_api();
        let (tx, rx) = mpsc::channel::<Update>(1);

        let f = fires.clone();
        let runner = LoopWrapper::new(Dispatcher::new()).timer(
            Duration::from_secs(60),
            true,
            move |_| {
                let fires = f.clone();
                async move {
                    fires.fetch_add(1, Ordering::SeqCst);
                }
            },
        );
        let handle = runner.stop_handle();

        let running = tokio::spawn(runner.run_with_updates(api, rx));
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(130)).await;
        tokio::task::yield_now().await;
        assert_eq!(fires.load(Ordering::SeqCst), 2);

        handle.stop();
        running.await.unwrap();
        drop(tx);
    }

    #[tokio::test]
    async fn updates_are_dispatched_until_source_closes() {
        let dispatcher = Dispatcher::new()
            .view(View::message().on(Text::eq("ping"), |_cx: HandlerCx| async { "pong" }));
        let (api, calls) = mock_api();
        let (tx, rx) = mpsc::channel(4);

        tx.send(message_update(1, 1, "ping")).await.unwrap();
        tx.send(message_update(2, 1, "ping")).await.unwrap();
        drop(tx);

        LoopWrapper::new(dispatcher).run_with_updates(api, rx).await;
        assert_eq!(calls.lock().unwrap().len(), 2);
    }
}
