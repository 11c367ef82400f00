//! Client-side view synchronization.
//!
//! A [`ViewSynchronizer`] listens on a [`NotificationChannel`] and turns every
//! change notification into a bump of a monotonically increasing `generation`.
//! Views watch the generation and re-run their reads when it moves. A lost
//! channel is retried once per loss after `reconnect_delay`, and the
//! generation is bumped right before the retry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::events::{ChangeNotification, ChangeNotifier, ChannelError};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

pub type NotificationStream = BoxStream<'static, Result<ChangeNotification, ChannelError>>;

/// Source of change notifications. Each `connect` is one connection attempt;
/// the returned stream ending means the connection was lost.
#[async_trait]
pub trait NotificationChannel: Send + Sync + 'static {
    async fn connect(&self) -> Result<NotificationStream, ChannelError>;

    /// Human readable target for logs.
    fn describe(&self) -> String;
}

/// Connects to a server's `/ws` endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketChannel {
    url: String,
}

impl WebSocketChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl NotificationChannel for WebSocketChannel {
    async fn connect(&self) -> Result<NotificationStream, ChannelError> {
        let (socket, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;

        let notifications = socket.filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => match ChangeNotification::from_json(text.as_str()) {
                    Ok(notification) => Some(Ok(notification)),
                    Err(err) => {
                        debug!(error = %err, "ignoring unparseable frame");
                        None
                    }
                },
                Ok(Message::Close(_)) => Some(Err(ChannelError::Closed)),
                Ok(_) => None,
                Err(err) => Some(Err(ChannelError::Transport(err.to_string()))),
            }
        });

        Ok(notifications.boxed())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// In-process channel straight off a [`ChangeNotifier`].
#[derive(Clone)]
pub struct LocalChannel {
    notifier: ChangeNotifier,
}

impl LocalChannel {
    pub fn new(notifier: ChangeNotifier) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl NotificationChannel for LocalChannel {
    async fn connect(&self) -> Result<NotificationStream, ChannelError> {
        Ok(self.notifier.stream().map(Ok).boxed())
    }

    fn describe(&self) -> String {
        "in-process".to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub reconnect_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl From<&AppConfig> for SyncConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            reconnect_delay: cfg.reconnect_delay(),
        }
    }
}

pub struct ViewSynchronizer<C> {
    channel: Arc<C>,
    config: SyncConfig,
}

impl<C: NotificationChannel> ViewSynchronizer<C> {
    pub fn new(channel: C, config: SyncConfig) -> Self {
        Self {
            channel: Arc::new(channel),
            config,
        }
    }

    /// Starts the connection task. The generation starts at 0.
    pub fn spawn(self) -> SyncHandle {
        let (generation_tx, generation_rx) = watch::channel(0u64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(self.channel, self.config, generation_tx, shutdown_rx));
        SyncHandle {
            generation: generation_rx,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Owns a running synchronizer. Dropping the handle stops it as well.
pub struct SyncHandle {
    generation: watch::Receiver<u64>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.clone()
    }

    /// Closes the channel. No reconnection is scheduled afterwards.
    pub async fn close(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            warn!(error = %err, "view synchronizer task failed");
        }
    }
}

async fn run<C: NotificationChannel>(
    channel: Arc<C>,
    config: SyncConfig,
    generation: watch::Sender<u64>,
    mut shutdown: watch::Receiver<bool>,
) {
    let target = channel.describe();

    loop {
        let attempt = tokio::select! {
            _ = stopped(&mut shutdown) => break,
            attempt = channel.connect() => attempt,
        };

        match attempt {
            Ok(mut notifications) => {
                info!(channel = %target, "notification channel connected");
                loop {
                    let next = tokio::select! {
                        _ = stopped(&mut shutdown) => return,
                        next = notifications.next() => next,
                    };
                    match next {
                        Some(Ok(ChangeNotification::Update)) => bump(&generation),
                        Some(Ok(ChangeNotification::Unknown)) => {}
                        Some(Err(err)) => {
                            warn!(channel = %target, error = %err, "notification channel lost");
                            break;
                        }
                        None => {
                            warn!(channel = %target, "notification channel closed by peer");
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                warn!(channel = %target, error = %err, "notification channel connect failed");
            }
        }

        tokio::select! {
            _ = stopped(&mut shutdown) => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
        // Notifications may have been missed while disconnected
        bump(&generation);
        debug!(channel = %target, "reconnecting notification channel");
    }

    debug!(channel = %target, "view synchronizer stopped");
}

fn bump(generation: &watch::Sender<u64>) {
    generation.send_modify(|g| *g += 1);
}

/// Resolves once shutdown is requested or the handle is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Runs `refresh` once for the current generation and again after every
/// change. Changes that arrive during a refresh collapse into one rerun.
/// Returns when the synchronizer has stopped.
pub async fn watch_and_refresh<F, Fut>(mut generation: watch::Receiver<u64>, mut refresh: F)
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let current = *generation.borrow_and_update();
        refresh(current).await;
        if generation.changed().await.is_err() {
            break;
        }
    }
}
