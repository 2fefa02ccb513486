use std::sync::Arc;
use std::time::Duration;

use speedgov_core::UNCAPPED;
use speedgov_core::format::fmt_speed;
use speedgov_ports::{Notifier, Store};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

const QUEUE_CAPACITY: usize = 256;
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

struct Notification {
    title: String,
    message: String,
}

/// A [`Notifier`] that enqueues onto a bounded channel drained by a single
/// background task, which posts each message to the Telegram Bot API.
///
/// `notify` never blocks: once the queue is full or the background task has
/// exited, further calls silently drop the message.
pub struct TelegramNotifier {
    sender: mpsc::Sender<Notification>,
}

impl Notifier for TelegramNotifier {
    fn notify(&self, title: &str, message: &str) {
        let notification = Notification {
            title: title.to_owned(),
            message: message.to_owned(),
        };
        if self.sender.try_send(notification).is_err() {
            warn!("notification queue full or closed, dropping message");
        }
    }
}

impl TelegramNotifier {
    /// Startup banner, sent once the governor and auto-remove loops are running.
    pub fn notify_startup(&self) {
        self.notify(
            "speedgov started",
            "control and removal loops are running",
        );
    }

    /// A torrent's upload limit changed.
    pub fn notify_limit_applied(&self, torrent_name: &str, limit: i64, reason: &str) {
        let (title, message) = limit_applied_text(torrent_name, limit, reason);
        self.notify(&title, &message);
    }

    /// A torrent was deleted by the auto-remove engine.
    pub fn notify_torrent_removed(&self, torrent_name: &str, reason: &str) {
        let (title, message) = torrent_removed_text(torrent_name, reason);
        self.notify(&title, &message);
    }

    /// A control cycle or removal failed unexpectedly.
    pub fn notify_error(&self, error: &str, context: &str) {
        let (title, message) = error_text(error, context);
        self.notify(&title, &message);
    }
}

fn limit_applied_text(torrent_name: &str, limit: i64, reason: &str) -> (String, String) {
    let limit_text = if limit == UNCAPPED {
        "unlimited".to_owned()
    } else {
        #[allow(clippy::cast_precision_loss)]
        fmt_speed(limit as f64)
    };
    let message = if reason.is_empty() {
        format!("{torrent_name}: {limit_text}")
    } else {
        format!("{torrent_name}: {limit_text} ({reason})")
    };
    ("upload limit applied".to_owned(), message)
}

fn torrent_removed_text(torrent_name: &str, reason: &str) -> (String, String) {
    let message = if reason.is_empty() {
        torrent_name.to_owned()
    } else {
        format!("{torrent_name}: {reason}")
    };
    ("torrent removed".to_owned(), message)
}

fn error_text(error: &str, context: &str) -> (String, String) {
    let message = if context.is_empty() {
        error.to_owned()
    } else {
        format!("{context}: {error}")
    };
    ("error".to_owned(), message)
}

/// Spawn the background send task, returning a [`TelegramNotifier`] handle
/// and its [`JoinHandle`].
///
/// Drop the notifier to close the channel; the background task drains
/// whatever is already queued and exits, which the `JoinHandle` can be
/// awaited to observe.
#[must_use]
pub fn spawn(store: Arc<dyn Store>) -> (TelegramNotifier, JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
    let handle = tokio::spawn(run(store, receiver));
    (TelegramNotifier { sender }, handle)
}

async fn run(store: Arc<dyn Store>, mut receiver: mpsc::Receiver<Notification>) {
    let client = reqwest::Client::new();
    while let Some(notification) = receiver.recv().await {
        if let Err(err) = send(&client, store.as_ref(), &notification).await {
            warn!(error = %err, "failed to deliver telegram notification");
        }
    }
}

async fn send(
    client: &reqwest::Client,
    store: &dyn Store,
    notification: &Notification,
) -> anyhow::Result<()> {
    let bot_token = store.get_config("telegram_bot_token", "").await?;
    let chat_id = store.get_config("telegram_chat_id", "").await?;
    if bot_token.is_empty() || chat_id.is_empty() {
        return Ok(());
    }

    let text = if notification.title.is_empty() {
        notification.message.clone()
    } else {
        format!("*{}*\n{}", notification.title, notification.message)
    };
    let payload = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "Markdown",
    });

    let proxy = store.get_config("global_proxy", "").await?;
    let proxied_client;
    let client = if proxy.is_empty() {
        client
    } else {
        proxied_client = reqwest::Client::builder()
            .proxy(reqwest::Proxy::all(&proxy)?)
            .build()?;
        &proxied_client
    };

    let url = format!("https://api.telegram.org/bot{bot_token}/sendMessage");
    let response = client
        .post(&url)
        .json(&payload)
        .timeout(SEND_TIMEOUT)
        .send()
        .await?;
    if !response.status().is_success() {
        warn!(status = %response.status(), "telegram API rejected notification");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use speedgov_ports::testing::FakeStore;
    use std::time::Duration as StdDuration;

    #[test]
    fn limit_applied_reports_unlimited() {
        let (_, message) = limit_applied_text("demo", UNCAPPED, "");
        assert_eq!(message, "demo: unlimited");
    }

    #[test]
    fn limit_applied_includes_reason() {
        let (_, message) = limit_applied_text("demo", 2_097_152, "steady phase");
        assert_eq!(message, "demo: 2.0 MiB/s (steady phase)");
    }

    #[test]
    fn torrent_removed_without_reason() {
        let (_, message) = torrent_removed_text("demo", "");
        assert_eq!(message, "demo");
    }

    #[test]
    fn error_text_without_context() {
        let (_, message) = error_text("connection refused", "");
        assert_eq!(message, "connection refused");
    }

    #[tokio::test]
    async fn notifications_drain_without_credentials_configured() {
        let store: Arc<dyn Store> = Arc::new(FakeStore::new());
        let (notifier, handle) = spawn(store);

        notifier.notify_startup();
        notifier.notify_limit_applied("demo.torrent", 4096, "warmup");
        notifier.notify_torrent_removed("demo.torrent", "seeding time exceeded");
        notifier.notify_error("timeout", "reannounce");

        drop(notifier);
        tokio::time::timeout(StdDuration::from_secs(5), handle)
            .await
            .expect("background task should exit once the queue drains")
            .expect("background task should not panic");
    }
}
