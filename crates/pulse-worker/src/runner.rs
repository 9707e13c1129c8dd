//! Worker runner: drains background deliveries until shutdown.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};

use pulse_core::config::WorkerConfig;

use crate::handler::BackgroundNotificationHandler;

/// Delivers queued background push messages, each exactly once.
#[derive(Debug)]
pub struct BackgroundWorker {
    /// Notification handler.
    handler: Arc<BackgroundNotificationHandler>,
}

impl BackgroundWorker {
    /// Create a worker around `handler`.
    pub fn new(handler: Arc<BackgroundNotificationHandler>) -> Self {
        Self { handler }
    }

    /// A delivery queue sized from the worker configuration.
    pub fn queue(config: &WorkerConfig) -> (mpsc::Sender<Value>, mpsc::Receiver<Value>) {
        mpsc::channel(config.queue_capacity.max(1))
    }

    /// Run until the shutdown signal flips to `true` or every sender is
    /// dropped. Returns the number of deliveries handled.
    pub async fn run(
        &self,
        mut deliveries: mpsc::Receiver<Value>,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        tracing::info!("Background worker started");
        let mut handled = 0u64;

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Background worker received shutdown signal");
                        break;
                    }
                }
                delivery = deliveries.recv() => {
                    let Some(payload) = delivery else {
                        tracing::info!("Delivery queue closed");
                        break;
                    };
                    handled += 1;
                    if let Err(e) = self.handler.handle(&payload) {
                        tracing::error!("Background delivery failed: {}", e);
                    }
                }
            }
        }

        tracing::info!("Background worker stopped after {} deliveries", handled);
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::LogRenderer;
    use serde_json::json;

    fn worker() -> BackgroundWorker {
        BackgroundWorker::new(Arc::new(BackgroundNotificationHandler::new(
            Arc::new(LogRenderer),
            WorkerConfig::default(),
        )))
    }

    #[tokio::test]
    async fn test_drains_until_queue_closed() {
        let (tx, rx) = BackgroundWorker::queue(&WorkerConfig::default());
        let (_stop_tx, stop_rx) = watch::channel(false);

        tx.send(json!({"title": "a", "body": "1"})).await.unwrap();
        tx.send(json!({"title": "b", "body": "2"})).await.unwrap();
        drop(tx);

        assert_eq!(worker().run(rx, stop_rx).await, 2);
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let (_tx, rx) = BackgroundWorker::queue(&WorkerConfig::default());
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move { worker().run(rx, stop_rx).await });
        stop_tx.send(true).unwrap();

        assert_eq!(task.await.unwrap(), 0);
    }
}
