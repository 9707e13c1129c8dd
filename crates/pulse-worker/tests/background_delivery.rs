//! Background delivery end to end.

use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::watch;

use pulse_core::config::WorkerConfig;
use pulse_core::result::AppResult;
use pulse_core::traits::{NotificationRenderer, RenderOptions};
use pulse_worker::{BackgroundNotificationHandler, BackgroundWorker};

#[derive(Debug, Default)]
struct CapturingRenderer {
    shown: Mutex<Vec<(String, String, RenderOptions)>>,
}

impl NotificationRenderer for CapturingRenderer {
    fn show(&self, title: &str, body: &str, options: &RenderOptions) -> AppResult<()> {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string(), options.clone()));
        Ok(())
    }
}

fn worker(renderer: Arc<CapturingRenderer>) -> BackgroundWorker {
    BackgroundWorker::new(Arc::new(BackgroundNotificationHandler::new(
        renderer,
        WorkerConfig::default(),
    )))
}

#[tokio::test]
async fn missing_icon_uses_default() {
    let renderer = Arc::new(CapturingRenderer::default());
    let (tx, rx) = BackgroundWorker::queue(&WorkerConfig::default());
    let (_stop, stop_rx) = watch::channel(false);

    tx.send(json!({"title": "Like", "body": "Someone liked your post"}))
        .await
        .unwrap();
    drop(tx);
    worker(renderer.clone()).run(rx, stop_rx).await;

    let shown = renderer.shown.lock().unwrap();
    assert_eq!(shown.len(), 1);
    let (title, body, options) = &shown[0];
    assert_eq!(title, "Like");
    assert_eq!(body, "Someone liked your post");
    assert_eq!(options.icon, "/logo192.png");
}

#[tokio::test]
async fn each_delivery_rendered_once() {
    let renderer = Arc::new(CapturingRenderer::default());
    let (tx, rx) = BackgroundWorker::queue(&WorkerConfig::default());
    let (_stop, stop_rx) = watch::channel(false);

    for i in 0..3 {
        tx.send(json!({"title": format!("n{i}"), "body": "b"}))
            .await
            .unwrap();
    }
    drop(tx);

    assert_eq!(worker(renderer.clone()).run(rx, stop_rx).await, 3);
    let titles: Vec<String> = renderer
        .shown
        .lock()
        .unwrap()
        .iter()
        .map(|(title, _, _)| title.clone())
        .collect();
    assert_eq!(titles, vec!["n0", "n1", "n2"]);
}
