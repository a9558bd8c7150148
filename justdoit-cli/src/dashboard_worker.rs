use std::sync::Arc;

use justdoit_api::HttpApi;
use justdoit_core::{Request, Response, execute};
use tokio::sync::mpsc;

/// Runs every request concurrently and hands each response back to the UI
/// thread. Ordering is the controller's job; it drops what it no longer wants.
pub async fn run_worker(
    api: Arc<HttpApi>,
    mut rx: mpsc::UnboundedReceiver<Request>,
    tx: std::sync::mpsc::Sender<Response>,
) {
    while let Some(req) = rx.recv().await {
        let api = Arc::clone(&api);
        let tx2 = tx.clone();
        tokio::spawn(async move {
            let seq = req.seq;
            let resp = execute(api.as_ref(), req).await;
            if tx2.send(resp).is_err() {
                tracing::debug!(seq, "dashboard closed before response arrived");
            }
        });
    }
}
