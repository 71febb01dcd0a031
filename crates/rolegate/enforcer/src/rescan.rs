//! Debounced background rescan of newly observed markers

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rolegate_hierarchy::{build_forest_report, flatten_forest};
use rolegate_service::ConfigClient;
use rolegate_types::{MarkerDecl, MarkerId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::context::AuthorizationContext;

/// Collects markers from swept and inserted fragments and, once no new batch has
/// arrived for the debounce window, persists the merged marker forest.
///
/// Scheduled rescans are never cancelled; shutting down flushes whatever
/// is pending.
pub struct RescanScheduler {
    tx: mpsc::UnboundedSender<Vec<MarkerDecl>>,
    task: JoinHandle<()>,
}

impl RescanScheduler {
    /// Start the scheduler task. Must be called within a Tokio runtime.
    pub fn spawn(
        context: Arc<AuthorizationContext>,
        client: Arc<dyn ConfigClient>,
        debounce: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx, context, client, debounce));
        Self { tx, task }
    }

    /// Queue markers for the next flush. Returns false once shut down.
    pub fn schedule(&self, markers: Vec<MarkerDecl>) -> bool {
        if markers.is_empty() {
            return true;
        }
        self.tx.send(markers).is_ok()
    }

    /// Stop accepting markers, flush pending ones and wait for the task
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            error!(error = %e, "Rescan task failed");
        }
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<Vec<MarkerDecl>>,
    context: Arc<AuthorizationContext>,
    client: Arc<dyn ConfigClient>,
    debounce: Duration,
) {
    let mut pending: Vec<MarkerDecl> = Vec::new();
    let sleep = tokio::time::sleep(debounce);
    tokio::pin!(sleep);
    let mut armed = false;

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(batch) => {
                    pending.extend(batch);
                    sleep.as_mut().reset(Instant::now() + debounce);
                    armed = true;
                }
                None => {
                    if !pending.is_empty() {
                        flush(&context, client.as_ref(), std::mem::take(&mut pending)).await;
                    }
                    break;
                }
            },
            () = &mut sleep, if armed => {
                armed = false;
                flush(&context, client.as_ref(), std::mem::take(&mut pending)).await;
            }
        }
    }

    debug!("Rescan scheduler stopped");
}

/// Merge observed markers into the loaded forest and persist it if it changed
async fn flush(
    context: &AuthorizationContext,
    client: &dyn ConfigClient,
    observed: Vec<MarkerDecl>,
) {
    let config = match context.config_snapshot() {
        Ok(Some(config)) => config,
        Ok(None) => {
            debug!(observed = observed.len(), "No access config loaded, skipping rescan");
            return;
        }
        Err(e) => {
            error!(error = %e, "Failed to read access config for rescan");
            return;
        }
    };

    let mut declarations = flatten_forest(&config.markers);
    let mut seen: HashSet<MarkerId> = declarations.iter().map(|d| d.id.clone()).collect();
    declarations.extend(observed.into_iter().filter(|d| seen.insert(d.id.clone())));
    let report = build_forest_report(&declarations);

    if report.forest.is_empty() {
        warn!("Rescan produced an empty marker forest, not persisting");
        return;
    }
    if report.forest == config.markers {
        debug!("Marker forest unchanged");
        return;
    }

    let markers = report.forest.marker_count();
    match client.update_markers(report.forest).await {
        Ok(updated) => {
            if let Err(e) = context.replace_markers(updated.markers) {
                error!(error = %e, "Failed to install rescanned markers");
            }
            info!(markers, version = updated.version, "Marker forest persisted");
        }
        Err(e) => error!(error = %e, "Failed to persist marker forest"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingConfigPolicy;
    use crate::testing::ScriptedClient;
    use rolegate_types::{AccessConfig, AccessMap};

    fn loaded_context() -> Arc<AuthorizationContext> {
        let context = Arc::new(AuthorizationContext::new(MissingConfigPolicy::FailClosed));
        context.install_config(AccessConfig::skeleton()).unwrap();
        context
    }

    #[tokio::test(start_paused = true)]
    async fn burst_is_coalesced_into_one_write() {
        let context = loaded_context();
        let client = Arc::new(ScriptedClient::new(AccessMap::new()));
        let scheduler =
            RescanScheduler::spawn(context.clone(), client.clone(), Duration::from_millis(100));

        scheduler.schedule(vec![MarkerDecl::root("orders")]);
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.schedule(vec![MarkerDecl::root("orders-edit").with_parent("orders")]);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.update_count(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(client.update_count(), 1);

        let forest = client.last_update().unwrap();
        assert_eq!(forest.root_count(), 1);
        assert!(forest.contains("orders-edit"));

        let installed = context.config_snapshot().unwrap().unwrap();
        assert_eq!(installed.markers, forest);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn known_markers_do_not_trigger_a_write() {
        let context = loaded_context();
        let client = Arc::new(ScriptedClient::new(AccessMap::new()));
        let scheduler =
            RescanScheduler::spawn(context.clone(), client.clone(), Duration::from_millis(100));

        scheduler.schedule(vec![MarkerDecl::root("orders")]);
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.schedule(vec![MarkerDecl::root("orders")]);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(client.update_count(), 1);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_written_without_config() {
        let context = Arc::new(AuthorizationContext::new(MissingConfigPolicy::FailClosed));
        let client = Arc::new(ScriptedClient::new(AccessMap::new()));
        let scheduler =
            RescanScheduler::spawn(context.clone(), client.clone(), Duration::from_millis(100));

        scheduler.schedule(vec![MarkerDecl::root("orders")]);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(client.update_count(), 0);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_markers() {
        let context = loaded_context();
        let client = Arc::new(ScriptedClient::new(AccessMap::new()));
        let scheduler =
            RescanScheduler::spawn(context.clone(), client.clone(), Duration::from_secs(60));

        scheduler.schedule(vec![MarkerDecl::root("orders")]);
        scheduler.shutdown().await;
        assert_eq!(client.update_count(), 1);
    }
}
