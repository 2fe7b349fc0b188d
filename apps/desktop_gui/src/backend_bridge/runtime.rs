//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread};

use client_core::{config::open_store, execute_store_command, Settings};
use crossbeam_channel::{Receiver, Sender};
use storage::RemoteStore;
use tokio::task::JoinHandle;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;

pub fn spawn_backend_thread(
    settings: Settings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::BackendFailed(format!(
                    "failed to build backend runtime: {err}"
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let store = match open_store(&settings).await {
                Ok(store) => store,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::BackendFailed(format!(
                        "failed to open {} store: {err:#}",
                        settings.backend
                    )));
                    tracing::error!("failed to open store: {err:#}");
                    return;
                }
            };
            let _ = ui_tx.try_send(UiEvent::Info(format!(
                "Connected to {} ({})",
                settings.backend, settings.collection
            )));

            let mut feed = forward_snapshots(store.clone(), ui_tx.clone()).await;
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Store(command) => {
                        let outcome = execute_store_command(store.as_ref(), command).await;
                        if ui_tx.send(UiEvent::Store(outcome)).is_err() {
                            break;
                        }
                    }
                    BackendCommand::Resubscribe => {
                        resubscribe(&store, &mut feed, &ui_tx).await;
                    }
                    BackendCommand::Shutdown => break,
                }
            }

            if let Some(task) = feed.take() {
                task.abort();
            }
            tracing::info!("backend worker stopped");
        });
    });
}

/// Replaces the forwarding task with a fresh one. When the new subscribe
/// fails the running feed is left alone.
async fn resubscribe(
    store: &Arc<dyn RemoteStore>,
    feed: &mut Option<JoinHandle<()>>,
    ui_tx: &Sender<UiEvent>,
) {
    let Some(fresh) = forward_snapshots(store.clone(), ui_tx.clone()).await else {
        tracing::warn!("fresh read failed; keeping the current feed");
        return;
    };
    if let Some(previous) = feed.replace(fresh) {
        previous.abort();
    }
}

/// Subscribes and pumps every delivery to the UI until the feed ends or the
/// task is aborted. Aborting drops the subscription.
async fn forward_snapshots(
    store: Arc<dyn RemoteStore>,
    ui_tx: Sender<UiEvent>,
) -> Option<JoinHandle<()>> {
    let mut subscription = match store.subscribe().await {
        Ok(subscription) => subscription,
        Err(err) => {
            let _ = ui_tx.try_send(UiEvent::SubscriptionFailed(err));
            return None;
        }
    };

    Some(tokio::spawn(async move {
        while let Some(delivery) = subscription.next().await {
            let event = match delivery {
                Ok(snapshot) => UiEvent::Snapshot(snapshot.into_items()),
                Err(err) => UiEvent::SubscriptionFailed(err),
            };
            if ui_tx.send(event).is_err() {
                return;
            }
        }
        tracing::warn!("collection feed ended");
    }))
}
