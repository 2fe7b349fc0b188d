//! Command orchestration from reducer effects to the backend command queue.

use client_core::{reduce, Effect, Notice, ThemeStore, ViewEvent, ViewState};
use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = cmd.name();

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); restart the app"
                    .to_string();
        }
    }
}

/// Runs the reducer and routes its effects: store work and resubscribes go to
/// the backend, theme changes are written to disk, notices are returned for
/// the alert window.
pub fn apply_view_event(
    state: &mut ViewState,
    event: ViewEvent,
    cmd_tx: &Sender<BackendCommand>,
    theme_store: &ThemeStore,
    status: &mut String,
) -> Vec<Notice> {
    let mut notices = Vec::new();
    for effect in reduce(state, event) {
        match effect {
            Effect::Store(command) => {
                dispatch_backend_command(cmd_tx, BackendCommand::Store(command), status)
            }
            Effect::Resubscribe => {
                dispatch_backend_command(cmd_tx, BackendCommand::Resubscribe, status)
            }
            Effect::PersistTheme(theme) => {
                if let Err(err) = theme_store.save(theme) {
                    tracing::warn!("failed to persist theme: {err:#}");
                    *status = format!("Could not save theme: {err}");
                }
            }
            Effect::Notify(notice) => notices.push(notice),
        }
    }
    notices
}
