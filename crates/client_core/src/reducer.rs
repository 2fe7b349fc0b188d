//! Reducer-style transitions of [`ViewState`].
//!
//! Every user intent and every store completion is a [`ViewEvent`]. The
//! reducer never talks to the store itself; it returns [`Effect`]s and the
//! host feeds the outcome of each store call back in as
//! [`ViewEvent::Store`]. Modes and drafts change only after the store has
//! confirmed the mutation.

use std::fmt;

use shared::{
    domain::{Item, ItemId, ItemRecord, Theme},
    error::RemoteError,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::{validate_task_name, ValidationError},
    state::{Mode, ViewState},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    ChangeDraft(String),
    ChangeEditDraft(String),
    /// Form submission: edits the target while editing, creates otherwise.
    Submit,
    BeginEdit {
        id: ItemId,
        current_name: String,
    },
    CancelEdit,
    ToggleDone {
        id: ItemId,
        current: bool,
    },
    RequestDelete(ItemId),
    ConfirmDelete(bool),
    ToggleTheme,
    SnapshotReceived(Vec<Item>),
    SubscriptionFailed(RemoteError),
    Store(StoreOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    Append(ItemRecord),
    Rename { id: ItemId, name: String },
    SetDone { id: ItemId, is_done: bool },
    Delete(ItemId),
}

impl StoreCommand {
    pub fn name(&self) -> &'static str {
        match self {
            StoreCommand::Append(_) => "append",
            StoreCommand::Rename { .. } => "rename",
            StoreCommand::SetDone { .. } => "set_done",
            StoreCommand::Delete(_) => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Appended(Result<ItemId, RemoteError>),
    Renamed {
        id: ItemId,
        result: Result<(), RemoteError>,
    },
    DoneSet {
        id: ItemId,
        is_done: bool,
        result: Result<(), RemoteError>,
    },
    Deleted {
        id: ItemId,
        result: Result<(), RemoteError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Store(StoreCommand),
    /// Drop the live subscription and open a fresh one.
    Resubscribe,
    PersistTheme(Theme),
    Notify(Notice),
}

/// Message the host must present on its blocking channel (dialog/alert).
/// The create-path validation failure is not a notice; it lives in
/// [`ViewState::validation_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Created,
    Updated,
    Deleted,
    DeleteCancelled,
    Validation(ValidationError),
    Remote(RemoteError),
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Validation(_) | Notice::Remote(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Created => f.write_str("Task Successfully Submitted"),
            Notice::Updated => f.write_str("Task Successfully Updated"),
            Notice::Deleted => f.write_str("Task Deleted Successfully"),
            Notice::DeleteCancelled => f.write_str("Task deletion canceled"),
            Notice::Validation(err) => write!(f, "{err}"),
            Notice::Remote(err) => write!(f, "{err}"),
        }
    }
}

pub const DELETE_CONFIRMATION_PROMPT: &str = "Are you sure you want to delete this task?";

pub fn reduce(state: &mut ViewState, event: ViewEvent) -> Vec<Effect> {
    match event {
        ViewEvent::ChangeDraft(text) => {
            state.create_draft = text;
            state.validation_message = None;
            Vec::new()
        }
        ViewEvent::ChangeEditDraft(text) => {
            match &mut state.mode {
                Mode::Editing { draft, .. } => *draft = text,
                Mode::Idle => warn!("edit draft changed while no item is being edited"),
            }
            Vec::new()
        }
        ViewEvent::Submit => submit(state),
        ViewEvent::BeginEdit { id, current_name } => {
            if state.item(&id).is_none() {
                warn!(key = %id, "cannot edit an item missing from the current list");
                return Vec::new();
            }
            state.mode = Mode::Editing {
                target: id,
                draft: current_name,
            };
            Vec::new()
        }
        ViewEvent::CancelEdit => {
            if !state.overlay_visible() {
                debug!("cancel requested with no edit in progress");
                return Vec::new();
            }
            // Discard every unsaved local input, then re-read the store.
            state.mode = Mode::Idle;
            state.create_draft.clear();
            state.validation_message = None;
            state.pending_delete = None;
            vec![Effect::Resubscribe]
        }
        ViewEvent::ToggleDone { id, current } => vec![Effect::Store(StoreCommand::SetDone {
            id,
            is_done: !current,
        })],
        ViewEvent::RequestDelete(id) => {
            state.pending_delete = Some(id);
            Vec::new()
        }
        ViewEvent::ConfirmDelete(accepted) => {
            let Some(id) = state.pending_delete.take() else {
                warn!("delete confirmation received with nothing pending");
                return Vec::new();
            };
            if accepted {
                vec![Effect::Store(StoreCommand::Delete(id))]
            } else {
                info!(key = %id, "task deletion canceled");
                vec![Effect::Notify(Notice::DeleteCancelled)]
            }
        }
        ViewEvent::ToggleTheme => {
            state.theme = state.theme.toggled();
            vec![Effect::PersistTheme(state.theme)]
        }
        ViewEvent::SnapshotReceived(items) => {
            debug!(count = items.len(), "snapshot applied");
            state.items = items;
            Vec::new()
        }
        ViewEvent::SubscriptionFailed(err) => {
            error!("collection subscription failed: {err}");
            Vec::new()
        }
        ViewEvent::Store(outcome) => apply_outcome(state, outcome),
    }
}

fn submit(state: &mut ViewState) -> Vec<Effect> {
    if let Mode::Editing { target, draft } = &state.mode {
        if let Err(err) = validate_task_name(draft) {
            return vec![Effect::Notify(Notice::Validation(err))];
        }
        return vec![Effect::Store(StoreCommand::Rename {
            id: target.clone(),
            name: draft.clone(),
        })];
    }

    if let Err(err) = validate_task_name(&state.create_draft) {
        state.validation_message = Some(err.to_string());
        return Vec::new();
    }
    vec![Effect::Store(StoreCommand::Append(ItemRecord::new_task(
        state.create_draft.clone(),
    )))]
}

fn apply_outcome(state: &mut ViewState, outcome: StoreOutcome) -> Vec<Effect> {
    match outcome {
        StoreOutcome::Appended(Ok(id)) => {
            info!(key = %id, "task submitted");
            state.create_draft.clear();
            state.validation_message = None;
            vec![Effect::Notify(Notice::Created)]
        }
        StoreOutcome::Renamed { id, result: Ok(()) } => {
            info!(key = %id, "task updated");
            if state.editing_target() == Some(&id) {
                state.mode = Mode::Idle;
            }
            state.create_draft.clear();
            state.validation_message = None;
            vec![Effect::Notify(Notice::Updated)]
        }
        StoreOutcome::DoneSet {
            id,
            is_done,
            result: Ok(()),
        } => {
            info!(key = %id, is_done, "task status updated");
            Vec::new()
        }
        StoreOutcome::Deleted { id, result: Ok(()) } => {
            info!(key = %id, "task deleted");
            vec![Effect::Notify(Notice::Deleted)]
        }
        StoreOutcome::Appended(Err(err))
        | StoreOutcome::Renamed { result: Err(err), .. }
        | StoreOutcome::DoneSet {
            result: Err(err), ..
        }
        | StoreOutcome::Deleted {
            result: Err(err), ..
        } => {
            warn!("store call failed: {err}");
            vec![Effect::Notify(Notice::Remote(err))]
        }
    }
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;
