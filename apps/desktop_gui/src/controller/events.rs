//! Backend-to-UI events.

use client_core::{StoreOutcome, ViewEvent};
use shared::{domain::Item, error::RemoteError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Info(String),
    BackendFailed(String),
    Snapshot(Vec<Item>),
    SubscriptionFailed(RemoteError),
    Store(StoreOutcome),
}

impl UiEvent {
    /// The reducer event this maps to. Status-only events map to nothing.
    pub fn into_view_event(self) -> Option<ViewEvent> {
        match self {
            UiEvent::Snapshot(items) => Some(ViewEvent::SnapshotReceived(items)),
            UiEvent::SubscriptionFailed(err) => Some(ViewEvent::SubscriptionFailed(err)),
            UiEvent::Store(outcome) => Some(ViewEvent::Store(outcome)),
            UiEvent::Info(_) | UiEvent::BackendFailed(_) => None,
        }
    }
}
