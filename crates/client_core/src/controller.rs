//! Headless view controller: runs [`reduce`] and executes its effects.

use std::{collections::VecDeque, sync::Arc};

use shared::{
    domain::{ItemId, ItemPatch, Theme},
    error::RemoteError,
};
use storage::{RemoteStore, Subscription};
use tracing::{info, warn};

use crate::{
    reducer::{reduce, Effect, Notice, StoreCommand, StoreOutcome, ViewEvent},
    state::ViewState,
    theme::ThemeStore,
};

/// Runs one store command and reports how it went.
pub async fn execute_store_command(store: &dyn RemoteStore, command: StoreCommand) -> StoreOutcome {
    match command {
        StoreCommand::Append(record) => StoreOutcome::Appended(store.append(record).await),
        StoreCommand::Rename { id, name } => {
            let result = store.patch(&id, ItemPatch::rename(name)).await;
            StoreOutcome::Renamed { id, result }
        }
        StoreCommand::SetDone { id, is_done } => {
            let result = store.patch(&id, ItemPatch::set_done(is_done)).await;
            StoreOutcome::DoneSet {
                id,
                is_done,
                result,
            }
        }
        StoreCommand::Delete(id) => {
            let result = store.delete(&id).await;
            StoreOutcome::Deleted { id, result }
        }
    }
}

pub struct ViewController {
    store: Arc<dyn RemoteStore>,
    state: ViewState,
    theme_store: Option<ThemeStore>,
    subscription: Option<Subscription>,
}

impl ViewController {
    pub fn new(store: Arc<dyn RemoteStore>, theme: Theme) -> Self {
        Self {
            store,
            state: ViewState::new(theme),
            theme_store: None,
            subscription: None,
        }
    }

    pub fn with_theme_store(store: Arc<dyn RemoteStore>, theme_store: ThemeStore) -> Self {
        let mut controller = Self::new(store, theme_store.load());
        controller.theme_store = Some(theme_store);
        controller
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub async fn mount(&mut self) -> Result<(), RemoteError> {
        if self.subscription.is_none() {
            self.subscription = Some(self.store.subscribe().await?);
            info!("view mounted");
        }
        Ok(())
    }

    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!("view unmounted");
        }
    }

    /// Waits for the next delivery and applies it. `None` when not mounted or
    /// when the feed has ended.
    pub async fn next_snapshot(&mut self) -> Option<Result<(), RemoteError>> {
        let delivery = self.subscription.as_mut()?.next().await;
        match delivery {
            Some(Ok(snapshot)) => {
                reduce(&mut self.state, ViewEvent::SnapshotReceived(snapshot.into_items()));
                Some(Ok(()))
            }
            Some(Err(err)) => {
                reduce(&mut self.state, ViewEvent::SubscriptionFailed(err.clone()));
                Some(Err(err))
            }
            None => {
                warn!("collection feed ended");
                self.subscription = None;
                None
            }
        }
    }

    /// Applies an event and everything it triggers. Returns the notices the
    /// host must show on its blocking channel, in order.
    pub async fn dispatch(&mut self, event: ViewEvent) -> Vec<Notice> {
        let mut notices = Vec::new();
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            for effect in reduce(&mut self.state, event) {
                match effect {
                    Effect::Store(command) => {
                        let outcome = execute_store_command(self.store.as_ref(), command).await;
                        queue.push_back(ViewEvent::Store(outcome));
                    }
                    Effect::Resubscribe => {
                        if let Err(err) = self.resubscribe().await {
                            queue.push_back(ViewEvent::SubscriptionFailed(err));
                        }
                    }
                    Effect::PersistTheme(theme) => self.persist_theme(theme),
                    Effect::Notify(notice) => notices.push(notice),
                }
            }
        }

        notices
    }

    pub async fn change_draft(&mut self, text: impl Into<String>) -> Vec<Notice> {
        self.dispatch(ViewEvent::ChangeDraft(text.into())).await
    }

    pub async fn change_edit_draft(&mut self, text: impl Into<String>) -> Vec<Notice> {
        self.dispatch(ViewEvent::ChangeEditDraft(text.into())).await
    }

    pub async fn submit(&mut self) -> Vec<Notice> {
        self.dispatch(ViewEvent::Submit).await
    }

    pub async fn begin_edit(&mut self, id: ItemId, current_name: impl Into<String>) -> Vec<Notice> {
        self.dispatch(ViewEvent::BeginEdit {
            id,
            current_name: current_name.into(),
        })
        .await
    }

    pub async fn cancel_edit(&mut self) -> Vec<Notice> {
        self.dispatch(ViewEvent::CancelEdit).await
    }

    pub async fn toggle_done(&mut self, id: ItemId, current: bool) -> Vec<Notice> {
        self.dispatch(ViewEvent::ToggleDone { id, current }).await
    }

    /// Delete gated by the caller's yes/no answer.
    pub async fn delete_item(&mut self, id: ItemId, confirmed: bool) -> Vec<Notice> {
        let mut notices = self.dispatch(ViewEvent::RequestDelete(id)).await;
        notices.extend(self.dispatch(ViewEvent::ConfirmDelete(confirmed)).await);
        notices
    }

    pub async fn toggle_theme(&mut self) -> Vec<Notice> {
        self.dispatch(ViewEvent::ToggleTheme).await
    }

    /// Swaps in a fresh subscription. On failure the current one is kept.
    async fn resubscribe(&mut self) -> Result<(), RemoteError> {
        if self.subscription.is_none() {
            return Ok(());
        }
        let fresh = self.store.subscribe().await?;
        if let Some(previous) = self.subscription.replace(fresh) {
            previous.unsubscribe();
        }
        info!("subscription re-established for a fresh read");
        Ok(())
    }

    fn persist_theme(&self, theme: Theme) {
        if let Some(theme_store) = &self.theme_store {
            if let Err(err) = theme_store.save(theme) {
                warn!("failed to persist theme: {err:#}");
            }
        }
    }
}

impl Drop for ViewController {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
