//! Process-local view state. Mutated only by [`crate::reducer::reduce`].

use shared::domain::{Item, ItemId, Theme};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    Editing {
        target: ItemId,
        draft: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Rebuilt wholesale from every snapshot.
    pub items: Vec<Item>,
    pub mode: Mode,
    /// Text of the always-present "new task" input.
    pub create_draft: String,
    /// Inline message under the create input.
    pub validation_message: Option<String>,
    /// Item waiting for a yes/no answer before it is deleted.
    pub pending_delete: Option<ItemId>,
    pub theme: Theme,
}

impl ViewState {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    /// The edit overlay is shown exactly while an item is being edited.
    pub fn overlay_visible(&self) -> bool {
        matches!(self.mode, Mode::Editing { .. })
    }

    pub fn editing_target(&self) -> Option<&ItemId> {
        match &self.mode {
            Mode::Editing { target, .. } => Some(target),
            Mode::Idle => None,
        }
    }

    pub fn edit_draft(&self) -> Option<&str> {
        match &self.mode {
            Mode::Editing { draft, .. } => Some(draft),
            Mode::Idle => None,
        }
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn item_at(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }
}
