pub mod config;
pub mod controller;
pub mod error;
pub mod firebase;
pub mod reducer;
pub mod state;
pub mod theme;

pub use config::{load_settings, open_store, Settings, StoreBackend};
pub use controller::{execute_store_command, ViewController};
pub use error::ValidationError;
pub use firebase::FirebaseStore;
pub use reducer::{
    reduce, Effect, Notice, StoreCommand, StoreOutcome, ViewEvent, DELETE_CONFIRMATION_PROMPT,
};
pub use state::{Mode, ViewState};
pub use theme::ThemeStore;
