use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use client_core::{
    config::{load_settings, Settings, StoreBackend},
    ThemeStore,
};
use crossbeam_channel::bounded;
use tracing_subscriber::EnvFilter;

mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::{commands::BackendCommand, runtime::spawn_backend_thread};
use controller::events::UiEvent;
use ui::TodoApp;

#[derive(Parser, Debug)]
#[command(about = "Desktop to-do list client")]
struct Args {
    /// `sqlite` or `firebase`.
    #[arg(long)]
    backend: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    collection: Option<String>,
    #[arg(long)]
    theme_path: Option<PathBuf>,
}

impl Args {
    fn apply(self, settings: &mut Settings) -> Result<()> {
        if let Some(backend) = self.backend {
            settings.backend = backend.parse::<StoreBackend>()?;
        }
        if let Some(url) = self.database_url {
            settings.database_url = Some(url);
        }
        if let Some(collection) = self.collection {
            settings.collection = collection;
        }
        if let Some(path) = self.theme_path {
            settings.theme_path = Some(path);
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let mut settings = load_settings();
    Args::parse().apply(&mut settings)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let theme_store = ThemeStore::new(settings.theme_path());
    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    spawn_backend_thread(settings, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("To-Do List")
            .with_inner_size([640.0, 520.0])
            .with_min_inner_size([420.0, 320.0]),
        ..Default::default()
    };
    eframe::run_native(
        "To-Do List",
        options,
        Box::new(|_cc| Ok(Box::new(TodoApp::new(cmd_tx, ui_rx, theme_store)))),
    )
    .map_err(|err| anyhow!("desktop window failed: {err}"))
}
