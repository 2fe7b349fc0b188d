use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    config::{load_settings, open_store, Settings, StoreBackend},
    Notice, ThemeStore, ViewController, ViewEvent, DELETE_CONFIRMATION_PROMPT,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{parse_command, Command, HELP};

#[derive(Parser, Debug)]
#[command(about = "Terminal to-do list client")]
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

#[tokio::main]
async fn main() -> Result<()> {
    let mut settings = load_settings();
    Args::parse().apply(&mut settings)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = open_store(&settings)
        .await
        .with_context(|| format!("failed to open {} store", settings.backend))?;
    let mut controller =
        ViewController::with_theme_store(store, ThemeStore::new(settings.theme_path()));
    controller.mount().await.context("failed to subscribe to tasks")?;
    info!(backend = %settings.backend, collection = %settings.collection, "terminal client started");

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => run_command(&mut controller, command).await,
                    Err(message) => println!("{message}"),
                }
            }
            delivery = controller.next_snapshot(), if controller.is_mounted() => {
                match delivery {
                    Some(Ok(())) => render(&controller),
                    Some(Err(err)) => error!("task feed interrupted: {err}"),
                    None => println!("task feed ended; restart to reconnect"),
                }
            }
        }
    }

    controller.unmount();
    info!("terminal client stopped");
    Ok(())
}

async fn run_command(controller: &mut ViewController, command: Command) {
    let state = controller.state();
    if state.pending_delete.is_some() && !matches!(command, Command::Answer(_)) {
        println!("{DELETE_CONFIRMATION_PROMPT} (y/n)");
        return;
    }

    let notices = match command {
        Command::Add(text) => {
            if state.overlay_visible() {
                println!("finish the edit with `save <text>` or `cancel` first");
                return;
            }
            controller.change_draft(text).await;
            let notices = controller.submit().await;
            if let Some(message) = &controller.state().validation_message {
                println!("! {message}");
            }
            notices
        }
        Command::Edit(index) => {
            let Some(item) = state.item_at(index).cloned() else {
                println!("no task #{}", index + 1);
                return;
            };
            let notices = controller.begin_edit(item.id, item.name.clone()).await;
            println!("editing \"{}\"; `save <text>` or `cancel`", item.name);
            notices
        }
        Command::Save(text) => {
            if !state.overlay_visible() {
                println!("nothing is being edited");
                return;
            }
            controller.change_edit_draft(text).await;
            controller.submit().await
        }
        Command::Cancel => controller.cancel_edit().await,
        Command::Done(index) => {
            let Some(item) = state.item_at(index).cloned() else {
                println!("no task #{}", index + 1);
                return;
            };
            controller.toggle_done(item.id, item.is_done).await
        }
        Command::Remove(index) => {
            let Some(item) = state.item_at(index).cloned() else {
                println!("no task #{}", index + 1);
                return;
            };
            let notices = controller.dispatch(ViewEvent::RequestDelete(item.id)).await;
            println!("{DELETE_CONFIRMATION_PROMPT} (y/n)");
            notices
        }
        Command::Answer(accepted) => {
            if state.pending_delete.is_none() {
                println!("nothing to confirm");
                return;
            }
            controller.dispatch(ViewEvent::ConfirmDelete(accepted)).await
        }
        Command::Theme => {
            let notices = controller.toggle_theme().await;
            println!("theme: {}", controller.state().theme);
            notices
        }
        Command::List => {
            render(controller);
            Vec::new()
        }
        Command::Help => {
            println!("{HELP}");
            Vec::new()
        }
        Command::Quit => Vec::new(),
    };

    print_notices(&notices);
}

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        if notice.is_error() {
            println!("error: {notice}");
        } else {
            println!("{notice}");
        }
    }
}

fn render(controller: &ViewController) {
    let state = controller.state();
    if state.items.is_empty() {
        println!("(no tasks)");
        return;
    }
    for (index, item) in state.items.iter().enumerate() {
        let mark = if item.is_done { "x" } else { " " };
        let editing = if state.editing_target() == Some(&item.id) {
            "  (editing)"
        } else {
            ""
        };
        println!("{:>3}. [{mark}] {}{editing}", index + 1, item.name);
    }
}
