//! Backend commands queued from UI to backend worker.

use client_core::StoreCommand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    Store(StoreCommand),
    /// Drop the live subscription and open a fresh one.
    Resubscribe,
    Shutdown,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Store(command) => command.name(),
            BackendCommand::Resubscribe => "resubscribe",
            BackendCommand::Shutdown => "shutdown",
        }
    }
}
