use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cannot read document {}: {reason}", .path.display())]
    DocumentUnreadable { path: PathBuf, reason: String },

    #[error("Unknown command: '{0}'. Type 'help' for available commands.")]
    UnknownCommand(String),

    #[error("Please enter a command and search query. Type 'help' for assistance.")]
    MissingQuery,
}
