use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("records dir does not exist: {}", .0.display())]
    MissingRecordsDir(PathBuf),
    #[error("QA dir does not exist: {}", .0.display())]
    MissingQaDir(PathBuf),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("unexpected descriptor format: {0}")]
    UnrecognizedDescriptorShape(&'static str),
}
