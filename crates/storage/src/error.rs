use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    #[snafu(display("failed to read local storage file {path:?} on `{stage}`: {source}"))]
    ReadStore {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("local storage file {path:?} is not a valid key-value map: {source}"))]
    ParseStore {
        stage: &'static str,
        path: PathBuf,
        source: serde_json::Error,
    },
    #[snafu(display("failed to serialize local storage on `{stage}`: {source}"))]
    SerializeStore {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to create local storage directory at {path:?}: {source}"))]
    CreateStoreDirectory {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to write local storage file {path:?}: {source}"))]
    WriteStore {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to replace local storage file from {from:?} to {to:?}: {source}"))]
    RenameTempStore {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("stored session id '{raw}' is blank"))]
    InvalidSessionId { stage: &'static str, raw: String },
    #[snafu(display("local storage is unavailable on `{stage}`: {details}"))]
    Unavailable {
        stage: &'static str,
        details: String,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;
