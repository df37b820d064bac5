use std::io;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::datetime::{format_time, ParseTimeError};
use crate::store::StoreError;

/// time entryの編集を中断させるエラー。
///
/// どのエラーもリトライはせず、ストアには何も書き込まない。
#[derive(Debug, Error)]
pub enum EditError {
    #[error("entry {id} not found for user {user}")]
    NotFound { user: String, id: String },
    #[error("invalid JSON format: {0}")]
    MalformedInput(#[source] serde_json::Error),
    #[error("failed to encode entry for editing")]
    Encode(#[source] serde_json::Error),
    #[error("invalid {field} time format {text:?}: {source}")]
    InvalidTimestamp {
        field: &'static str,
        text: String,
        #[source]
        source: ParseTimeError,
    },
    #[error("finish time {} cannot be before begin time {}", format_time(.finish), format_time(.begin))]
    FinishBeforeBegin {
        begin: DateTime<Utc>,
        finish: DateTime<Utc>,
    },
    #[error("entry overlaps with existing entry {id} ({} to {})", format_time(.begin), format_time(.end))]
    OverlapConflict {
        id: String,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("failed to run editor: {0}")]
    EditorFailed(String),
    #[error("failed to access edit file")]
    EditFile(#[source] io::Error),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EditError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { user, id } => EditError::NotFound { user, id },
            other => EditError::Store(other),
        }
    }
}
