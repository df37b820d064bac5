use serde::{Deserialize, Serialize};

use crate::datetime::format_time;
use crate::error::EditError;
use crate::time_entry::Entry;

/// エディタで編集するためのtime entryの表現。
///
/// `finish`が空文字列の場合は計測中のentryを表す。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableEntry {
    pub begin: String,
    pub finish: String,
    pub project: String,
    pub task: String,
    pub notes: String,
}

impl From<&Entry> for EditableEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            begin: format_time(&entry.begin),
            finish: entry.finish.as_ref().map(format_time).unwrap_or_default(),
            project: entry.project.clone(),
            task: entry.task.clone(),
            notes: entry.notes.clone(),
        }
    }
}

impl EditableEntry {
    /// インデント付きのJSONに変換する。
    pub fn to_text(&self) -> Result<String, EditError> {
        serde_json::to_string_pretty(self).map_err(EditError::Encode)
    }

    /// エディタで編集されたJSONをパースする。
    ///
    /// UTF-8として不正なバイト列も`MalformedInput`とする。
    pub fn from_text(text: impl AsRef<[u8]>) -> Result<Self, EditError> {
        serde_json::from_slice(text.as_ref()).map_err(EditError::MalformedInput)
    }
}
