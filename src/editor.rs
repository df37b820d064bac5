use std::{fs, path::Path, process::Command};

use log::{debug, info};

use crate::editable::EditableEntry;
use crate::error::EditError;

#[cfg(test)]
use mockall::automock;

/// ファイルをユーザーに編集させるためのtrait。
#[cfg_attr(test, automock)]
pub trait EntryEditor {
    /// `path`のファイルを編集させ、編集が終わるまでブロックする。
    fn edit(&self, path: &Path) -> Result<(), EditError>;
}

/// 外部のエディタプロセスを起動する`EntryEditor`。
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    /// 新しい`ExternalEditor`を返す。
    ///
    /// `command`は空白で区切られ、先頭がプログラム、残りが引数として扱われる。(例: `code --wait`)
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl EntryEditor for ExternalEditor {
    fn edit(&self, path: &Path) -> Result<(), EditError> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| EditError::EditorFailed("no editor configured".to_string()))?;
        info!("Opening {} with {}", path.display(), self.command);

        let status = Command::new(program)
            .args(parts)
            .arg(path)
            .status()
            .map_err(|err| EditError::EditorFailed(format!("{}: {}", program, err)))?;
        if !status.success() {
            return Err(EditError::EditorFailed(format!(
                "editor exited with status {}",
                status
            )));
        }

        Ok(())
    }
}

/// 編集用のentryを一時ファイルに書き出してエディタで開き、編集後の内容を返す。
///
/// 内容はUTF-8として検証せずにそのまま返す。
/// 一時ファイルは成功、失敗にかかわらず関数を抜ける時に削除される。
pub fn present<E: EntryEditor + ?Sized>(
    editor: &E,
    editable: &EditableEntry,
) -> Result<Vec<u8>, EditError> {
    let text = editable.to_text()?;
    let file = tempfile::Builder::new()
        .prefix("zeit-edit-")
        .suffix(".json")
        .tempfile()
        .map_err(EditError::EditFile)?;
    fs::write(file.path(), &text).map_err(EditError::EditFile)?;
    debug!("Wrote editable entry to {}", file.path().display());

    editor.edit(file.path())?;

    fs::read(file.path()).map_err(EditError::EditFile)
}
