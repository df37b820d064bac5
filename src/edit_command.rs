use log::{info, warn};

use crate::datetime;
use crate::editable::EditableEntry;
use crate::editor::{self, EntryEditor};
use crate::error::EditError;
use crate::store::EntryRepository;
use crate::time_entry::Entry;
use crate::validator::validate_entry;

/// time entryを`$EDITOR`で編集するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct EditArgs {
    #[clap(help = "ID of the entry to edit")]
    pub id: String,
}

/// 編集の結果。
#[derive(Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// 編集内容を保存した。
    Updated(Entry),
    /// 編集内容に変更がなかったため、何も保存していない。
    Unchanged(Entry),
}

pub struct EditCommand<'a, R: EntryRepository, E: EntryEditor> {
    repository: &'a R,
    editor: &'a E,
    user: String,
}

impl<'a, R: EntryRepository, E: EntryEditor> EditCommand<'a, R, E> {
    /// 新しい`EditCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - time entryを保存しているストア
    /// * `editor` - 編集に利用するエディタ
    /// * `user` - 編集するentryの所有者
    pub fn new(repository: &'a R, editor: &'a E, user: impl Into<String>) -> Self {
        Self {
            repository,
            editor,
            user: user.into(),
        }
    }

    /// `edit`サブコマンドの処理を行う。
    ///
    /// entryを取得してエディタで編集させ、検証に通った場合のみストアを更新する。
    /// どこかで失敗した場合はストアを変更せずにエラーを返す。
    ///
    /// # Arguments
    ///
    /// * `args` - `edit`サブコマンドの引数
    pub fn run(&self, args: EditArgs) -> Result<EditOutcome, EditError> {
        let editable = self.begin_edit(&args.id)?;
        let text = self.present(&editable)?;
        let edited = Self::parse_edited(&text)?;

        if edited == editable {
            info!("No changes made to entry {}", args.id);
            let entry = self.repository.get_entry(&self.user, &args.id)?;
            return Ok(EditOutcome::Unchanged(entry));
        }

        self.commit(&args.id, &edited)
            .map(EditOutcome::Updated)
            .map_err(|err| {
                warn!("Rejected edit of entry {}: {}", args.id, err);
                err
            })
    }

    /// entryを取得し、編集用の表現に変換する。
    pub fn begin_edit(&self, id: &str) -> Result<EditableEntry, EditError> {
        let entry = self.repository.get_entry(&self.user, id)?;
        info!("Loaded entry {} for user {}", entry.id, self.user);

        Ok(EditableEntry::from(&entry))
    }

    /// 編集用の表現をエディタで開き、編集後のテキストを返す。
    pub fn present(&self, editable: &EditableEntry) -> Result<Vec<u8>, EditError> {
        editor::present(self.editor, editable)
    }

    /// エディタで編集されたテキストをパースする。
    pub fn parse_edited(text: &[u8]) -> Result<EditableEntry, EditError> {
        EditableEntry::from_text(text)
    }

    /// 編集内容を検証し、問題がなければストアに保存する。
    pub fn commit(&self, id: &str, edited: &EditableEntry) -> Result<Entry, EditError> {
        let original = self.repository.get_entry(&self.user, id)?;
        let entries = self.repository.list_entries(&self.user)?;

        let entry = validate_entry(&original, edited, &entries, datetime::now())?;
        let updated = self.repository.update_entry(&self.user, entry)?;
        info!("Entry {} updated successfully", updated.id);

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use chrono::{DateTime, Local, TimeZone, Utc};
    use mockall::predicate::eq;

    use super::{EditArgs, EditCommand, EditOutcome};
    use crate::datetime::mock_datetime;
    use crate::editable::EditableEntry;
    use crate::editor::MockEntryEditor;
    use crate::error::EditError;
    use crate::store::{MockEntryRepository, StoreError};
    use crate::time_entry::Entry;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2024, 3, 1, hour, min, 0)
            .unwrap()
            .to_utc()
    }

    fn dummy_entry(id: &str, begin: DateTime<Utc>, finish: Option<DateTime<Utc>>) -> Entry {
        Entry {
            id: id.to_string(),
            begin,
            finish,
            project: "zeit".to_string(),
            task: "edit".to_string(),
            notes: String::new(),
        }
    }

    fn entry_a() -> Entry {
        dummy_entry("a", at(10, 0), Some(at(11, 0)))
    }

    fn entry_b() -> Entry {
        dummy_entry("b", at(12, 0), Some(at(13, 0)))
    }

    /// `a`と`b`を持つストアのモックを作成する。
    ///
    /// `update_entry`は`updates`回呼ばれることを期待する。
    fn repository(updates: usize) -> MockEntryRepository {
        let mut repository = MockEntryRepository::new();
        repository
            .expect_get_entry()
            .with(eq("alice"), eq("a"))
            .returning(|_, _| Ok(entry_a()));
        repository
            .expect_list_entries()
            .with(eq("alice"))
            .returning(|_| Ok(vec![entry_a(), entry_b()]));
        repository
            .expect_update_entry()
            .times(updates)
            .returning(|_, entry| Ok(entry));
        repository
    }

    /// ファイルの内容を`edit`で書き換えるエディタのモックを作成する。
    fn editor(edit: fn(EditableEntry) -> EditableEntry) -> MockEntryEditor {
        let mut editor = MockEntryEditor::new();
        editor.expect_edit().times(1).returning(move |path: &Path| {
            let text = fs::read_to_string(path).unwrap();
            let edited = edit(EditableEntry::from_text(&text).unwrap());
            fs::write(path, edited.to_text().unwrap()).unwrap();
            Ok(())
        });
        editor
    }

    fn args() -> EditArgs {
        EditArgs {
            id: "a".to_string(),
        }
    }

    #[test]
    fn test_edit_updates_entry() {
        let repository = repository(1);
        let editor = editor(|editable| EditableEntry {
            finish: "12:00".to_string(),
            notes: "touching b".to_string(),
            ..editable
        });
        let command = EditCommand::new(&repository, &editor, "alice");

        let outcome = command.run(args()).unwrap();

        assert_eq!(
            outcome,
            EditOutcome::Updated(Entry {
                finish: Some(at(12, 0)),
                notes: "touching b".to_string(),
                ..entry_a()
            })
        );
    }

    #[test]
    fn test_edit_without_changes_does_not_update() {
        let repository = repository(0);
        let editor = editor(|editable| editable);
        let command = EditCommand::new(&repository, &editor, "alice");

        let outcome = command.run(args()).unwrap();

        assert_eq!(outcome, EditOutcome::Unchanged(entry_a()));
    }

    #[test]
    fn test_edit_overlap_is_rejected() {
        let repository = repository(0);
        let editor = editor(|editable| EditableEntry {
            finish: "12:30".to_string(),
            ..editable
        });
        let command = EditCommand::new(&repository, &editor, "alice");

        let result = command.run(args());

        assert!(matches!(
            result,
            Err(EditError::OverlapConflict { id, .. }) if id == "b"
        ));
    }

    /// 計測中に戻すと、現在時刻(12:15)まで続くentryとして`b`と重なる。
    #[test]
    fn test_edit_to_open_entry_conflicts_until_now() {
        mock_datetime::set_mock_time(at(12, 15));
        let repository = repository(0);
        let editor = editor(|editable| EditableEntry {
            finish: String::new(),
            ..editable
        });
        let command = EditCommand::new(&repository, &editor, "alice");

        let result = command.run(args());
        mock_datetime::clear_mock_time();

        assert!(matches!(
            result,
            Err(EditError::OverlapConflict { id, .. }) if id == "b"
        ));
    }

    #[test]
    fn test_edit_invalid_begin_is_rejected() {
        let repository = repository(0);
        let editor = editor(|editable| EditableEntry {
            begin: "next tuesday".to_string(),
            ..editable
        });
        let command = EditCommand::new(&repository, &editor, "alice");

        let result = command.run(args());

        assert!(matches!(
            result,
            Err(EditError::InvalidTimestamp { field: "begin", .. })
        ));
    }

    #[test]
    fn test_edit_finish_before_begin_is_rejected() {
        let repository = repository(0);
        let editor = editor(|editable| EditableEntry {
            finish: "09:00".to_string(),
            ..editable
        });
        let command = EditCommand::new(&repository, &editor, "alice");

        assert!(matches!(
            command.run(args()),
            Err(EditError::FinishBeforeBegin { .. })
        ));
    }

    #[test]
    fn test_edit_malformed_text_is_rejected() {
        let repository = repository(0);
        let mut editor = MockEntryEditor::new();
        editor.expect_edit().times(1).returning(|path: &Path| {
            fs::write(path, "{ \"begin\": ").unwrap();
            Ok(())
        });
        let command = EditCommand::new(&repository, &editor, "alice");

        assert!(matches!(
            command.run(args()),
            Err(EditError::MalformedInput(_))
        ));
    }

    /// UTF-8として不正な内容が保存された場合も`MalformedInput`になる。
    #[test]
    fn test_edit_invalid_utf8_is_rejected() {
        let repository = repository(0);
        let mut editor = MockEntryEditor::new();
        editor.expect_edit().times(1).returning(|path: &Path| {
            let mut bytes = fs::read(path).unwrap();
            bytes.extend_from_slice(&[0xff, 0xfe]);
            fs::write(path, bytes).unwrap();
            Ok(())
        });
        let command = EditCommand::new(&repository, &editor, "alice");

        assert!(matches!(
            command.run(args()),
            Err(EditError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_edit_editor_failure_is_reported() {
        let repository = repository(0);
        let mut editor = MockEntryEditor::new();
        editor
            .expect_edit()
            .times(1)
            .returning(|_| Err(EditError::EditorFailed("exit status: 1".to_string())));
        let command = EditCommand::new(&repository, &editor, "alice");

        assert!(matches!(
            command.run(args()),
            Err(EditError::EditorFailed(_))
        ));
    }

    #[test]
    fn test_edit_unknown_entry_is_not_found() {
        let mut repository = MockEntryRepository::new();
        repository.expect_get_entry().returning(|user, id| {
            Err(StoreError::NotFound {
                user: user.to_string(),
                id: id.to_string(),
            })
        });
        repository.expect_update_entry().times(0);
        let mut editor = MockEntryEditor::new();
        editor.expect_edit().times(0);
        let command = EditCommand::new(&repository, &editor, "alice");

        let result = command.run(EditArgs {
            id: "missing".to_string(),
        });

        assert!(matches!(
            result,
            Err(EditError::NotFound { user, id }) if user == "alice" && id == "missing"
        ));
    }

    #[test]
    fn test_begin_edit_formats_running_entry() {
        let mut repository = MockEntryRepository::new();
        repository
            .expect_get_entry()
            .returning(|_, _| Ok(dummy_entry("r", at(9, 0), None)));
        let editor = MockEntryEditor::new();
        let command = EditCommand::new(&repository, &editor, "alice");

        let editable = command.begin_edit("r").unwrap();

        assert_eq!(editable.finish, "");
        assert!(!editable.begin.is_empty());
    }

    #[test]
    fn test_commit_stores_validated_entry() {
        let mut repository = MockEntryRepository::new();
        repository
            .expect_get_entry()
            .returning(|_, _| Ok(entry_a()));
        repository
            .expect_list_entries()
            .returning(|_| Ok(vec![entry_a(), entry_b()]));
        repository
            .expect_update_entry()
            .withf(|user, entry| user == "alice" && entry.id == "a" && entry.project.is_empty())
            .times(1)
            .returning(|_, entry| Ok(entry));
        let editor = MockEntryEditor::new();
        let command = EditCommand::new(&repository, &editor, "alice");
        let edited = EditableEntry {
            project: String::new(),
            ..EditableEntry::from(&entry_a())
        };

        let entry = command.commit("a", &edited).unwrap();

        assert_eq!(entry.project, "");
        assert_eq!(entry.begin, entry_a().begin);
    }

    #[test]
    fn test_commit_store_failure_is_reported() {
        let mut repository = MockEntryRepository::new();
        repository
            .expect_get_entry()
            .returning(|_, _| Ok(entry_a()));
        repository.expect_list_entries().returning(|_| {
            Err(StoreError::Io {
                path: "entries.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk"),
            })
        });
        repository.expect_update_entry().times(0);
        let editor = MockEntryEditor::new();
        let command = EditCommand::new(&repository, &editor, "alice");

        let result = command.commit("a", &EditableEntry::from(&entry_a()));

        assert!(matches!(result, Err(EditError::Store(StoreError::Io { .. }))));
    }
}
