use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::time_entry::Entry;

#[cfg(test)]
use mockall::automock;

/// ストア操作で発生するエラー。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entry {id} not found for user {user}")]
    NotFound { user: String, id: String },
    #[error("failed to access database {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("database {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to replace database {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// time entryを保存するストアを表すtrait。
#[cfg_attr(test, automock)]
pub trait EntryRepository {
    /// ユーザーのtime entryを1件取得する。
    ///
    /// 存在しない場合は`StoreError::NotFound`を返す。
    fn get_entry(&self, user: &str, id: &str) -> Result<Entry, StoreError>;

    /// ユーザーの全てのtime entryを取得する。
    fn list_entries(&self, user: &str) -> Result<Vec<Entry>, StoreError>;

    /// 同じIDのtime entryを上書きし、保存した内容を返す。
    fn update_entry(&self, user: &str, entry: Entry) -> Result<Entry, StoreError>;
}

type Entries = BTreeMap<String, Vec<Entry>>;

/// ユーザーごとのtime entryを1つのJSONファイルに保存するストア。
///
/// ファイルは`{"<user>": [entry, ...]}`の形式で保存する。
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// 新しい`JsonFileRepository`を返す。
    ///
    /// ファイルは最初の書き込み時に作成する。
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Entries, StoreError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("Database {} does not exist yet", self.path.display());
                return Ok(Entries::new());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// 同じディレクトリに一時ファイルを書き出してからrenameする。
    fn save(&self, entries: &Entries) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|source| self.io_error(source))?;

        let data = serde_json::to_vec_pretty(entries).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let mut file = NamedTempFile::new_in(dir).map_err(|source| self.io_error(source))?;
        file.write_all(&data)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|source| self.io_error(source))?;
        file.persist(&self.path)
            .map_err(|source| StoreError::Persist {
                path: self.path.clone(),
                source,
            })?;

        Ok(())
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl EntryRepository for JsonFileRepository {
    fn get_entry(&self, user: &str, id: &str) -> Result<Entry, StoreError> {
        self.load()?
            .remove(user)
            .and_then(|entries| entries.into_iter().find(|entry| entry.id == id))
            .ok_or_else(|| StoreError::NotFound {
                user: user.to_string(),
                id: id.to_string(),
            })
    }

    fn list_entries(&self, user: &str) -> Result<Vec<Entry>, StoreError> {
        let entries = self.load()?.remove(user).unwrap_or_default();
        debug!("Loaded {} entries for user {}", entries.len(), user);

        Ok(entries)
    }

    fn update_entry(&self, user: &str, entry: Entry) -> Result<Entry, StoreError> {
        let mut all_entries = self.load()?;
        let stored = all_entries
            .get_mut(user)
            .and_then(|entries| entries.iter_mut().find(|stored| stored.id == entry.id))
            .ok_or_else(|| StoreError::NotFound {
                user: user.to_string(),
                id: entry.id.clone(),
            })?;
        *stored = entry.clone();

        self.save(&all_entries)?;
        info!("Entry {} updated in {}", entry.id, self.path.display());

        Ok(entry)
    }
}
