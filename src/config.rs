use std::{env, path::PathBuf};

use anyhow::{Context, Result};

const DEFAULT_EDITOR: &str = "vi";
const DEFAULT_USER: &str = "default";

/// 環境変数から読み込む設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// time entryを保存するJSONファイル。`ZEIT_DB`で上書きできる。
    pub database_path: PathBuf,
    /// 編集するentryの所有者。
    pub user: String,
    /// 編集に利用するエディタのコマンド。
    pub editor: String,
}

impl Config {
    /// 環境変数から新しい`Config`を返す。
    ///
    /// `ZEIT_DB`が設定されておらず、データディレクトリも決められない場合はエラーを返す。
    pub fn from_env() -> Result<Self> {
        let database_path = match env::var_os("ZEIT_DB") {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => default_database_path().context("ZEIT_DB must be set")?,
        };

        Ok(Self {
            database_path,
            user: resolve_user(
                env::var("ZEIT_USER").ok(),
                env::var("USER").ok(),
                env::var("USERNAME").ok(),
            ),
            editor: resolve_editor(env::var("VISUAL").ok(), env::var("EDITOR").ok()),
        })
    }
}

/// `{data_dir}/zeit/entries.json`を返す。
fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("zeit").join("entries.json"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `$VISUAL`、`$EDITOR`の順にエディタを決める。どちらもなければ`vi`を利用する。
fn resolve_editor(visual: Option<String>, editor: Option<String>) -> String {
    non_empty(visual)
        .or_else(|| non_empty(editor))
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
}

fn resolve_user(zeit_user: Option<String>, user: Option<String>, username: Option<String>) -> String {
    non_empty(zeit_user)
        .or_else(|| non_empty(user))
        .or_else(|| non_empty(username))
        .unwrap_or_else(|| DEFAULT_USER.to_string())
}
