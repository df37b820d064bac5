use chrono::{DateTime, Utc};
use log::debug;

use crate::datetime::parse_time;
use crate::editable::EditableEntry;
use crate::error::EditError;
use crate::time_entry::Entry;

/// 編集内容を元のentryに反映し、検証した結果を返す。
///
/// 検証に通ったentryを返すだけで、ストアへの保存は呼び出し側で行う。
///
/// # Arguments
///
/// * `original` - 編集前のentry
/// * `editable` - ユーザーが編集した内容
/// * `entries` - 同じユーザーの全てのentry (`original`自身を含んでいてもよい)
/// * `now` - 計測中のentryの終了時刻として扱う日時
pub fn validate_entry(
    original: &Entry,
    editable: &EditableEntry,
    entries: &[Entry],
    now: DateTime<Utc>,
) -> Result<Entry, EditError> {
    let candidate = merge_entry(original, editable)?;

    if let Some(finish) = candidate.finish {
        if !candidate.is_finished_after_began() {
            return Err(EditError::FinishBeforeBegin {
                begin: candidate.begin,
                finish,
            });
        }
    }
    check_for_overlaps(&candidate, entries, now)?;

    Ok(candidate)
}

/// 編集内容を元のentryに反映する。
///
/// IDは元のentryのものを引き継ぐ。
/// `finish`の相対時間は編集後の`begin`を基準にする。
/// `begin`が空文字列の場合は元の開始時刻を維持し、`finish`が空文字列の場合は計測中に戻す。
pub fn merge_entry(original: &Entry, editable: &EditableEntry) -> Result<Entry, EditError> {
    let mut entry = original.clone();
    entry.project = editable.project.clone();
    entry.task = editable.task.clone();
    entry.notes = editable.notes.clone();

    if editable.begin.trim().is_empty() {
        debug!("Begin time left empty, keeping {}", original.begin);
    } else {
        entry.begin = parse_field("begin", &editable.begin, original.begin)?;
    }

    entry.finish = if editable.finish.trim().is_empty() {
        None
    } else {
        Some(parse_field("finish", &editable.finish, entry.begin)?)
    };

    Ok(entry)
}

fn parse_field(
    field: &'static str,
    text: &str,
    reference: DateTime<Utc>,
) -> Result<DateTime<Utc>, EditError> {
    parse_time(text, reference).map_err(|source| EditError::InvalidTimestamp {
        field,
        text: text.to_string(),
        source,
    })
}

/// 他のentryと時間が重なっていないかを確認する。
///
/// 同じIDのentryは対象外とする。
/// 重なりが複数ある場合は、開始時刻が最も早いentryを報告する。
pub fn check_for_overlaps(
    entry: &Entry,
    entries: &[Entry],
    now: DateTime<Utc>,
) -> Result<(), EditError> {
    let mut others: Vec<&Entry> = entries.iter().filter(|other| other.id != entry.id).collect();
    others.sort_by_key(|other| other.begin);

    match others.into_iter().find(|other| entry.overlaps(other, now)) {
        Some(other) => Err(EditError::OverlapConflict {
            id: other.id.clone(),
            begin: other.begin,
            end: other.effective_end(now),
        }),
        None => Ok(()),
    }
}
