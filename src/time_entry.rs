use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 記録された1件のtime entry。
///
/// `finish`が`None`の場合は計測中(open)のentryを表す。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub begin: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<DateTime<Utc>>,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub notes: String,
}

impl Entry {
    /// 終了時刻が開始時刻より前になっていないかを確認する。
    ///
    /// 計測中のentryは常に`true`とする。
    pub fn is_finished_after_began(&self) -> bool {
        self.finish.map_or(true, |finish| finish >= self.begin)
    }

    /// 重なり判定に利用する終了時刻を返す。
    ///
    /// 計測中のentryは`now`まで続いているものとして扱う。
    pub fn effective_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.finish.unwrap_or(now)
    }

    /// `[begin, effective_end)`の半開区間同士が重なっているかを判定する。
    ///
    /// 端点が一致しているだけの場合は重なりとみなさない。
    pub fn overlaps(&self, other: &Entry, now: DateTime<Utc>) -> bool {
        self.begin < other.effective_end(now) && self.effective_end(now) > other.begin
    }
}
