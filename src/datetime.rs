use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use thiserror::Error;

/// 編集用テキストで利用する日時フォーマット。
pub const ENTRY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

const LOCAL_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
const TIME_OF_DAY_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// 日時文字列を解釈できなかった場合のエラー。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseTimeError {
    #[error("unrecognized time format: {0:?}")]
    Unrecognized(String),
    #[error("{0:?} does not name a single instant in the local timezone")]
    AmbiguousLocal(String),
}

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// 日時をLocalタイムゾーンのオフセット付き文字列に変換する。
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format(ENTRY_TIME_FORMAT)
        .to_string()
}

/// ユーザーが入力した日時文字列をパースする。
///
/// 以下の形式を受け付ける。
///
/// * `YYYY-MM-DD HH:MM:SS ±HHMM`
/// * RFC 3339
/// * `YYYY-MM-DD HH:MM[:SS]` (Localタイムゾーン)
/// * `HH:MM[:SS]` (`reference`と同じLocalの日付)
/// * `+H:MM`, `-H:MM` (`reference`からの相対時間)
///
/// # Arguments
///
/// * `text` - パースする文字列
/// * `reference` - 日付や相対時間の基準となる日時
pub fn parse_time(text: &str, reference: DateTime<Utc>) -> Result<DateTime<Utc>, ParseTimeError> {
    let text = text.trim();

    if let Ok(datetime) = DateTime::parse_from_str(text, ENTRY_TIME_FORMAT) {
        return Ok(datetime.to_utc());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Ok(datetime.to_utc());
    }
    if let Some(naive) = LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return from_local(&naive, text);
    }
    if let Some(duration) = parse_relative(text) {
        return reference
            .checked_add_signed(duration)
            .ok_or_else(|| ParseTimeError::Unrecognized(text.to_string()));
    }
    if let Some(time) = TIME_OF_DAY_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
    {
        let date = reference.with_timezone(&Local).date_naive();
        return from_local(&date.and_time(time), text);
    }

    Err(ParseTimeError::Unrecognized(text.to_string()))
}

fn from_local(naive: &NaiveDateTime, text: &str) -> Result<DateTime<Utc>, ParseTimeError> {
    Local
        .from_local_datetime(naive)
        .single()
        .map(|datetime| datetime.to_utc())
        .ok_or_else(|| ParseTimeError::AmbiguousLocal(text.to_string()))
}

/// `+1:30`や`-0:15`のような相対時間をパースする。
///
/// 時間と分は符号なしの数字のみ受け付け、桁あふれする値は`None`とする。
fn parse_relative(text: &str) -> Option<Duration> {
    let (sign, rest) = match text.chars().next()? {
        '+' => (1, &text[1..]),
        '-' => (-1, &text[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours = parse_digits(hours)?;
    let minutes = parse_digits(minutes)?;
    if minutes >= 60 {
        return None;
    }

    let total = hours.checked_mul(60)?.checked_add(minutes)?;
    Duration::try_minutes(sign * i64::try_from(total).ok()?)
}

fn parse_digits(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
