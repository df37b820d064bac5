use std::io::Write;

use anyhow::{Context, Result};
use chrono::Local;

use crate::time_entry::Entry;

/// Consoleにtime entryを表示するためのtrait。
pub trait ConsolePresenter {
    /// タイムエントリーを表示する。
    ///
    /// # Arguments
    ///
    /// * `entry` - 表示するタイムエントリー
    fn show_entry(&mut self, entry: &Entry) -> Result<()>;
}

/// タイムエントリーをMarkdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // 1行目に時間とproject/task、以降にnotesをインデントして表示する。
    fn show_entry(&mut self, entry: &Entry) -> Result<()> {
        let begin = entry.begin.with_timezone(&Local);
        let begin_str = begin.format("%Y-%m-%d %H:%M").to_string();
        let end_str = entry
            .finish
            .map(|finish| {
                let finish = finish.with_timezone(&Local);
                if finish.date_naive() == begin.date_naive() {
                    finish.format("%H:%M").to_string()
                } else {
                    finish.format("%Y-%m-%d %H:%M").to_string()
                }
            })
            .unwrap_or_else(|| "now".to_string());
        let duration = entry.finish.map(|finish| finish - entry.begin).map(|d| {
            format!(
                " ({}h{:02}m)",
                d.num_hours(),
                d.num_minutes() - d.num_hours() * 60
            )
        });

        writeln!(
            self.writer,
            "- {} ~ {}{}: {} [{}] ({})",
            begin_str,
            end_str,
            duration.unwrap_or_default(),
            entry.project,
            entry.task,
            entry.id
        )
        .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
        for line in entry.notes.lines() {
            writeln!(self.writer, "  > {}", line)
                .with_context(|| format!("Failed to write notes of entry: {}", entry.id))?;
        }

        Ok(())
    }
}
