use std::io;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use fern::colors::{Color, ColoredLevelConfig};
use log::{debug, LevelFilter};

mod config;
mod console;
mod datetime;
mod edit_command;
mod editable;
mod editor;
mod error;
mod store;
mod time_entry;
mod validator;

use config::Config;
use console::{ConsoleMarkdownList, ConsolePresenter};
use edit_command::{EditArgs, EditCommand, EditOutcome};
use editor::ExternalEditor;
use store::JsonFileRepository;

/// 記録したtime entryを編集するためのCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- edit 0b6c3e1a
/// $ ZEIT_DB=/tmp/entries.json cargo run -- --verbose edit 0b6c3e1a
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(short, long, global = true, help = "Show debug logs")]
    verbose: bool,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Edit an entry using $EDITOR
    Edit(EditArgs),
}

fn main() -> Result<()> {
    let args = Args::parse();

    setup_logger(args.verbose).context("Failed to set up logger")?;
    let config = Config::from_env().context("Failed to load configuration")?;
    debug!("Loaded configuration: {:?}", config);

    match args.subcommand {
        SubCommands::Edit(edit) => edit_entry(&config, edit)?,
    }

    Ok(())
}

/// `edit`サブコマンドを実行し、結果を表示する。
fn edit_entry(config: &Config, args: EditArgs) -> Result<()> {
    let repository = JsonFileRepository::new(&config.database_path);
    let editor = ExternalEditor::new(&config.editor);
    let command = EditCommand::new(&repository, &editor, &config.user);

    let id = args.id.clone();
    let outcome = command
        .run(args)
        .with_context(|| format!("Failed to edit entry {}", id))?;

    let mut stdout = io::stdout();
    let mut presenter = ConsoleMarkdownList::new(&mut stdout);
    match outcome {
        EditOutcome::Updated(entry) => {
            println!("Entry updated successfully");
            presenter.show_entry(&entry)?;
        }
        EditOutcome::Unchanged(entry) => {
            println!("No changes made");
            presenter.show_entry(&entry)?;
        }
    }

    Ok(())
}

/// ログの出力先と形式を設定する。
fn setup_logger(verbose: bool) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue);
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr())
        .apply()?;

    Ok(())
}
