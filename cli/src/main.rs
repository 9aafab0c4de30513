mod atomic_write;
mod commands;
mod config;
mod headless;
mod json_store;
mod logging;
mod playground;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use expander_engine::Expander;
use expander_engine::ExpanderConfig;
use expander_engine::Store;

use crate::commands::ClipboardCommand;
use crate::commands::NotesCommand;
use crate::commands::ShortcutsCommand;
use crate::commands::Toggle;
use crate::config::ConfigStore;
use crate::headless::ExpandRequest;
use crate::json_store::JsonFileStore;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Expand //shortcuts, fill note templates, and recall copied text"
)]
struct Cli {
    /// Store file to use instead of the one named in the config.
    #[arg(long, env = "TEXT_EXPANDER_STORE")]
    store: Option<PathBuf>,

    /// Config file. Defaults to `~/.text-expander/config.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Manage shortcut groups and their expansions.
    #[command(subcommand)]
    Shortcuts(ShortcutsCommand),
    /// Manage note templates.
    #[command(subcommand)]
    Notes(NotesCommand),
    /// Inspect or edit the clipboard history.
    #[command(subcommand)]
    Clipboard(ClipboardCommand),
    /// Switch between prefix and fuzzy shortcut matching.
    Fuzzy {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Print usage statistics.
    Stats,
    /// Write a JSON backup of shortcuts, notes and clipboard history.
    Export { path: PathBuf },
    /// Restore a JSON backup; keys absent from the file are left alone.
    Import { path: PathBuf },
    /// Run the expander once over `text` and print the menu or the expanded result.
    Expand {
        text: String,
        /// Caret position in characters; defaults to the end of the text.
        #[arg(long)]
        caret: Option<usize>,
        /// Select the menu row at this index and press Enter.
        #[arg(long)]
        pick: Option<usize>,
        /// Use an editable region instead of a textarea.
        #[arg(long)]
        contenteditable: bool,
    },
    /// Interactive textarea for trying expansions in the terminal.
    Playground,
    /// Edit `config.toml`.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Append a space after every inserted expansion.
    TrailingSpace {
        #[arg(value_enum)]
        state: Toggle,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_store = match cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::new_default()?,
    };
    let _logging = logging::init(&config_store.data_dir());

    if let CliCommand::Config(ConfigCommand::TrailingSpace { state }) = cli.command {
        let enabled = state == Toggle::On;
        config_store.set_trailing_space(enabled)?;
        tracing::info!(enabled, path = %config_store.path().display(), "trailing space updated");
        println!(
            "Trailing space {}",
            if enabled { "enabled" } else { "disabled" }
        );
        return Ok(());
    }

    let store_path = match cli.store {
        Some(path) => path,
        None => config_store.store_path()?,
    };
    let mut store = Store::load(Box::new(JsonFileStore::new(store_path.clone())));
    match store.seed_defaults_if_empty() {
        Ok(true) => tracing::info!(path = %store_path.display(), "seeded default shortcuts"),
        Ok(false) => {}
        Err(err) => tracing::warn!("failed to seed default shortcuts: {err}"),
    }

    let output = match cli.command {
        CliCommand::Shortcuts(command) => commands::run_shortcuts(&mut store, command)?,
        CliCommand::Notes(command) => commands::run_notes(&mut store, command)?,
        CliCommand::Clipboard(command) => commands::run_clipboard(&mut store, command)?,
        CliCommand::Fuzzy { state } => commands::set_fuzzy(&mut store, state)?,
        CliCommand::Stats => commands::render_stats(store.usage_stats()),
        CliCommand::Export { path } => commands::export_to(&store, &path)?,
        CliCommand::Import { path } => commands::import_from(&mut store, &path)?,
        CliCommand::Expand {
            text,
            caret,
            pick,
            contenteditable,
        } => {
            let expander = Expander::new(store, expander_config(&config_store)?);
            headless::run_expand(
                expander,
                &ExpandRequest {
                    text,
                    caret,
                    pick,
                    contenteditable,
                },
            )?
        }
        CliCommand::Playground => {
            let expander = Expander::new(store, expander_config(&config_store)?);
            playground::run(expander).context("playground failed")?;
            return Ok(());
        }
        CliCommand::Config(_) => return Ok(()),
    };
    print!("{output}");
    Ok(())
}

fn expander_config(config_store: &ConfigStore) -> anyhow::Result<ExpanderConfig> {
    Ok(ExpanderConfig {
        trailing_space: config_store.trailing_space()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn expand_parses_caret_and_pick() {
        let cli = Cli::try_parse_from([
            "text-expander",
            "expand",
            "say //h",
            "--caret",
            "7",
            "--pick",
            "1",
        ])
        .expect("parse args");

        let CliCommand::Expand {
            text, caret, pick, ..
        } = cli.command
        else {
            panic!("expected expand command, got: {:?}", cli.command);
        };
        assert_eq!(text, "say //h");
        assert_eq!(caret, Some(7));
        assert_eq!(pick, Some(1));
    }

    #[test]
    fn fuzzy_requires_on_or_off() {
        assert!(Cli::try_parse_from(["text-expander", "fuzzy", "maybe"]).is_err());
        let cli = Cli::try_parse_from(["text-expander", "fuzzy", "on"]).expect("parse args");
        assert!(matches!(cli.command, CliCommand::Fuzzy { state: Toggle::On }));
    }

    #[test]
    fn shortcuts_import_defaults_group() {
        let cli = Cli::try_parse_from(["text-expander", "shortcuts", "import", "team.csv"])
            .expect("parse args");

        let CliCommand::Shortcuts(ShortcutsCommand::Import { csv, group }) = cli.command else {
            panic!("expected shortcuts import, got: {:?}", cli.command);
        };
        assert_eq!(csv, PathBuf::from("team.csv"));
        assert_eq!(group, "Imported");
    }

    #[test]
    fn store_flag_overrides_config() {
        let cli = Cli::try_parse_from(["text-expander", "--store", "/tmp/s.json", "stats"])
            .expect("parse args");
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/s.json")));
        assert!(matches!(cli.command, CliCommand::Stats));
    }

    #[test]
    fn config_trailing_space_parses() {
        let cli = Cli::try_parse_from(["text-expander", "config", "trailing-space", "off"])
            .expect("parse args");
        assert!(matches!(
            cli.command,
            CliCommand::Config(ConfigCommand::TrailingSpace { state: Toggle::Off })
        ));
    }
}
