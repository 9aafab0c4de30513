use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use toml_edit::DocumentMut;
use toml_edit::Item as TomlItem;
use toml_edit::Table as TomlTable;
use toml_edit::value;

use crate::atomic_write::persist_document;

const CONFIG_DIR_NAME: &str = ".text-expander";
const STORE_FILE_NAME: &str = "store.json";

/// `config.toml` next to the store. Edits go through `toml_edit` so user comments survive; a file
/// that no longer parses is read line by line instead of being rejected.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn new_default() -> anyhow::Result<Self> {
        let Some(home) = dirs::home_dir() else {
            anyhow::bail!("cannot determine home directory for config path");
        };
        Ok(Self::new(default_config_path(&home)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the config file; the default store and the logs live here too.
    pub fn data_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    /// `store_path`, resolved against the config directory when relative. Defaults to
    /// `store.json` in the data directory.
    pub fn store_path(&self) -> anyhow::Result<PathBuf> {
        let configured = match read_document_string(&self.path)? {
            None => None,
            Some(content) => match content.parse::<DocumentMut>() {
                Ok(doc) => read_store_path(&doc),
                Err(_) => parse_store_path_fallback(&content),
            },
        };
        let data_dir = self.data_dir();
        Ok(match configured {
            Some(path) => data_dir.join(path),
            None => data_dir.join(STORE_FILE_NAME),
        })
    }

    /// `[expansion] trailing_space`. Defaults to `true`.
    pub fn trailing_space(&self) -> anyhow::Result<bool> {
        let Some(content) = read_document_string(&self.path)? else {
            return Ok(true);
        };

        let doc = match content.parse::<DocumentMut>() {
            Ok(doc) => doc,
            Err(_) => return Ok(parse_trailing_space_fallback(&content).unwrap_or(true)),
        };
        Ok(read_trailing_space(&doc).unwrap_or(true))
    }

    pub fn set_trailing_space(&self, enabled: bool) -> anyhow::Result<()> {
        let content = read_document_string(&self.path)?.unwrap_or_default();

        let updated = match content.parse::<DocumentMut>() {
            Ok(mut doc) => {
                let expansion = ensure_table_for_write(&mut doc, "expansion");
                expansion["trailing_space"] = value(enabled);
                doc.to_string()
            }
            Err(_) => append_expansion_fallback(&content, enabled),
        };

        persist_document(&self.path, &updated)
    }
}

fn default_config_path(home: &Path) -> PathBuf {
    home.join(CONFIG_DIR_NAME).join("config.toml")
}

fn read_store_path(doc: &DocumentMut) -> Option<PathBuf> {
    doc.get("store_path")
        .and_then(TomlItem::as_value)
        .and_then(|v| v.as_str())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

fn read_trailing_space(doc: &DocumentMut) -> Option<bool> {
    doc.get("expansion")
        .and_then(TomlItem::as_table)
        .and_then(|expansion| expansion.get("trailing_space"))
        .and_then(TomlItem::as_value)
        .and_then(|v| v.as_bool())
}

/// Top-level `store_path = "..."` before the first table header.
fn parse_store_path_fallback(contents: &str) -> Option<PathBuf> {
    for line in contents.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            return None;
        }
        let Some(line) = strip_toml_comment(trimmed) else {
            continue;
        };
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        if key.trim() != "store_path" {
            continue;
        }
        let raw = raw.trim();
        let unquoted = raw
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .or_else(|| raw.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))?;
        if unquoted.is_empty() {
            return None;
        }
        return Some(PathBuf::from(unquoted));
    }
    None
}

fn parse_trailing_space_fallback(contents: &str) -> Option<bool> {
    let mut in_expansion = false;
    let mut result = None;

    for line in contents.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            in_expansion = matches!(parse_table_header_name(trimmed), Some("expansion"));
            continue;
        }
        if !in_expansion {
            continue;
        }

        let Some(line) = strip_toml_comment(trimmed) else {
            continue;
        };
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() != "trailing_space" {
            continue;
        }

        match value.split_whitespace().next().unwrap_or_default() {
            "true" => result = Some(true),
            "false" => result = Some(false),
            _ => {}
        }
    }

    result
}

fn parse_table_header_name(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if !line.starts_with('[') {
        return None;
    }
    let end = line.find(']')?;
    if end <= 1 {
        return None;
    }
    let name = line[1..end].trim();
    if name.is_empty() {
        return None;
    }
    Some(name)
}

fn strip_toml_comment(line: &str) -> Option<&str> {
    let line = line.split_once('#').map_or(line, |(head, _)| head).trim();
    if line.is_empty() { None } else { Some(line) }
}

fn ensure_table_for_write<'a>(doc: &'a mut DocumentMut, key: &str) -> &'a mut TomlTable {
    if !doc.get(key).is_some_and(TomlItem::is_table) {
        let mut table = TomlTable::new();
        table.set_implicit(false);
        doc[key] = TomlItem::Table(table);
    }
    doc[key]
        .as_table_mut()
        .unwrap_or_else(|| unreachable!("`{key}` was just made a table"))
}

fn append_expansion_fallback(existing: &str, enabled: bool) -> String {
    let mut out = existing.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str("[expansion]\n");
    out.push_str(&format!("trailing_space = {enabled}\n"));
    out
}

fn read_document_string(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(anyhow::Error::new(err).context("read config.toml")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn preserves_comments_and_sets_trailing_space() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"# top comment
store_path = "shortcuts.json"

[expansion] # keep me
# inner comment
trailing_space = true
"#,
        )
        .expect("write config");

        let store = ConfigStore::new(path.clone());
        store.set_trailing_space(false).expect("set flag");

        let updated = std::fs::read_to_string(&path).expect("read updated");
        assert!(updated.contains("# top comment"));
        assert!(updated.contains("# inner comment"));
        assert!(updated.contains("trailing_space = false"));
        assert!(!store.trailing_space().expect("read flag"));
        assert_eq!(
            store.store_path().expect("store path"),
            dir.path().join("shortcuts.json")
        );
    }

    #[test]
    fn defaults_when_config_is_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("config.toml"));
        assert!(store.trailing_space().expect("read flag"));
        assert_eq!(
            store.store_path().expect("store path"),
            dir.path().join("store.json")
        );
    }

    #[test]
    fn reads_settings_when_toml_is_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"store_path = "/var/lib/expander.json" # absolute
[broken
key = 1

[expansion]
trailing_space = false # keep me
"#,
        )
        .expect("write config");

        let store = ConfigStore::new(path);
        assert!(!store.trailing_space().expect("read flag"));
        assert_eq!(
            store.store_path().expect("store path"),
            PathBuf::from("/var/lib/expander.json")
        );
    }

    #[test]
    fn writing_invalid_toml_appends_a_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[broken\n").expect("write config");

        let store = ConfigStore::new(path.clone());
        store.set_trailing_space(false).expect("set flag");

        let updated = std::fs::read_to_string(&path).expect("read updated");
        assert_eq!(updated, "[broken\n\n[expansion]\ntrailing_space = false\n");
    }

    #[test]
    fn default_config_path_uses_dot_dir_in_home() {
        let home = Path::new("home");
        assert_eq!(
            default_config_path(home),
            home.join(".text-expander").join("config.toml")
        );
    }
}
