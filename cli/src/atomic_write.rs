use std::borrow::Cow;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use tempfile::NamedTempFile;

/// Store, config and export files are replaced whole: the new text goes to a sibling temp file
/// that is synced and then renamed over `path`. A concurrent `text-expander` process reading the
/// store sees either the old document or the new one.
///
/// A bare file name is staged in the working directory. Missing directories are created. The
/// written text always ends in `\n`.
pub fn persist_document(path: &Path, contents: &str) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => anyhow::bail!("no directory to stage {} in", path.display()),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let text: Cow<'_, str> = if contents.ends_with('\n') {
        Cow::Borrowed(contents)
    } else {
        Cow::Owned(format!("{contents}\n"))
    };

    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("stage a temp file in {}", dir.display()))?;
    staged
        .write_all(text.as_bytes())
        .context("write staged document")?;
    staged
        .as_file()
        .sync_all()
        .context("sync staged document")?;

    staged.persist(path).map_err(|err| {
        anyhow::Error::new(err.error).context(format!("rename staged document to {}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_store_write_creates_the_data_dir() {
        let home = tempfile::tempdir().expect("tempdir");
        let store = home.path().join(".text-expander").join("store.json");

        persist_document(&store, r#"{"fuzzySearch":true}"#).expect("persist");

        assert_eq!(
            std::fs::read_to_string(&store).expect("read"),
            "{\"fuzzySearch\":true}\n"
        );
    }

    #[test]
    fn rewriting_config_leaves_only_the_target_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "[expansion]\ntrailing_space = true\n").expect("seed");

        persist_document(&config, "[expansion]\ntrailing_space = false\n").expect("persist");

        assert_eq!(
            std::fs::read_to_string(&config).expect("read"),
            "[expansion]\ntrailing_space = false\n"
        );
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("config.toml")]);
    }

    #[test]
    fn filesystem_root_is_rejected() {
        let err = persist_document(Path::new("/"), "{}").expect_err("no dir");
        assert_eq!(err.to_string(), "no directory to stage / in");
    }
}
