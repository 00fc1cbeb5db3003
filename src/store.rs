//! Persistent state: favorite presets and the smart-choice history.
//!
//! Everything is read and written explicitly; nothing is cached behind the
//! caller's back.

use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;

/// Maximum number of entries kept in the smart-choice history.
pub const MAX_SMART_HISTORY: usize = 100;

/// Recent smart choices, oldest first, bounded to [`MAX_SMART_HISTORY`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: VecDeque<String>,
}

impl History {
    /// Build a history from names, oldest first, keeping the newest entries.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut history = Self::default();
        for name in names {
            history.push(name);
        }
        history
    }

    /// Append a name, dropping the oldest entry when full.
    pub fn push(&mut self, name: impl Into<String>) {
        if self.entries.len() == MAX_SMART_HISTORY {
            self.entries.pop_front();
        }
        self.entries.push_back(name.into());
    }

    /// The last `n` entries (fewer if the history is shorter).
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .skip(self.entries.len().saturating_sub(n))
            .map(String::as_str)
    }

    /// All entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Locations of config and data files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl Paths {
    /// Use explicit directories.
    #[must_use]
    pub fn new(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
        }
    }

    /// Platform directories for the application.
    ///
    /// # Errors
    ///
    /// Fails if no home directory can be determined.
    pub fn platform() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "prism")
            .ok_or_else(|| anyhow!("cannot determine home directory"))?;
        Ok(Self::new(
            dirs.config_dir().to_path_buf(),
            dirs.data_dir().to_path_buf(),
        ))
    }

    /// Path to a file in the config directory.
    #[must_use]
    pub fn config(&self, name: &str) -> PathBuf {
        self.config_dir.join(name)
    }

    /// Path to a file in the data directory.
    #[must_use]
    pub fn data(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn write_lines<'a>(path: &Path, lines: impl IntoIterator<Item = &'a str>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut content = lines.into_iter().collect::<Vec<_>>().join("\n");
    content.push('\n');
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// File-backed favorites and smart history.
#[derive(Debug, Clone)]
pub struct FileStore {
    paths: Paths,
}

impl FileStore {
    /// Create a store rooted at `paths`.
    #[must_use]
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    /// Where the files live.
    #[must_use]
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// The user's favorite preset names.
    ///
    /// # Errors
    ///
    /// Fails if the favorites file exists but cannot be read.
    pub fn favorites(&self) -> Result<BTreeSet<String>> {
        Ok(read_lines(&self.paths.config("favorites"))?.into_iter().collect())
    }

    /// Replace the favorites file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn set_favorites(&self, favorites: &BTreeSet<String>) -> Result<()> {
        write_lines(
            &self.paths.config("favorites"),
            favorites.iter().map(String::as_str),
        )
    }

    /// The recent smart choices.
    ///
    /// # Errors
    ///
    /// Fails if the history file exists but cannot be read.
    pub fn smart_history(&self) -> Result<History> {
        Ok(History::new(read_lines(&self.paths.data("smart_history"))?))
    }

    /// Replace the history file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn set_smart_history(&self, history: &History) -> Result<()> {
        write_lines(&self.paths.data("smart_history"), history.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Result<(tempfile::TempDir, FileStore)> {
        let dir = tempfile::tempdir()?;
        let paths = Paths::new(dir.path().join("config"), dir.path().join("data"));
        Ok((dir, FileStore::new(paths)))
    }

    #[test]
    fn test_history_is_bounded() {
        let history = History::new((0..150).map(|i| i.to_string()));
        assert_eq!(history.len(), MAX_SMART_HISTORY);
        assert_eq!(history.iter().next(), Some("50"));
        assert_eq!(history.iter().last(), Some("149"));
    }

    #[test]
    fn test_history_recent() {
        let history = History::new(["A", "B", "C"]);
        assert_eq!(history.recent(2).collect::<Vec<_>>(), ["B", "C"]);
        assert_eq!(history.recent(10).count(), 3);
        assert_eq!(history.recent(0).count(), 0);
    }

    #[test]
    fn test_missing_files_read_empty() -> Result<()> {
        let (_dir, store) = store()?;
        assert!(store.favorites()?.is_empty());
        assert!(store.smart_history()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_favorites_round_trip() -> Result<()> {
        let (_dir, store) = store()?;
        let favorites: BTreeSet<String> =
            ["Solarized Dark", "nord"].into_iter().map(String::from).collect();
        store.set_favorites(&favorites)?;
        assert_eq!(store.favorites()?, favorites);
        Ok(())
    }

    #[test]
    fn test_history_round_trip() -> Result<()> {
        let (_dir, store) = store()?;
        let mut history = store.smart_history()?;
        history.push("gruvbox-dark");
        history.push("Tango Light");
        store.set_smart_history(&history)?;
        assert_eq!(store.smart_history()?, history);
        Ok(())
    }

    #[test]
    fn test_blank_lines_are_ignored() -> Result<()> {
        let (_dir, store) = store()?;
        let path = store.paths().data("smart_history");
        fs::create_dir_all(path.parent().expect("parent"))?;
        fs::write(&path, "\n  a  \n\nb\n")?;
        assert_eq!(store.smart_history()?, History::new(["a", "b"]));
        Ok(())
    }
}
