//! Document storage backends
//!
//! A session reads at most one document (on resume) and writes whole
//! documents; backends only move raw text.

use keystone_core::Result;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Raw document storage
pub trait Storage {
    /// Stored document, if any
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored document
    ///
    /// Completes or fails before returning.
    fn save(&mut self, raw: &str) -> Result<()>;
}

// ============================================================================
// MemoryStorage
// ============================================================================

/// In-memory string backend
///
/// Clones share the stored text, so a test can hand one handle to a session
/// and inspect writes through the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    contents: Rc<RefCell<Option<String>>>,
    saves: Rc<Cell<usize>>,
}

impl MemoryStorage {
    /// Empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-loaded with a document
    pub fn with_contents(raw: impl Into<String>) -> Self {
        let storage = Self::new();
        *storage.contents.borrow_mut() = Some(raw.into());
        storage
    }

    /// Current document text
    pub fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }

    /// Number of completed saves
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.contents())
    }

    fn save(&mut self, raw: &str) -> Result<()> {
        *self.contents.borrow_mut() = Some(raw.to_string());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

// ============================================================================
// FileStorage
// ============================================================================

/// Single-file backend with atomic replacement
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Backend writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStorage { path: path.into() }
    }

    /// Target file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&self.path)?))
    }

    fn save(&mut self, raw: &str) -> Result<()> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;

        // Atomic write: temp + fsync + rename
        let tmp_path = self.path.with_extension("json.tmp");
        {
            use std::io::Write;
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(raw.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
