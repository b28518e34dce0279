use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::atomic_io::write_text_atomic;

/// Minimal file access over `/`-separated paths relative to a data root.
pub trait VirtualFs {
    fn read_to_string(&self, path: &str) -> io::Result<String>;

    /// Replaces the file at `path` so readers never observe a partial write.
    fn write_atomic(&self, path: &str, contents: &str) -> io::Result<()>;

    fn exists(&self, path: &str) -> bool;
}

impl<F: VirtualFs + ?Sized> VirtualFs for &F {
    fn read_to_string(&self, path: &str) -> io::Result<String> {
        (**self).read_to_string(path)
    }

    fn write_atomic(&self, path: &str, contents: &str) -> io::Result<()> {
        (**self).write_atomic(path, contents)
    }

    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }
}

#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("virtual path must stay inside the data root: '{path}'"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl VirtualFs for DiskFs {
    fn read_to_string(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(self.resolve(path)?)
    }

    fn write_atomic(&self, path: &str, contents: &str) -> io::Result<()> {
        write_text_atomic(&self.resolve(path)?, contents)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|resolved| resolved.is_file())
    }
}

/// In-memory file table for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RefCell<BTreeMap<String, String>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.borrow_mut().insert(path.into(), contents.into());
        self
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.borrow().is_empty()
    }
}

impl VirtualFs for MemoryFs {
    fn read_to_string(&self, path: &str) -> io::Result<String> {
        self.file(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file: '{path}'"))
        })
    }

    fn write_atomic(&self, path: &str, contents: &str) -> io::Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_string(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }
}
