//! The output directory a bundle is written into.
//!
//! Every run starts from an empty directory: [`BundleDir::reset`] removes
//! whatever a previous run left behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::naming;

#[derive(Debug, Clone)]
pub struct BundleDir {
    root: PathBuf,
}

impl BundleDir {
    /// Relative roots are resolved against the current directory so the
    /// URLs written into documents are always absolute.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(root)
        };
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove the directory and everything in it, then recreate it empty.
    pub fn reset(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        fs::create_dir_all(&self.root)
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn write(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    pub fn file_url(&self, name: &str) -> String {
        naming::file_url(&self.path(name))
    }
}
