//! Photo storage for record attachments.
//!
//! Photos live in the "public" area as opaque relative paths such as
//! `financial-reports/<uuid>.jpg`. Record rows hold the path; the bytes
//! live behind a [`PhotoStore`].

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Directory inside the photo store that record photos are written to.
pub const PHOTO_DIR: &str = "financial-reports";

/// Byte storage addressed by relative path.
pub trait PhotoStore {
    /// Whether a photo exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Read the photo at `path`.
    ///
    /// # Errors
    ///
    /// Returns `PhotoNotFound` if nothing is stored there.
    fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Store `bytes` at `path`, returning the stored path.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the path is unsafe.
    fn put(&self, bytes: &[u8], path: &str) -> Result<String>;

    /// Remove the photo at `path`. Missing photos are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails for another reason.
    fn delete(&self, path: &str) -> Result<()>;
}

/// A [`PhotoStore`] on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalPhotoStore {
    root: PathBuf,
}

impl LocalPhotoStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative store path to a location under the root.
    ///
    /// Absolute paths and `..` components are rejected.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the path would escape the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(Error::InvalidArgument(format!("unsafe photo path: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

impl PhotoStore for LocalPhotoStore {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|p| p.is_file())
    }

    fn get(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(Error::PhotoNotFound {
                path: path.to_string(),
            });
        }
        Ok(fs::read(full)?)
    }

    fn put(&self, bytes: &[u8], path: &str) -> Result<String> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, bytes)?;
        debug!(path, bytes = bytes.len(), "photo stored");
        Ok(path.to_string())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full) {
            Ok(()) => {
                debug!(path, "photo deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Store a new photo under a fresh random name with the given extension.
///
/// # Errors
///
/// Returns an error if the store rejects the write.
pub fn store_new_photo(store: &dyn PhotoStore, bytes: &[u8], extension: &str) -> Result<String> {
    let extension = extension.trim_start_matches('.');
    let path = if extension.is_empty() {
        format!("{PHOTO_DIR}/{}", uuid::Uuid::new_v4())
    } else {
        format!("{PHOTO_DIR}/{}.{extension}", uuid::Uuid::new_v4())
    };
    store.put(bytes, &path)
}

/// Final path component of a store path (`a/b/c.jpg` → `c.jpg`).
#[must_use]
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
