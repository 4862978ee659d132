use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::CatalogError;

pub const DEFAULT_OUTPUT_DIR: &str = "art";
pub const IMAGES_DIR: &str = "images";
pub const DOCUMENT_FILE: &str = "catalog.html";

/// Where a run writes: `<root>/images/` and `<root>/catalog.html`.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: Utf8PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn images_dir(&self) -> Utf8PathBuf {
        self.root.join(IMAGES_DIR)
    }

    pub fn image_path(&self, filename: &str) -> Utf8PathBuf {
        self.images_dir().join(filename)
    }

    pub fn document_path(&self) -> Utf8PathBuf {
        self.root.join(DOCUMENT_FILE)
    }

    pub fn ensure_dirs(&self) -> Result<(), CatalogError> {
        fs::create_dir_all(self.images_dir().as_std_path())
            .map_err(|err| CatalogError::Filesystem(format!("create {}: {err}", self.images_dir())))
    }

    /// Replaces the document in one step so a previous catalog survives a
    /// failed write.
    pub fn write_document(&self, html: &str) -> Result<Utf8PathBuf, CatalogError> {
        let path = self.document_path();
        write_bytes_atomic(&path, html.as_bytes())?;
        Ok(path)
    }
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CatalogError> {
    let parent = path
        .parent()
        .ok_or_else(|| CatalogError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    let mut temp = Builder::new()
        .prefix(".catalog-")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    Ok(())
}
