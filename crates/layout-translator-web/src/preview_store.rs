//! Disk-backed previews of uploaded documents.
//!
//! Every selected file gets a revocable preview: a directory holding the
//! rasterized pages, served under `/preview/{id}/{page}`. Revoking a preview
//! drops its directory, after which its URLs answer 404.
//!
//! Like the session lock, the store's lock only guards metadata. Rendering
//! and file I/O happen outside it.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use layout_translator_core::{
    ImageFormat, PreviewHandle, PreviewRegistry, RenderedDocument, Result as CoreResult,
    SelectedFile,
};
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

/// Dimensions of one rendered page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub page: usize,
    pub width: u32,
    pub height: u32,
}

/// Pages written for a preview
#[derive(Debug, Clone)]
pub struct PageSet {
    pub format: ImageFormat,
    pub pages: Vec<PageMeta>,
    /// Page count of the document, including pages that failed to render
    pub total: usize,
}

struct PreviewEntry {
    /// Auto-cleaned on drop
    dir: TempDir,
    bytes: Bytes,
    pages: Option<PageSet>,
}

pub struct PreviewStore {
    root: TempDir,
    entries: Mutex<HashMap<String, PreviewEntry>>,
}

impl PreviewStore {
    pub fn new() -> io::Result<Self> {
        let root = TempDir::new()?;
        debug!("Created preview store at {}", root.path().display());
        Ok(Self {
            root,
            entries: Mutex::new(HashMap::new()),
        })
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, PreviewEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn outstanding(&self) -> usize {
        self.entries().len()
    }

    /// Document bytes and the directory pages should be written to.
    pub fn source(&self, id: &str) -> Option<(Bytes, PathBuf)> {
        self.entries()
            .get(id)
            .map(|e| (e.bytes.clone(), e.dir.path().to_path_buf()))
    }

    /// Pages already written, if any.
    pub fn page_set(&self, id: &str) -> Option<PageSet> {
        self.entries().get(id).and_then(|e| e.pages.clone())
    }

    /// Record written pages. Returns `false` if the preview was revoked meanwhile.
    pub fn mark_rendered(&self, id: &str, pages: PageSet) -> bool {
        match self.entries().get_mut(id) {
            Some(entry) => {
                debug!("Preview {} has {} pages on disk", id, pages.pages.len());
                entry.pages = Some(pages);
                true
            }
            None => false,
        }
    }

    /// Path and format of a rendered page.
    pub fn page_file(&self, id: &str, page: usize) -> Option<(PathBuf, ImageFormat)> {
        let entries = self.entries();
        let entry = entries.get(id)?;
        let pages = entry.pages.as_ref()?;
        pages
            .pages
            .iter()
            .any(|p| p.page == page)
            .then(|| (page_path(entry.dir.path(), page, pages.format), pages.format))
    }
}

impl PreviewRegistry for PreviewStore {
    fn create(&self, file: &SelectedFile) -> CoreResult<PreviewHandle> {
        let dir = TempDir::new_in(self.root.path())?;
        let id = Uuid::new_v4().simple().to_string();
        debug!("Created preview {} for {}", id, file.name);

        self.entries().insert(
            id.clone(),
            PreviewEntry {
                dir,
                bytes: file.bytes.clone(),
                pages: None,
            },
        );
        Ok(PreviewHandle {
            url: format!("/preview/{id}"),
            id,
        })
    }

    fn revoke(&self, handle: &PreviewHandle) {
        if self.entries().remove(&handle.id).is_some() {
            debug!("Revoked preview {}", handle.id);
        }
    }
}

pub fn page_path(dir: &Path, page: usize, format: ImageFormat) -> PathBuf {
    dir.join(format!("page_{page}.{}", format.extension()))
}

/// Write rendered pages into `dir` (blocking I/O).
pub fn write_pages(dir: &Path, rendered: &RenderedDocument, format: ImageFormat) -> io::Result<PageSet> {
    let mut pages = Vec::with_capacity(rendered.pages.len());
    for page in &rendered.pages {
        std::fs::write(page_path(dir, page.page, format), &page.data)?;
        pages.push(PageMeta {
            page: page.page,
            width: page.width,
            height: page.height,
        });
    }
    Ok(PageSet {
        format,
        pages,
        total: rendered.total_pages(),
    })
}
