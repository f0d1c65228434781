use std::sync::Arc;

use mupdf::{Document as MuDocument, MetadataName};

use crate::error::{Error, Result};

/// Thread-safe handle to a PDF held in memory
#[derive(Clone)]
pub struct PdfDocument {
    /// Raw PDF bytes, shared between clones
    bytes: Arc<Vec<u8>>,
    title: Option<String>,
    page_count: usize,
}

impl PdfDocument {
    /// Open a PDF from bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let doc = MuDocument::from_bytes(&bytes, "")
            .map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;

        let page_count = doc
            .page_count()
            .map_err(|e| Error::PdfOpen(format!("Failed to get page count: {e}")))?;

        // mupdf returns an empty string when the entry is absent
        let title = doc.metadata(MetadataName::Title).ok().filter(|s| !s.is_empty());

        Ok(Self {
            bytes: Arc::new(bytes),
            title,
            page_count: usize::try_from(page_count).unwrap_or(0),
        })
    }

    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Open the document for page operations (creates a temporary handle).
    ///
    /// mupdf handles are not `Send`, so each render opens its own.
    pub(crate) fn open_document(&self) -> Result<MuDocument> {
        MuDocument::from_bytes(&self.bytes, "")
            .map_err(|e| Error::PdfOpen(format!("Failed to open document: {e}")))
    }

    /// Convert a 0-based page number to mupdf's index type, checking bounds.
    pub(crate) fn page_index(&self, page: usize) -> Result<i32> {
        if page >= self.page_count {
            return Err(Error::PdfInvalidPage {
                page,
                total: self.page_count,
            });
        }
        i32::try_from(page).map_err(|_| Error::PdfInvalidPage {
            page,
            total: self.page_count,
        })
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .field("title", &self.title)
            .field("bytes_len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
