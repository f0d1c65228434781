//! File intake: validation of user-selected documents.
//!
//! Drag-and-drop and the file picker both end up as an [`IncomingFile`];
//! [`accept`] is the single validation path. Intake never creates previews.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// The only media type accepted for translation.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Shown to the user when a non-PDF file is dropped or picked.
pub const REJECTION_MESSAGE: &str =
    "Currently, only PDF files are supported for high-fidelity formatting preservation.";

/// A file handle as handed over by the upload surface.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    /// Declared media type; `None` when the client sent none
    pub media_type: Option<String>,
    pub bytes: Bytes,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, media_type: Option<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, deriving its media type from the extension.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(|| "document.pdf".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, None, bytes))
    }

    /// Declared media type verbatim, or the one a browser would derive from
    /// the name when none was declared.
    pub fn effective_media_type(&self) -> String {
        match self.media_type.as_deref() {
            Some(declared) if !declared.is_empty() => declared.to_string(),
            _ => mime_guess::from_path(&self.name)
                .first_raw()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// A validated PDF selection.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn display_size(&self) -> String {
        crate::util::format_size(self.size())
    }

    /// The size limit is guidance only and never rejects a file.
    pub fn exceeds_soft_limit(&self, limit_bytes: u64) -> bool {
        self.size() > limit_bytes
    }
}

/// Validate a selected file. Anything but a PDF is rejected.
pub fn accept(file: IncomingFile) -> Result<SelectedFile> {
    let media_type = file.effective_media_type();

    if media_type != PDF_MEDIA_TYPE {
        debug!("Rejected {} ({})", file.name, media_type);
        return Err(Error::UnsupportedMediaType {
            media_type,
            message: REJECTION_MESSAGE,
        });
    }

    let selected = SelectedFile {
        name: file.name,
        media_type,
        bytes: file.bytes,
    };
    debug!("Accepted {} ({})", selected.name, selected.display_size());
    Ok(selected)
}

/// [`accept`] plus a warning when the file is larger than the advertised limit.
pub fn accept_with_limit(file: IncomingFile, limit_bytes: u64) -> Result<SelectedFile> {
    let selected = accept(file)?;
    if selected.exceeds_soft_limit(limit_bytes) {
        warn!(
            "{} is {}, above the recommended maximum",
            selected.name,
            selected.display_size()
        );
    }
    Ok(selected)
}
