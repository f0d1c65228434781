//! Print-ready export of a finished translation.

use askama::Template;

use crate::error::Result;
use crate::markup::render_translation;

/// File name offered when the translation is saved as PDF.
pub const SUGGESTED_FILE_NAME: &str = "translated_document.pdf";

pub const DEFAULT_TITLE: &str = "Translated Document";

/// Standalone HTML page that opens the print dialog once loaded.
#[derive(Debug, Clone, Template)]
#[template(path = "print.html")]
pub struct PrintDocument {
    pub title: String,
    /// Already sanitized markup
    pub body: String,
}

impl PrintDocument {
    /// Wrap raw translated markup, sanitizing it first.
    pub fn from_translation(title: impl Into<String>, markup: &str) -> Self {
        Self {
            title: title.into(),
            body: render_translation(markup),
        }
    }

    /// The full page; the title is escaped, the body is inserted as is.
    pub fn to_html(&self) -> Result<String> {
        Ok(self.render()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_wraps_sanitized_body() {
        let doc = PrintDocument::from_translation(
            DEFAULT_TITLE,
            "<h1>Title</h1><img src=\"x.png\"><script>alert(1)</script>",
        );
        let page = doc.to_html().unwrap();
        assert!(page.contains("<title>Translated Document</title>"));
        assert!(page.contains("<h1>Title</h1>"));
        assert!(page.contains("[Image/Figure]"));
        assert!(!page.contains("<img"));
        assert!(!page.contains("alert(1)"));
        assert!(page.contains("padding: 40px"));
        assert!(page.contains("window.print()"));
    }

    #[test]
    fn test_title_escaped() {
        let doc = PrintDocument::from_translation("a <b> & c", "<p>x</p>");
        let page = doc.to_html().unwrap();
        assert!(page.contains("<title>a "));
        assert!(!page.contains("<b>"));
        assert!(page.contains("<p>x</p>"));
    }
}
