mod document;
mod render;

pub use document::PdfDocument;
pub use render::{
    DEFAULT_RENDER_SCALE, ImageFormat, PageRaster, PageRenderer, RenderedDocument,
    RenderedPage, render_document,
};
