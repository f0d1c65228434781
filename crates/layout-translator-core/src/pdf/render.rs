use image::{ImageEncoder, RgbaImage};
use mupdf::{Colorspace, Matrix};
use tracing::{debug, warn};
use webp::Encoder as WebpEncoder;

use super::document::PdfDocument;
use crate::error::{Error, Result};

/// Default zoom multiplier for the original-page preview
pub const DEFAULT_RENDER_SCALE: f32 = 1.5;

/// Raster encoding for rendered pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    /// Lossy, quality 85
    Webp,
}

impl ImageFormat {
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

/// One rasterized page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 0-based page number
    pub page: usize,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

/// Anything that can report a page count and rasterize pages by index.
pub trait PageRaster {
    fn page_count(&self) -> usize;

    fn render(&self, page: usize, format: ImageFormat) -> Result<RenderedPage>;
}

/// Result of rendering a whole document
#[derive(Debug, Default)]
pub struct RenderedDocument {
    /// Successfully rendered pages, in document order
    pub pages: Vec<RenderedPage>,
    /// Pages that failed to render
    pub skipped: Vec<usize>,
}

impl RenderedDocument {
    pub fn total_pages(&self) -> usize {
        self.pages.len() + self.skipped.len()
    }
}

/// Render every page in increasing order.
///
/// A page that fails is logged and skipped; the remaining pages still render.
pub fn render_document(raster: &impl PageRaster, format: ImageFormat) -> RenderedDocument {
    let total = raster.page_count();
    let mut rendered = RenderedDocument {
        pages: Vec::with_capacity(total),
        skipped: Vec::new(),
    };

    for page in 0..total {
        match raster.render(page, format) {
            Ok(image) => rendered.pages.push(image),
            Err(e) => {
                warn!("Error rendering page {}: {}", page + 1, e);
                rendered.skipped.push(page);
            }
        }
    }

    debug!(
        "Rendered {} of {} pages ({} skipped)",
        rendered.pages.len(),
        total,
        rendered.skipped.len()
    );
    rendered
}

/// Page renderer for PDF documents
pub struct PageRenderer<'a> {
    pub doc: &'a PdfDocument,
    pub scale: f32,
}

impl<'a> PageRenderer<'a> {
    pub const fn with_scale(doc: &'a PdfDocument, scale: f32) -> Self {
        Self { doc, scale }
    }

    /// Render a page to an RGBA image buffer
    pub fn render_page(&self, page_num: usize) -> Result<RgbaImage> {
        let index = self.doc.page_index(page_num)?;

        let render_err = |reason: String| Error::PdfRender {
            page: page_num,
            reason,
        };

        let doc = self.doc.open_document()?;
        let page = doc
            .load_page(index)
            .map_err(|e| render_err(format!("Failed to load page: {e}")))?;

        let matrix = Matrix::new_scale(self.scale, self.scale);
        let pixmap = page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), 1.0, true)
            .map_err(|e| render_err(format!("Failed to render: {e}")))?;

        let img_width = pixmap.width();
        let img_height = pixmap.height();
        let n = pixmap.n() as usize; // components per pixel

        let mut rgba = Vec::with_capacity((img_width * img_height * 4) as usize);
        for px in pixmap.samples().chunks(n) {
            match n {
                4 => rgba.extend_from_slice(px),
                3 => rgba.extend_from_slice(&[px[0], px[1], px[2], 255]),
                1 => rgba.extend_from_slice(&[px[0], px[0], px[0], 255]),
                _ => {
                    return Err(render_err(format!(
                        "Unexpected pixel format with {n} components"
                    )));
                }
            }
        }

        RgbaImage::from_raw(img_width, img_height, rgba)
            .ok_or_else(|| render_err("Failed to create image buffer".to_string()))
    }
}

impl PageRaster for PageRenderer<'_> {
    fn page_count(&self) -> usize {
        self.doc.page_count()
    }

    fn render(&self, page: usize, format: ImageFormat) -> Result<RenderedPage> {
        let img = self.render_page(page)?;
        let data = match format {
            ImageFormat::Png => encode_png(&img).map_err(|reason| Error::PdfRender { page, reason })?,
            ImageFormat::Webp => encode_webp(&img),
        };
        Ok(RenderedPage {
            page,
            width: img.width(),
            height: img.height(),
            format,
            data,
        })
    }
}

fn encode_png(img: &RgbaImage) -> std::result::Result<Vec<u8>, String> {
    let mut png_data = Vec::new();
    // Fast compression, still lossless
    let encoder = image::codecs::png::PngEncoder::new_with_quality(
        &mut png_data,
        image::codecs::png::CompressionType::Fast,
        image::codecs::png::FilterType::Adaptive,
    );
    encoder
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| format!("Failed to encode PNG: {e}"))?;
    Ok(png_data)
}

fn encode_webp(img: &RgbaImage) -> Vec<u8> {
    WebpEncoder::from_rgba(img.as_raw(), img.width(), img.height())
        .encode(85.0)
        .to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyRaster {
        pages: usize,
        broken: Vec<usize>,
    }

    impl PageRaster for FlakyRaster {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn render(&self, page: usize, format: ImageFormat) -> Result<RenderedPage> {
            if self.broken.contains(&page) {
                return Err(Error::PdfRender {
                    page,
                    reason: "corrupt content stream".to_string(),
                });
            }
            Ok(RenderedPage {
                page,
                width: 10,
                height: 10,
                format,
                data: vec![page as u8],
            })
        }
    }

    #[test]
    fn test_failed_page_is_skipped() {
        let raster = FlakyRaster { pages: 4, broken: vec![1] };
        let doc = render_document(&raster, ImageFormat::Png);
        let order: Vec<_> = doc.pages.iter().map(|p| p.page).collect();
        assert_eq!(order, vec![0, 2, 3]);
        assert_eq!(doc.skipped, vec![1]);
        assert_eq!(doc.total_pages(), 4);
    }

    #[test]
    fn test_empty_document() {
        let raster = FlakyRaster { pages: 0, broken: vec![] };
        let doc = render_document(&raster, ImageFormat::Webp);
        assert!(doc.pages.is_empty());
        assert!(doc.skipped.is_empty());
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ImageFormat::Webp.content_type(), "image/webp");
        assert_eq!(ImageFormat::Png.extension(), "png");
    }
}
