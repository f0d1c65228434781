//! Post-processing of streamed model output before it reaches a page.

mod fence;
mod sanitize;

pub use fence::{strip_fences, strip_fences_streaming};
pub use sanitize::{IMAGE_PLACEHOLDER, render_constrained, render_translation, replace_images};
