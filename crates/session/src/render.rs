//! Contract for the external PDF rasterizer.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage<S> {
    pub surface: S,
    /// Total pages in the source document.
    pub page_count: u32,
}

/// Renders page `page` (1-based) of `source` at `width` pixels.
pub trait PageRenderer {
    type Surface;
    type Error: fmt::Display;

    fn render_page(
        &mut self,
        source: &str,
        page: u32,
        width: u32,
    ) -> Result<RenderedPage<Self::Surface>, Self::Error>;
}
