//! Viewport geometry for the page surface and the style panel.

use doc_model::Position;

/// Viewports narrower than this get the compact layout.
pub const NARROW_VIEWPORT_PX: f64 = 768.0;
pub const NARROW_PAGE_WIDTH_PX: u32 = 320;
pub const WIDE_PAGE_WIDTH_PX: u32 = 600;
/// Vertical gap between a mark and its style panel.
pub const PANEL_OFFSET_PX: f64 = 60.0;

/// Point in viewport (client) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Bounding box of an element in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right() && point.y >= self.top && point.y <= self.bottom()
    }
}

/// Convert a viewport pointer into page-container coordinates.
///
/// The container box is re-read on every drag completion because the page
/// is re-laid out whenever the viewport width changes. Results are clamped
/// into the container so a mark can never be dropped off the page.
pub fn reanchor(pointer: Point, container: Rect) -> Position {
    let x = (pointer.x - container.left).clamp(0.0, container.width.max(0.0));
    let y = (pointer.y - container.top).clamp(0.0, container.height.max(0.0));
    Position::new(x, y)
}

/// Width a page is rendered at for the given viewport width.
pub fn page_render_width(viewport_width: f64) -> u32 {
    if viewport_width < NARROW_VIEWPORT_PX {
        NARROW_PAGE_WIDTH_PX
    } else {
        WIDE_PAGE_WIDTH_PX
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelAnchor {
    /// Fixed overlay, expressed as viewport percentages.
    Overlay { top_percent: f32, left_percent: f32 },
    /// Absolutely positioned below the mark, in page coordinates.
    BelowMark { x: f64, y: f64 },
}

pub fn panel_anchor(viewport_width: f64, mark: Position) -> PanelAnchor {
    if viewport_width < NARROW_VIEWPORT_PX {
        PanelAnchor::Overlay { top_percent: 20.0, left_percent: 5.0 }
    } else {
        PanelAnchor::BelowMark { x: mark.x, y: mark.y + PANEL_OFFSET_PX }
    }
}
