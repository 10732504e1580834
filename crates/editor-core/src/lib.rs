//! Signature editor interaction core
//!
//! UI-toolkit-free state machine behind a draggable, styleable signature
//! mark, plus the viewport geometry needed to anchor marks to a page.

pub mod editor;
pub mod layout;

pub use editor::{DragCapture, EditorChrome, EditorEvent, SignatureEditor, CLICK_SLOP_PX};
pub use layout::{page_render_width, panel_anchor, reanchor, PanelAnchor, Point, Rect};
