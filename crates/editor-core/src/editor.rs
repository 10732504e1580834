//! Interactive editing of a single signature mark.
//!
//! The editor keeps its own copy of the mark and reports every persisted
//! change to its owner as a complete snapshot. It never talks to the network
//! and never removes itself from a collection.

use crate::layout::Point;
use doc_model::{
    AnnotationSnapshot, Color, FontFamily, FontSize, FontStyle, FontWeight, ModelError, Position,
    TextColor,
};

/// Pointer travel below which a press/release pair counts as a click.
pub const CLICK_SLOP_PX: f64 = 3.0;

/// Notification for the owner of an editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Authoritative replacement of every persisted field.
    Updated(AnnotationSnapshot),
    /// Drag finished; the owner should re-anchor the mark against the page
    /// container using `pointer` (viewport coordinates).
    DragEnded { pointer: Point },
    /// The user asked for this mark to be deleted.
    Deleted,
}

/// Editor-only presentation state. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorChrome {
    pub highlight: Color,
    pub text_shadow: bool,
    pub panel_open: bool,
}

impl Default for EditorChrome {
    fn default() -> Self {
        Self { highlight: Color::HIGHLIGHT, text_shadow: false, panel_open: false }
    }
}

#[derive(Debug, Clone)]
pub struct SignatureEditor {
    snapshot: AnnotationSnapshot,
    chrome: EditorChrome,
    /// Raw font size text that failed validation, kept for display only
    pending_font_size: Option<String>,
    dragging: bool,
}

impl SignatureEditor {
    /// Missing initial values fall back to the default mark at (100, 100).
    pub fn new(initial: Option<AnnotationSnapshot>) -> Self {
        Self {
            snapshot: initial.unwrap_or_default(),
            chrome: EditorChrome::default(),
            pending_font_size: None,
            dragging: false,
        }
    }

    pub fn snapshot(&self) -> &AnnotationSnapshot {
        &self.snapshot
    }

    pub fn chrome(&self) -> &EditorChrome {
        &self.chrome
    }

    pub fn pending_font_size(&self) -> Option<&str> {
        self.pending_font_size.as_deref()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Adopt a snapshot decided by the owner (e.g. after re-anchoring).
    /// Does not emit an event.
    pub fn sync(&mut self, snapshot: AnnotationSnapshot) {
        self.snapshot = snapshot;
    }

    /// Acquire pointer capture for a drag.
    ///
    /// Capture lasts exactly as long as the returned guard: it is released by
    /// [`DragCapture::release`] or when the guard is dropped.
    pub fn begin_drag(&mut self, pointer: Point) -> DragCapture<'_> {
        let position = self.snapshot.position;
        self.dragging = true;
        tracing::trace!(x = pointer.x, y = pointer.y, "drag capture acquired");

        DragCapture {
            grab: Point::new(pointer.x - position.x, pointer.y - position.y),
            press: pointer,
            start: position,
            moved: false,
            dirty: false,
            editor: self,
        }
    }

    pub fn toggle_panel(&mut self) {
        self.chrome.panel_open = !self.chrome.panel_open;
    }

    pub fn close_panel(&mut self) {
        self.chrome.panel_open = false;
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> EditorEvent {
        self.snapshot.style.text = text.into();
        self.updated()
    }

    pub fn set_font_size(&mut self, size: FontSize) -> EditorEvent {
        self.pending_font_size = None;
        self.snapshot.style.font_size = size;
        self.updated()
    }

    /// Raw text from the font size field.
    ///
    /// Invalid input is parked in [`SignatureEditor::pending_font_size`] and
    /// reported as an error; the mark keeps its last valid size.
    pub fn set_font_size_input(&mut self, raw: &str) -> Result<EditorEvent, ModelError> {
        match FontSize::parse_input(raw) {
            Ok(size) => Ok(self.set_font_size(size)),
            Err(err) => {
                self.pending_font_size = Some(raw.to_owned());
                Err(err)
            }
        }
    }

    pub fn set_font_family(&mut self, family: impl Into<FontFamily>) -> EditorEvent {
        self.snapshot.style.font_family = family.into();
        self.updated()
    }

    pub fn set_font_weight(&mut self, weight: FontWeight) -> EditorEvent {
        self.snapshot.style.font_weight = weight;
        self.updated()
    }

    pub fn set_font_style(&mut self, style: FontStyle) -> EditorEvent {
        self.snapshot.style.font_style = style;
        self.updated()
    }

    pub fn set_underline(&mut self, underline: bool) -> EditorEvent {
        self.snapshot.style.underline = underline;
        self.updated()
    }

    pub fn set_color(&mut self, hex: &str) -> Result<EditorEvent, ModelError> {
        self.snapshot.style.color = TextColor::parse(hex)?;
        Ok(self.updated())
    }

    pub fn set_text_shadow(&mut self, enabled: bool) {
        self.chrome.text_shadow = enabled;
    }

    /// Background behind the mark; accepts `#rrggbb` or `#rrggbbaa`.
    pub fn set_highlight(&mut self, hex: &str) -> Result<(), ModelError> {
        self.chrome.highlight = Color::parse_hex(hex)?;
        Ok(())
    }

    pub fn delete(&self) -> EditorEvent {
        EditorEvent::Deleted
    }

    fn updated(&self) -> EditorEvent {
        EditorEvent::Updated(self.snapshot.clone())
    }
}

/// Exclusive pointer capture for one drag gesture.
///
/// Pointer moves are coalesced: only the newest position is kept and at most
/// one update is produced per [`DragCapture::flush`].
#[derive(Debug)]
pub struct DragCapture<'e> {
    editor: &'e mut SignatureEditor,
    /// Pointer offset from the mark origin at press time
    grab: Point,
    press: Point,
    start: Position,
    moved: bool,
    dirty: bool,
}

impl DragCapture<'_> {
    pub fn pointer_move(&mut self, pointer: Point) {
        if pointer.distance_to(&self.press) > CLICK_SLOP_PX {
            self.moved = true;
        }

        let next = Position::new(pointer.x - self.grab.x, pointer.y - self.grab.y);
        if next != self.editor.snapshot.position {
            self.editor.snapshot.position = next;
            self.dirty = true;
        }
    }

    /// Report the latest position if it changed since the last flush.
    pub fn flush(&mut self) -> Option<EditorEvent> {
        if !self.dirty {
            return None;
        }

        self.dirty = false;
        Some(self.editor.updated())
    }

    /// End the drag.
    ///
    /// A real drag yields the pending update followed by `DragEnded`. A press
    /// that never left the click slop restores the original position and
    /// toggles the style panel instead.
    pub fn release(mut self, pointer: Point) -> Vec<EditorEvent> {
        self.pointer_move(pointer);

        if !self.moved {
            self.editor.snapshot.position = self.start;
            self.editor.toggle_panel();
            return Vec::new();
        }

        let mut events = Vec::with_capacity(2);
        events.extend(self.flush());
        events.push(EditorEvent::DragEnded { pointer });
        events
    }
}

impl Drop for DragCapture<'_> {
    fn drop(&mut self) {
        self.editor.dragging = false;
        tracing::trace!("drag capture released");
    }
}
