//! Page cursor and annotations shared by both session kinds.

use crate::render::PageRenderer;
use api_client::DocumentLocation;
use doc_model::{
    AnnotationCollection, AnnotationId, AnnotationSnapshot, AnnotationUpdate, CollectionError,
    PageAnnotations, PageCursor, Position, SignatureAnnotation, SignatureStyle,
};
use editor_core::{page_render_width, reanchor, EditorEvent, Rect};

/// What a front end has to do after an editor event was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEffect {
    /// Nothing beyond redrawing.
    None,
    /// The owner changed the mark; push this snapshot back into the editor.
    Resync(AnnotationSnapshot),
    /// The mark is gone; drop its editor.
    Removed,
}

#[derive(Debug)]
pub struct SigningWorkspace {
    location: DocumentLocation,
    cursor: PageCursor,
    annotations: AnnotationCollection,
    default_style: SignatureStyle,
}

impl SigningWorkspace {
    pub(crate) fn new(location: DocumentLocation, default_style: SignatureStyle) -> Self {
        let mut cursor = PageCursor::new();
        if let Some(total) = location.page_count {
            cursor.set_total(total);
        }

        Self { location, cursor, annotations: AnnotationCollection::new(), default_style }
    }

    pub fn location(&self) -> &DocumentLocation {
        &self.location
    }

    pub fn current_page(&self) -> u32 {
        self.cursor.current()
    }

    pub fn page_count(&self) -> Option<u32> {
        self.cursor.total()
    }

    pub fn annotations(&self) -> &AnnotationCollection {
        &self.annotations
    }

    /// Marks on the page currently shown.
    pub fn visible_annotations(&self) -> PageAnnotations<'_> {
        self.annotations.for_page(self.cursor.current())
    }

    pub(crate) fn set_page_count(&mut self, total: u32) {
        self.cursor.set_total(total);
    }

    pub(crate) fn previous_page(&mut self) -> u32 {
        self.cursor.previous()
    }

    pub(crate) fn next_page(&mut self) -> u32 {
        self.cursor.next()
    }

    pub(crate) fn go_to_page(&mut self, page: u32) -> u32 {
        self.cursor.go_to(page)
    }

    pub(crate) fn add(&mut self) -> Result<AnnotationId, CollectionError> {
        let snapshot = AnnotationSnapshot::new(Position::INITIAL, self.default_style.clone());
        self.annotations.add_with(self.cursor.current(), snapshot)
    }

    pub(crate) fn update(&mut self, id: AnnotationId, update: AnnotationUpdate) -> Result<(), CollectionError> {
        self.annotations.update(id, update)
    }

    pub(crate) fn remove(&mut self, id: AnnotationId) -> Option<SignatureAnnotation> {
        self.annotations.remove(id)
    }

    /// Fold an editor notification into the collection.
    ///
    /// `container` is the page surface's current bounding box in viewport
    /// coordinates; drag ends are re-anchored against it.
    pub(crate) fn apply_editor_event(
        &mut self,
        id: AnnotationId,
        event: EditorEvent,
        container: Rect,
    ) -> Result<EditorEffect, CollectionError> {
        match event {
            EditorEvent::Updated(snapshot) => {
                self.annotations.update(id, snapshot)?;
                Ok(EditorEffect::None)
            }
            EditorEvent::DragEnded { pointer } => {
                self.annotations.update(id, reanchor(pointer, container))?;
                let snapshot = self
                    .annotations
                    .get(id)
                    .map(|annotation| annotation.snapshot().clone())
                    .ok_or(CollectionError::NotFound(id))?;
                Ok(EditorEffect::Resync(snapshot))
            }
            EditorEvent::Deleted => {
                self.annotations.remove(id);
                Ok(EditorEffect::Removed)
            }
        }
    }

    /// Render the current page at the width the viewport calls for.
    ///
    /// The first render also fixes the page count used for navigation.
    pub(crate) fn render<R: PageRenderer>(
        &mut self,
        renderer: &mut R,
        viewport_width: f64,
    ) -> Result<R::Surface, String> {
        let width = page_render_width(viewport_width);
        let page = self.cursor.current();
        let rendered = renderer
            .render_page(&self.location.url, page, width)
            .map_err(|e| e.to_string())?;

        if self.cursor.total() != Some(rendered.page_count) {
            tracing::debug!(page_count = rendered.page_count, "page count reported");
            self.cursor.set_total(rendered.page_count);
        }
        Ok(rendered.surface)
    }

    /// Every mark must sit on an existing page once the count is known.
    pub(crate) fn validate_pages(&self) -> Result<(), CollectionError> {
        match self.cursor.total() {
            Some(total) => self.annotations.validate_pages(total),
            None => Ok(()),
        }
    }

    pub(crate) fn snapshot_annotations(&self) -> Vec<SignatureAnnotation> {
        self.annotations.iter().cloned().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.annotations.clear();
    }
}
