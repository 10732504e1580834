use crate::annotation::AnnotationId;

/// Rejected value for one of the annotation fields.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("font size must be a positive number, got '{0}'")]
    InvalidFontSize(String),
    #[error("invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),
    #[error("position must be finite, got ({x}, {y})")]
    InvalidPosition { x: f64, y: f64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollectionError {
    #[error("annotation {0} not found")]
    NotFound(AnnotationId),
    #[error("annotation id {0} already present")]
    DuplicateId(AnnotationId),
    #[error("pages are 1-based, got {page}")]
    InvalidPage { page: u32 },
    #[error("annotation {id} is on page {page} but the document has {total_pages} pages")]
    PageOutOfRange { id: AnnotationId, page: u32, total_pages: u32 },
    #[error(transparent)]
    Model(#[from] ModelError),
}
