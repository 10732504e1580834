//! Signature placement model.
//!
//! Annotation entity, typography values, the per-session annotation
//! collection, page navigation and the JSON records the signing server
//! accepts.

pub mod annotation;
pub mod collection;
pub mod error;
pub mod navigation;
pub mod payload;
pub mod style;

pub use annotation::{AnnotationId, AnnotationSnapshot, AnnotationUpdate, Position, SignatureAnnotation};
pub use collection::{AnnotationCollection, PageAnnotations};
pub use error::{CollectionError, ModelError};
pub use navigation::PageCursor;
pub use payload::{
    AuditEntry, DocumentId, DocumentSummary, ShareToken, SignatureDetails, SignaturePayload,
    SignatureStatus, SignerMetadata,
};
pub use style::{
    Color, FontFamily, FontSize, FontStyle, FontWeight, SignatureStyle, TextColor,
    DEFAULT_SIGNATURE_TEXT, RECIPIENT_SIGNATURE_TEXT,
};
