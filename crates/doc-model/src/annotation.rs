//! Signature annotation entity.
//!
//! Coordinates are CSS pixels relative to the top-left corner of the rendered
//! page surface, the same space the signing server burns marks into.

use crate::error::ModelError;
use crate::style::{FontFamily, FontSize, FontStyle, FontWeight, SignatureStyle, TextColor};
use std::fmt;
use uuid::Uuid;

/// Session-local identifier of a placed mark.
///
/// Not sent to the server; records get their own ids once persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnnotationId(Uuid);

impl AnnotationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AnnotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Where new marks are dropped.
    pub const INITIAL: Position = Position { x: 100.0, y: 100.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn validated(self) -> Result<Self, ModelError> {
        if self.x.is_finite() && self.y.is_finite() {
            Ok(self)
        } else {
            Err(ModelError::InvalidPosition { x: self.x, y: self.y })
        }
    }
}

/// The complete mutable sub-record of an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSnapshot {
    pub position: Position,
    pub style: SignatureStyle,
}

impl AnnotationSnapshot {
    pub fn new(position: Position, style: SignatureStyle) -> Self {
        Self { position, style }
    }
}

impl Default for AnnotationSnapshot {
    fn default() -> Self {
        Self { position: Position::INITIAL, style: SignatureStyle::default() }
    }
}

/// Field-wise replacement for an annotation. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub text: Option<String>,
    pub font_size: Option<FontSize>,
    pub font_weight: Option<FontWeight>,
    pub font_style: Option<FontStyle>,
    pub underline: Option<bool>,
    pub font_family: Option<FontFamily>,
    pub color: Option<TextColor>,
}

impl AnnotationUpdate {
    pub fn position(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Self::default() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Build the replacement snapshot without touching `current`.
    pub(crate) fn apply_to(self, current: &AnnotationSnapshot) -> Result<AnnotationSnapshot, ModelError> {
        let position = Position {
            x: self.x.unwrap_or(current.position.x),
            y: self.y.unwrap_or(current.position.y),
        }
        .validated()?;

        let base = &current.style;
        let style = SignatureStyle {
            text: self.text.unwrap_or_else(|| base.text.clone()),
            font_size: self.font_size.unwrap_or(base.font_size),
            font_weight: self.font_weight.unwrap_or(base.font_weight),
            font_style: self.font_style.unwrap_or(base.font_style),
            underline: self.underline.unwrap_or(base.underline),
            font_family: self.font_family.unwrap_or_else(|| base.font_family.clone()),
            color: self.color.unwrap_or(base.color),
        };

        Ok(AnnotationSnapshot { position, style })
    }
}

impl From<AnnotationSnapshot> for AnnotationUpdate {
    fn from(snapshot: AnnotationSnapshot) -> Self {
        let AnnotationSnapshot { position, style } = snapshot;
        Self {
            x: Some(position.x),
            y: Some(position.y),
            text: Some(style.text),
            font_size: Some(style.font_size),
            font_weight: Some(style.font_weight),
            font_style: Some(style.font_style),
            underline: Some(style.underline),
            font_family: Some(style.font_family),
            color: Some(style.color),
        }
    }
}

impl From<Position> for AnnotationUpdate {
    fn from(position: Position) -> Self {
        Self::position(position.x, position.y)
    }
}

/// One placed signature mark.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureAnnotation {
    id: AnnotationId,
    /// 1-based page the mark is anchored to
    page: u32,
    snapshot: AnnotationSnapshot,
}

impl SignatureAnnotation {
    pub fn new(id: AnnotationId, page: u32, snapshot: AnnotationSnapshot) -> Self {
        Self { id, page, snapshot }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn position(&self) -> Position {
        self.snapshot.position
    }

    pub fn style(&self) -> &SignatureStyle {
        &self.snapshot.style
    }

    pub fn snapshot(&self) -> &AnnotationSnapshot {
        &self.snapshot
    }

    pub(crate) fn replace_snapshot(&mut self, snapshot: AnnotationSnapshot) {
        self.snapshot = snapshot;
    }
}
