use doc_model::{AnnotationId, AnnotationUpdate, FontSize};
use session::{DocumentSession, SessionError, SharedLinkSession};
use std::fmt;
use std::str::FromStr;

/// One `--place PAGE:X:Y[:TEXT]` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub text: Option<String>,
}

impl Placement {
    pub fn update(&self, font_size: Option<FontSize>) -> AnnotationUpdate {
        AnnotationUpdate {
            x: Some(self.x),
            y: Some(self.y),
            text: self.text.clone(),
            font_size,
            ..AnnotationUpdate::default()
        }
    }
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.splitn(4, ':');
        let (Some(page), Some(x), Some(y)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("expected PAGE:X:Y[:TEXT], got '{value}'"));
        };

        let page: u32 = page
            .trim()
            .parse()
            .ok()
            .filter(|page| *page >= 1)
            .ok_or_else(|| format!("page must be a positive integer, got '{page}'"))?;
        let x = coordinate(x)?;
        let y = coordinate(y)?;
        let text = parts.next().filter(|text| !text.is_empty()).map(str::to_owned);

        Ok(Self { page, x, y, text })
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.page, self.x, self.y)?;
        if let Some(text) = &self.text {
            write!(f, ":{text}")?;
        }
        Ok(())
    }
}

fn coordinate(raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("coordinate must be a finite number, got '{raw}'"))
}

/// The slice of a signing session the CLI needs to drop marks onto pages.
pub(crate) trait PlacementTarget {
    fn page_count(&self) -> Option<u32>;
    fn set_page_count(&mut self, total: u32);
    fn go_to_page(&mut self, page: u32) -> u32;
    fn add_signature(&mut self) -> Result<AnnotationId, SessionError>;
    fn update_signature(&mut self, id: AnnotationId, update: AnnotationUpdate) -> Result<(), SessionError>;
}

impl<B> PlacementTarget for DocumentSession<B> {
    fn page_count(&self) -> Option<u32> {
        self.workspace().and_then(|workspace| workspace.page_count())
    }

    fn set_page_count(&mut self, total: u32) {
        DocumentSession::set_page_count(self, total);
    }

    fn go_to_page(&mut self, page: u32) -> u32 {
        DocumentSession::go_to_page(self, page)
    }

    fn add_signature(&mut self) -> Result<AnnotationId, SessionError> {
        DocumentSession::add_signature(self)
    }

    fn update_signature(&mut self, id: AnnotationId, update: AnnotationUpdate) -> Result<(), SessionError> {
        DocumentSession::update_signature(self, id, update)
    }
}

impl<B> PlacementTarget for SharedLinkSession<B> {
    fn page_count(&self) -> Option<u32> {
        self.workspace().and_then(|workspace| workspace.page_count())
    }

    fn set_page_count(&mut self, total: u32) {
        SharedLinkSession::set_page_count(self, total);
    }

    fn go_to_page(&mut self, page: u32) -> u32 {
        SharedLinkSession::go_to_page(self, page)
    }

    fn add_signature(&mut self) -> Result<AnnotationId, SessionError> {
        SharedLinkSession::add_signature(self)
    }

    fn update_signature(&mut self, id: AnnotationId, update: AnnotationUpdate) -> Result<(), SessionError> {
        SharedLinkSession::update_signature(self, id, update)
    }
}

/// Navigate to each placement's page and drop a mark there.
///
/// Without a server-reported page count, `pages` (or else the highest
/// placement page) becomes the document length.
pub(crate) fn place_all<S: PlacementTarget>(
    session: &mut S,
    placements: &[Placement],
    pages: Option<u32>,
    font_size: Option<FontSize>,
) -> Result<(), SessionError> {
    match (pages, session.page_count()) {
        (Some(total), _) => session.set_page_count(total),
        (None, None) => {
            if let Some(highest) = placements.iter().map(|placement| placement.page).max() {
                session.set_page_count(highest);
            }
        }
        (None, Some(_)) => {}
    }

    for placement in placements {
        if session.go_to_page(placement.page) != placement.page {
            return Err(SessionError::Validation(format!(
                "page {} is outside the document",
                placement.page
            )));
        }
        let id = session.add_signature()?;
        session.update_signature(id, placement.update(font_size))?;
    }
    Ok(())
}
