//! Ordered set of signature marks for one signing session.

use crate::annotation::{AnnotationId, AnnotationSnapshot, AnnotationUpdate, SignatureAnnotation};
use crate::error::CollectionError;
use crate::payload::{DocumentId, SignaturePayload, SignerMetadata};

/// Collection of annotations for a document
///
/// Insertion order is preserved and drives both page rendering order and the
/// order in which marks are persisted.
#[derive(Debug, Clone, Default)]
pub struct AnnotationCollection {
    annotations: Vec<SignatureAnnotation>,
}

impl AnnotationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a default mark on `page` and return its fresh id.
    pub fn add(&mut self, page: u32) -> Result<AnnotationId, CollectionError> {
        self.add_with(page, AnnotationSnapshot::default())
    }

    pub fn add_with(
        &mut self,
        page: u32,
        snapshot: AnnotationSnapshot,
    ) -> Result<AnnotationId, CollectionError> {
        self.insert(SignatureAnnotation::new(AnnotationId::new(), page, snapshot))
    }

    /// Insert a fully built annotation. Never overwrites an existing id.
    pub fn insert(&mut self, annotation: SignatureAnnotation) -> Result<AnnotationId, CollectionError> {
        if annotation.page() == 0 {
            return Err(CollectionError::InvalidPage { page: 0 });
        }

        let id = annotation.id();
        if self.contains(id) {
            return Err(CollectionError::DuplicateId(id));
        }

        self.annotations.push(annotation);
        Ok(id)
    }

    /// Replace the position/style sub-record of `id` in a single assignment.
    ///
    /// The replacement is fully validated before anything is written, so a
    /// rejected update leaves the annotation untouched.
    pub fn update(
        &mut self,
        id: AnnotationId,
        update: impl Into<AnnotationUpdate>,
    ) -> Result<(), CollectionError> {
        let annotation = self
            .annotations
            .iter_mut()
            .find(|annotation| annotation.id() == id)
            .ok_or(CollectionError::NotFound(id))?;

        let next = update.into().apply_to(annotation.snapshot())?;
        annotation.replace_snapshot(next);
        Ok(())
    }

    /// Remove an annotation by ID. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: AnnotationId) -> Option<SignatureAnnotation> {
        let index = self.annotations.iter().position(|annotation| annotation.id() == id)?;
        Some(self.annotations.remove(index))
    }

    /// Marks anchored to `page`, in insertion order.
    ///
    /// The iterator is lazy and can be cloned to walk the page again.
    pub fn for_page(&self, page: u32) -> PageAnnotations<'_> {
        PageAnnotations { inner: self.annotations.iter(), page }
    }

    /// One `status: signed` record per mark, ready for `POST /signatures`.
    pub fn to_persistable_payloads(
        &self,
        document_id: &DocumentId,
        signer: Option<&SignerMetadata>,
    ) -> Vec<SignaturePayload> {
        self.annotations
            .iter()
            .map(|annotation| SignaturePayload::signed(document_id, annotation, signer))
            .collect()
    }

    /// Check every mark sits on an existing page.
    pub fn validate_pages(&self, total_pages: u32) -> Result<(), CollectionError> {
        match self.annotations.iter().find(|annotation| annotation.page() > total_pages) {
            Some(annotation) => Err(CollectionError::PageOutOfRange {
                id: annotation.id(),
                page: annotation.page(),
                total_pages,
            }),
            None => Ok(()),
        }
    }

    pub fn get(&self, id: AnnotationId) -> Option<&SignatureAnnotation> {
        self.annotations.iter().find(|annotation| annotation.id() == id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.get(id).is_some()
    }

    pub fn first(&self) -> Option<&SignatureAnnotation> {
        self.annotations.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignatureAnnotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
    }
}

/// Iterator returned by [`AnnotationCollection::for_page`].
#[derive(Debug, Clone)]
pub struct PageAnnotations<'a> {
    inner: std::slice::Iter<'a, SignatureAnnotation>,
    page: u32,
}

impl<'a> Iterator for PageAnnotations<'a> {
    type Item = &'a SignatureAnnotation;

    fn next(&mut self) -> Option<Self::Item> {
        let page = self.page;
        self.inner.find(|annotation| annotation.page() == page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Position;
    use crate::payload::SignatureStatus;
    use crate::style::{FontWeight, SignatureStyle, TextColor};

    fn ids_on(collection: &AnnotationCollection, page: u32) -> Vec<AnnotationId> {
        collection.for_page(page).map(SignatureAnnotation::id).collect()
    }

    #[test]
    fn add_is_visible_on_its_page_exactly_once() {
        let mut collection = AnnotationCollection::new();
        let id = collection.add(3).unwrap();

        assert_eq!(ids_on(&collection, 3), vec![id]);
        assert!(ids_on(&collection, 1).is_empty());
    }

    #[test]
    fn for_page_keeps_insertion_order_and_restarts() {
        let mut collection = AnnotationCollection::new();
        let a = collection.add(1).unwrap();
        let _other = collection.add(2).unwrap();
        let b = collection.add(1).unwrap();

        let page_one = collection.for_page(1);
        let first_pass: Vec<_> = page_one.clone().map(SignatureAnnotation::id).collect();
        let second_pass: Vec<_> = page_one.map(SignatureAnnotation::id).collect();

        assert_eq!(first_pass, vec![a, b]);
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn page_scenario_from_empty_collection() {
        let mut collection = AnnotationCollection::new();
        collection.add(1).unwrap();
        collection.add(1).unwrap();
        assert_eq!(collection.for_page(1).count(), 2);
        assert_eq!(collection.for_page(2).count(), 0);

        collection.add(2).unwrap();
        assert_eq!(collection.for_page(2).count(), 1);
        assert_eq!(collection.for_page(1).count(), 2);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut collection = AnnotationCollection::new();
        let id = collection.add(1).unwrap();
        let keep = collection.add(1).unwrap();

        assert!(collection.remove(id).is_some());
        assert!(collection.remove(id).is_none());
        assert_eq!(ids_on(&collection, 1), vec![keep]);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn position_update_leaves_style_untouched() {
        let mut collection = AnnotationCollection::new();
        let mut style = SignatureStyle::default();
        style.font_weight = FontWeight::Bold;
        style.color = TextColor::parse("#aa0000").unwrap();
        let id = collection.add_with(1, AnnotationSnapshot::new(Position::INITIAL, style.clone())).unwrap();

        collection.update(id, AnnotationUpdate::position(50.0, 75.0)).unwrap();

        let annotation = collection.get(id).unwrap();
        assert_eq!(annotation.position(), Position::new(50.0, 75.0));
        assert_eq!(annotation.style(), &style);
    }

    #[test]
    fn update_unknown_id_reports_not_found() {
        let mut collection = AnnotationCollection::new();
        let missing = AnnotationId::new();

        let err = collection.update(missing, AnnotationUpdate::text("x")).unwrap_err();
        assert_eq!(err, CollectionError::NotFound(missing));
    }

    #[test]
    fn rejected_update_keeps_previous_snapshot() {
        let mut collection = AnnotationCollection::new();
        let id = collection.add(1).unwrap();
        let before = collection.get(id).unwrap().clone();

        let update = AnnotationUpdate { x: Some(f64::INFINITY), text: Some("new".into()), ..Default::default() };
        assert!(collection.update(id, update).is_err());
        assert_eq!(collection.get(id).unwrap(), &before);
    }

    #[test]
    fn insert_refuses_duplicate_ids_and_page_zero() {
        let mut collection = AnnotationCollection::new();
        let id = collection.add(1).unwrap();
        let clone = collection.get(id).unwrap().clone();

        assert_eq!(collection.insert(clone), Err(CollectionError::DuplicateId(id)));
        assert_eq!(collection.add(0), Err(CollectionError::InvalidPage { page: 0 }));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn payloads_cover_every_annotation() {
        let mut collection = AnnotationCollection::new();
        collection.add(1).unwrap();
        collection.add(4).unwrap();

        let payloads = collection.to_persistable_payloads(&DocumentId::new("d"), None);

        assert_eq!(payloads.len(), 2);
        assert!(payloads.iter().all(|payload| payload.status == SignatureStatus::Signed));
        assert_eq!(payloads[1].page, 4);
        assert_eq!(payloads[0].font_size.get(), 16);
        assert_eq!(payloads[0].text, "Signature");
    }

    #[test]
    fn validate_pages_flags_marks_past_the_end() {
        let mut collection = AnnotationCollection::new();
        collection.add(1).unwrap();
        let late = collection.add(5).unwrap();

        assert!(collection.validate_pages(5).is_ok());
        assert_eq!(
            collection.validate_pages(3),
            Err(CollectionError::PageOutOfRange { id: late, page: 5, total_pages: 3 })
        );
    }
}
