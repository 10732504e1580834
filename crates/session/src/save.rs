//! Bulk persistence of placed signatures with per-item bookkeeping.

use api_client::{ApiError, Credential, SignatureRecordId, SignatureStore};
use doc_model::{AnnotationId, SignaturePayload};

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub annotation: AnnotationId,
    pub page: u32,
    pub result: Result<Option<SignatureRecordId>, ApiError>,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        self.result.is_ok()
    }
}

/// Result of one bulk save, in collection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    outcomes: Vec<SaveOutcome>,
}

impl SaveReport {
    pub fn outcomes(&self) -> &[SaveOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn saved(&self) -> impl Iterator<Item = &SaveOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_saved())
    }

    pub fn failed(&self) -> impl Iterator<Item = &SaveOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_saved())
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(SaveOutcome::is_saved)
    }
}

/// Record every payload sequentially. A failed item never stops the batch.
pub(crate) fn record_all<'a, S>(
    store: &S,
    credential: Option<&Credential>,
    items: impl IntoIterator<Item = (AnnotationId, &'a SignaturePayload)>,
) -> SaveReport
where
    S: SignatureStore + ?Sized,
{
    let outcomes = items
        .into_iter()
        .map(|(annotation, payload)| {
            let result = store.record_signature(credential, payload);
            if let Err(error) = &result {
                tracing::warn!(%annotation, page = payload.page, error = %error, "signature not recorded");
            }
            SaveOutcome { annotation, page: payload.page, result }
        })
        .collect();

    SaveReport { outcomes }
}
