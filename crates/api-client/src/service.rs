//! Collaborator contracts the signing sessions depend on.
//!
//! [`crate::ApiClient`] implements all of them over HTTP; tests substitute
//! in-memory fakes.

use crate::auth::Credential;
use crate::error::ApiError;
use doc_model::{DocumentId, ShareToken, SignatureDetails, SignaturePayload};

/// Where a document's source PDF can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLocation {
    pub url: String,
    pub page_count: Option<u32>,
}

/// Result of presenting a share token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedDocument {
    pub document_id: Option<DocumentId>,
    pub location: DocumentLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureRecordId(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeAck {
    pub message: Option<String>,
}

pub trait DocumentLookup {
    fn fetch_document(&self, credential: &Credential, id: &DocumentId) -> Result<DocumentLocation, ApiError>;
}

pub trait TokenResolver {
    fn resolve_token(&self, token: &ShareToken) -> Result<SharedDocument, ApiError>;
}

pub trait SignatureStore {
    /// Persist one placed signature. The server may omit the new record id.
    fn record_signature(
        &self,
        credential: Option<&Credential>,
        payload: &SignaturePayload,
    ) -> Result<Option<SignatureRecordId>, ApiError>;
}

pub trait Finalizer {
    /// Burn the document's recorded signatures into a final PDF.
    fn finalize_document(&self, credential: &Credential, id: &DocumentId) -> Result<Vec<u8>, ApiError>;

    /// Sign and finalize a shared document in one call.
    fn finalize_shared(&self, token: &ShareToken, details: &SignatureDetails) -> Result<FinalizeAck, ApiError>;
}

/// Everything a signing session needs from the server.
pub trait SigningBackend: DocumentLookup + TokenResolver + SignatureStore + Finalizer {}

impl<T> SigningBackend for T where T: DocumentLookup + TokenResolver + SignatureStore + Finalizer {}
