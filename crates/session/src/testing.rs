//! In-memory stand-in for the signing server.

use api_client::{
    ApiError, Credential, DocumentLocation, DocumentLookup, FinalizeAck, Finalizer, SharedDocument,
    SignatureRecordId, SignatureStore, TokenResolver,
};
use doc_model::{DocumentId, ShareToken, SignatureDetails, SignaturePayload};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    FetchDocument(DocumentId),
    ResolveToken(String),
    Record(SignaturePayload),
    FinalizeDocument(DocumentId),
    FinalizeShared(String, SignatureDetails),
}

#[derive(Debug)]
struct State {
    calls: Vec<Call>,
    document: Result<DocumentLocation, ApiError>,
    shared: Result<SharedDocument, ApiError>,
    /// 1-based indexes of record calls that fail
    failing_records: HashSet<usize>,
    records_seen: usize,
    finalize: Result<Vec<u8>, ApiError>,
    finalize_delay: Duration,
    finalizing: usize,
    peak_finalizing: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeBackend {
    state: Arc<Mutex<State>>,
}

pub(crate) fn location() -> DocumentLocation {
    DocumentLocation { url: "http://server.test/uploads/contract.pdf".into(), page_count: None }
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                calls: Vec::new(),
                document: Ok(location()),
                shared: Ok(SharedDocument { document_id: Some(DocumentId::new("doc-1")), location: location() }),
                failing_records: HashSet::new(),
                records_seen: 0,
                finalize: Ok(b"%PDF-1.7 signed".to_vec()),
                finalize_delay: Duration::ZERO,
                finalizing: 0,
                peak_finalizing: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn with_document(self, document: Result<DocumentLocation, ApiError>) -> Self {
        self.state().document = document;
        self
    }

    pub(crate) fn with_shared(self, shared: Result<SharedDocument, ApiError>) -> Self {
        self.state().shared = shared;
        self
    }

    pub(crate) fn failing_record(self, index: usize) -> Self {
        self.state().failing_records.insert(index);
        self
    }

    pub(crate) fn with_finalize(self, finalize: Result<Vec<u8>, ApiError>) -> Self {
        self.state().finalize = finalize;
        self
    }

    pub(crate) fn with_finalize_delay(self, delay: Duration) -> Self {
        self.state().finalize_delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub(crate) fn records(&self) -> Vec<SignaturePayload> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Record(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    /// Most finalize calls ever running at the same time.
    pub(crate) fn peak_finalizing(&self) -> usize {
        self.state().peak_finalizing
    }

    fn slow_finalize(&self) -> Result<Vec<u8>, ApiError> {
        let (delay, result) = {
            let mut state = self.state();
            state.finalizing += 1;
            state.peak_finalizing = state.peak_finalizing.max(state.finalizing);
            (state.finalize_delay, state.finalize.clone())
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.state().finalizing -= 1;
        result
    }
}

impl DocumentLookup for FakeBackend {
    fn fetch_document(&self, _credential: &Credential, id: &DocumentId) -> Result<DocumentLocation, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::FetchDocument(id.clone()));
        state.document.clone()
    }
}

impl TokenResolver for FakeBackend {
    fn resolve_token(&self, token: &ShareToken) -> Result<SharedDocument, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::ResolveToken(token.as_str().to_owned()));
        state.shared.clone()
    }
}

impl SignatureStore for FakeBackend {
    fn record_signature(
        &self,
        _credential: Option<&Credential>,
        payload: &SignaturePayload,
    ) -> Result<Option<SignatureRecordId>, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::Record(payload.clone()));
        state.records_seen += 1;
        let index = state.records_seen;

        if state.failing_records.contains(&index) {
            Err(ApiError::Status { status: 500, message: format!("record {index} rejected") })
        } else {
            Ok(Some(SignatureRecordId(format!("sig-{index}"))))
        }
    }
}

impl Finalizer for FakeBackend {
    fn finalize_document(&self, _credential: &Credential, id: &DocumentId) -> Result<Vec<u8>, ApiError> {
        self.state().calls.push(Call::FinalizeDocument(id.clone()));
        self.slow_finalize()
    }

    fn finalize_shared(&self, token: &ShareToken, details: &SignatureDetails) -> Result<FinalizeAck, ApiError> {
        self.state()
            .calls
            .push(Call::FinalizeShared(token.as_str().to_owned(), details.clone()));
        self.slow_finalize()
            .map(|_| FinalizeAck { message: Some("Document signed".into()) })
    }
}
