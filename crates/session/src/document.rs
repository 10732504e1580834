//! Authenticated signing session for a document the user owns.

use crate::cancel::CancellationToken;
use crate::error::{FinalizeStep, SessionError};
use crate::finalize::{self, FinalizeMode, FinalizeOutcome, FinalizeRequest, FinalizeTarget};
use crate::notice::{Notice, NoticeQueue};
use crate::render::PageRenderer;
use crate::save::{self, SaveReport};
use crate::workspace::{EditorEffect, SigningWorkspace};
use api_client::{ApiError, Credential, DocumentLookup, Finalizer, SignatureStore};
use doc_model::{AnnotationId, AnnotationUpdate, DocumentId, SignatureAnnotation, SignatureStyle};
use editor_core::{EditorEvent, Rect};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_FINALIZE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Editing,
    Saved,
    Finalized,
    /// Loading failed; `load` may be called again.
    Error(String),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Editing => "editing",
            Self::Saved => "saved",
            Self::Finalized => "finalized",
            Self::Error(_) => "error",
        }
    }
}

/// Signed PDF returned by the server, kept for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalArtifact {
    document_id: DocumentId,
    bytes: Vec<u8>,
}

impl FinalArtifact {
    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> String {
        format!("signed_{}.pdf", self.document_id)
    }

    /// Write the artifact into `dir` and return the file path.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

#[derive(Debug)]
struct InFlight {
    cancel: CancellationToken,
    result: mpsc::Receiver<Result<FinalizeOutcome, SessionError>>,
    worker: JoinHandle<()>,
}

impl InFlight {
    /// Stop waiting. The worker may still be inside a request.
    fn abandon(self) -> JoinHandle<()> {
        self.cancel.cancel();
        self.worker
    }
}

#[derive(Debug)]
pub struct DocumentSession<B> {
    backend: B,
    credential: Credential,
    document_id: DocumentId,
    phase: Phase,
    workspace: Option<SigningWorkspace>,
    notices: NoticeQueue,
    finalize_timeout: Duration,
    in_flight: Option<InFlight>,
    /// Cancelled or timed-out worker, possibly still on the wire.
    abandoned: Option<JoinHandle<()>>,
    artifact: Option<FinalArtifact>,
    last_save: Option<SaveReport>,
}

impl<B> DocumentSession<B> {
    pub fn new(backend: B, credential: Credential, document_id: DocumentId) -> Self {
        Self {
            backend,
            credential,
            document_id,
            phase: Phase::Loading,
            workspace: None,
            notices: NoticeQueue::default(),
            finalize_timeout: DEFAULT_FINALIZE_TIMEOUT,
            in_flight: None,
            abandoned: None,
            artifact: None,
            last_save: None,
        }
    }

    pub fn with_finalize_timeout(mut self, timeout: Duration) -> Self {
        self.finalize_timeout = timeout;
        self
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn workspace(&self) -> Option<&SigningWorkspace> {
        self.workspace.as_ref()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.take()
    }

    pub fn last_save_report(&self) -> Option<&SaveReport> {
        self.last_save.as_ref()
    }

    pub fn load(&mut self) -> Result<(), SessionError>
    where
        B: DocumentLookup,
    {
        if !matches!(self.phase, Phase::Loading | Phase::Error(_)) {
            return Ok(());
        }

        self.phase = Phase::Loading;
        tracing::debug!(document = %self.document_id, "loading document");
        match self.backend.fetch_document(&self.credential, &self.document_id) {
            Ok(location) => {
                self.workspace = Some(SigningWorkspace::new(location, SignatureStyle::default()));
                self.phase = Phase::Ready;
                tracing::info!(document = %self.document_id, "document loaded");
                Ok(())
            }
            Err(error) => {
                self.phase = Phase::Error(error.to_string());
                self.fail("load", SessionError::Load(error))
            }
        }
    }

    /// Page count as reported by the PDF renderer.
    pub fn set_page_count(&mut self, total: u32) {
        if let Some(workspace) = self.workspace.as_mut() {
            workspace.set_page_count(total);
        }
    }

    pub fn render_current_page<R: PageRenderer>(
        &mut self,
        renderer: &mut R,
        viewport_width: f64,
    ) -> Option<R::Surface> {
        let result = self.workspace.as_mut()?.render(renderer, viewport_width);
        match result {
            Ok(surface) => Some(surface),
            Err(message) => {
                tracing::warn!(error = %message, "page render failed");
                self.notices.push(Notice::error(format!("Could not render page: {message}")));
                None
            }
        }
    }

    pub fn go_to_prev_page(&mut self) -> u32 {
        self.workspace.as_mut().map_or(1, SigningWorkspace::previous_page)
    }

    pub fn go_to_next_page(&mut self) -> u32 {
        self.workspace.as_mut().map_or(1, SigningWorkspace::next_page)
    }

    pub fn go_to_page(&mut self, page: u32) -> u32 {
        self.workspace.as_mut().map_or(1, |workspace| workspace.go_to_page(page))
    }

    /// Marks on the current page, in placement order.
    pub fn visible_annotations(&self) -> impl Iterator<Item = &SignatureAnnotation> + Clone {
        self.workspace.iter().flat_map(SigningWorkspace::visible_annotations)
    }

    pub fn add_signature(&mut self) -> Result<AnnotationId, SessionError> {
        let id = self.loaded_mut()?.add()?;
        self.touch();
        Ok(id)
    }

    pub fn update_signature(
        &mut self,
        id: AnnotationId,
        update: impl Into<AnnotationUpdate>,
    ) -> Result<(), SessionError> {
        self.loaded_mut()?.update(id, update.into())?;
        self.touch();
        Ok(())
    }

    pub fn apply_editor_event(
        &mut self,
        id: AnnotationId,
        event: EditorEvent,
        container: Rect,
    ) -> Result<EditorEffect, SessionError> {
        let effect = self.loaded_mut()?.apply_editor_event(id, event, container)?;
        self.touch();
        Ok(effect)
    }

    pub fn remove_signature(&mut self, id: AnnotationId) -> Option<SignatureAnnotation> {
        let removed = self.workspace.as_mut()?.remove(id);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Persist every mark as its own signature record.
    ///
    /// All marks are attempted. The session only becomes `Saved` when every
    /// record succeeded; otherwise the report names the failures.
    pub fn save_signatures(&mut self) -> Result<SaveReport, SessionError>
    where
        B: SignatureStore,
    {
        let workspace = match self.loaded() {
            Ok(workspace) => workspace,
            Err(error) => return self.fail("save", error),
        };
        if workspace.annotations().is_empty() {
            return self.fail("save", SessionError::Validation("Add a signature before saving.".into()));
        }
        if let Err(error) = workspace.validate_pages() {
            return self.fail("save", error.into());
        }

        let payloads = workspace.annotations().to_persistable_payloads(&self.document_id, None);
        let ids: Vec<AnnotationId> = workspace.annotations().iter().map(SignatureAnnotation::id).collect();
        let report = save::record_all(&self.backend, Some(&self.credential), ids.into_iter().zip(&payloads));
        self.last_save = Some(report.clone());

        if report.is_complete() {
            self.phase = Phase::Saved;
            tracing::info!(document = %self.document_id, count = report.len(), "signatures saved");
            self.notices.push(Notice::success("Signatures saved."));
            Ok(report)
        } else {
            let failures: Vec<String> = report
                .failed()
                .map(|outcome| format!("{} on page {}", outcome.annotation, outcome.page))
                .collect();
            let error = SessionError::PartialSave { report };
            tracing::warn!(error = %error, "bulk save incomplete");
            self.notices
                .push(Notice::error(format!("{error}: {}", failures.join(", "))));
            Err(error)
        }
    }

    pub fn is_finalizing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start finalizing on a worker thread.
    ///
    /// At most one request is in flight per session, counting one that was
    /// cancelled but has not returned yet. The result is picked up by
    /// [`poll_finalize`](Self::poll_finalize) or
    /// [`wait_finalize`](Self::wait_finalize).
    pub fn begin_finalize(&mut self) -> Result<(), SessionError>
    where
        B: SignatureStore + Finalizer + Clone + Send + 'static,
    {
        if self.in_flight.is_some() || self.draining() {
            return self.fail("finalize", SessionError::FinalizeInFlight);
        }
        let workspace = match self.loaded() {
            Ok(workspace) => workspace,
            Err(error) => return self.fail("finalize", error),
        };
        if let Err(error) = workspace.validate_pages() {
            return self.fail("finalize", error.into());
        }

        // The server burns in the records already saved for the document.
        let request = FinalizeRequest {
            target: FinalizeTarget::Document(self.document_id.clone()),
            mode: FinalizeMode::Inline,
            annotations: Vec::new(),
            signer: None,
        };
        let cancel = CancellationToken::new();
        let (sender, receiver) = mpsc::channel();
        let backend = self.backend.clone();
        let credential = self.credential.clone();
        let worker_cancel = cancel.clone();

        let spawned = thread::Builder::new()
            .name("signdesk-finalize".to_owned())
            .spawn(move || {
                let result =
                    finalize::execute(&backend, Some(&credential), &request, &worker_cancel, &mut HashSet::new());
                if sender.send(result).is_err() {
                    tracing::debug!("finalize finished after the session stopped waiting");
                }
            });
        let worker = match spawned {
            Ok(worker) => worker,
            Err(error) => return self.fail("finalize", SessionError::Worker(error.to_string())),
        };

        tracing::debug!(document = %self.document_id, "finalize started");
        self.in_flight = Some(InFlight { cancel, result: receiver, worker });
        Ok(())
    }

    /// Non-blocking check for a finished finalize.
    pub fn poll_finalize(&mut self) -> Option<Result<(), SessionError>> {
        let received = self.in_flight.as_ref()?.result.try_recv();
        match received {
            Ok(result) => {
                self.in_flight = None;
                Some(self.complete_finalize(result))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.in_flight = None;
                Some(self.fail("finalize", SessionError::Worker("finalize worker stopped".into())))
            }
        }
    }

    /// Block until the in-flight finalize finishes or `timeout` elapses.
    ///
    /// On timeout the request is cancelled and its eventual result discarded.
    pub fn wait_finalize(&mut self, timeout: Duration) -> Result<(), SessionError> {
        let Some(in_flight) = self.in_flight.take() else {
            return Err(SessionError::NotReady("no finalize in progress"));
        };

        match in_flight.result.recv_timeout(timeout) {
            Ok(result) => self.complete_finalize(result),
            Err(RecvTimeoutError::Timeout) => {
                self.abandoned = Some(in_flight.abandon());
                self.fail("finalize", SessionError::finalize(FinalizeStep::Submit, ApiError::TimedOut))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.fail("finalize", SessionError::Worker("finalize worker stopped".into()))
            }
        }
    }

    /// Start and wait for a finalize, bounded by the session's timeout.
    pub fn finalize(&mut self) -> Result<(), SessionError>
    where
        B: SignatureStore + Finalizer + Clone + Send + 'static,
    {
        self.begin_finalize()?;
        self.wait_finalize(self.finalize_timeout)
    }

    /// Abandon the in-flight finalize. The phase is left as it was.
    pub fn cancel_finalize(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };

        self.abandoned = Some(in_flight.abandon());
        tracing::info!(document = %self.document_id, "finalize cancelled");
        self.notices.push(Notice::info("Finalize cancelled."));
        true
    }

    /// The cached signed PDF. Never contacts the server.
    pub fn download(&self) -> Option<&FinalArtifact> {
        self.artifact.as_ref()
    }

    /// Tear the session down: abandon finalize and drop every mark.
    pub fn close(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            self.abandoned = Some(in_flight.abandon());
        }
        if let Some(workspace) = self.workspace.as_mut() {
            workspace.clear();
        }
        tracing::debug!(document = %self.document_id, "session closed");
    }

    fn complete_finalize(&mut self, result: Result<FinalizeOutcome, SessionError>) -> Result<(), SessionError> {
        match result {
            Ok(FinalizeOutcome::Artifact(bytes)) => {
                tracing::info!(document = %self.document_id, bytes = bytes.len(), "document finalized");
                self.artifact = Some(FinalArtifact { document_id: self.document_id.clone(), bytes });
                self.phase = Phase::Finalized;
                self.notices.push(Notice::success("PDF finalized and ready to download."));
                Ok(())
            }
            Ok(FinalizeOutcome::Acknowledged(_)) => self.fail(
                "finalize",
                SessionError::finalize(
                    FinalizeStep::Submit,
                    ApiError::InvalidResponse("expected a PDF document".into()),
                ),
            ),
            Err(error) => self.fail("finalize", error),
        }
    }

    /// Whether an abandoned worker is still running. Forgets it once done.
    fn draining(&mut self) -> bool {
        if self.abandoned.as_ref().is_some_and(|worker| !worker.is_finished()) {
            return true;
        }
        self.abandoned = None;
        false
    }

    fn loaded(&self) -> Result<&SigningWorkspace, SessionError> {
        self.workspace.as_ref().ok_or(SessionError::NotReady(self.phase.name()))
    }

    fn loaded_mut(&mut self) -> Result<&mut SigningWorkspace, SessionError> {
        let phase = self.phase.name();
        self.workspace.as_mut().ok_or(SessionError::NotReady(phase))
    }

    /// Any edit invalidates `Saved`/`Finalized`; the cached artifact stays.
    fn touch(&mut self) {
        if let Some(workspace) = self.workspace.as_ref() {
            self.phase = if workspace.annotations().is_empty() { Phase::Ready } else { Phase::Editing };
        }
    }

    fn fail<T>(&mut self, action: &'static str, error: SessionError) -> Result<T, SessionError> {
        tracing::warn!(action, document = %self.document_id, error = %error, "session action failed");
        self.notices.push(Notice::from_error(&error));
        Err(error)
    }
}

impl<B> Drop for DocumentSession<B> {
    fn drop(&mut self) {
        if let Some(in_flight) = &self.in_flight {
            in_flight.cancel.cancel();
        }
    }
}
