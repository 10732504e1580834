//! Guest signing through a shared-link token.
//!
//! Narrower than [`crate::DocumentSession`]: no save without finalize, one
//! successful finalize per session, and a token that fails to resolve is
//! never presented again.

use crate::cancel::CancellationToken;
use crate::error::SessionError;
use crate::finalize::{self, FinalizeMode, FinalizeRequest, FinalizeTarget};
use crate::notice::{Notice, NoticeQueue};
use crate::render::PageRenderer;
use crate::workspace::{EditorEffect, SigningWorkspace};
use api_client::{Finalizer, SignatureStore, TokenResolver};
use doc_model::{AnnotationId, AnnotationUpdate, DocumentId, ShareToken, SignatureAnnotation, SignerMetadata};
use editor_core::{EditorEvent, Rect};
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedPhase {
    Resolving,
    Ready,
    Finalized,
    /// The token was rejected. Terminal.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedOptions {
    pub mode: FinalizeMode,
    pub user_agent: String,
    /// Only set when the caller actually knows it; the server sees the peer.
    pub ip_address: Option<String>,
    pub redirect_delay: Duration,
}

impl Default for SharedOptions {
    fn default() -> Self {
        Self {
            mode: FinalizeMode::default(),
            user_agent: concat!("signdesk/", env!("CARGO_PKG_VERSION")).to_owned(),
            ip_address: None,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
        }
    }
}

/// Where the front end should go once a guest has signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: &'static str,
    pub after: Duration,
}

#[derive(Debug)]
pub struct SharedLinkSession<B> {
    backend: B,
    token: ShareToken,
    options: SharedOptions,
    phase: SharedPhase,
    document_id: Option<DocumentId>,
    workspace: Option<SigningWorkspace>,
    notices: NoticeQueue,
    /// Marks already posted by a failed finalize, skipped on retry.
    recorded: HashSet<AnnotationId>,
    finalized: bool,
}

impl<B> SharedLinkSession<B> {
    pub fn new(backend: B, token: ShareToken, options: SharedOptions) -> Self {
        Self {
            backend,
            token,
            options,
            phase: SharedPhase::Resolving,
            document_id: None,
            workspace: None,
            notices: NoticeQueue::default(),
            recorded: HashSet::new(),
            finalized: false,
        }
    }

    pub fn phase(&self) -> SharedPhase {
        self.phase
    }

    pub fn mode(&self) -> FinalizeMode {
        self.options.mode
    }

    pub fn document_id(&self) -> Option<&DocumentId> {
        self.document_id.as_ref()
    }

    pub fn workspace(&self) -> Option<&SigningWorkspace> {
        self.workspace.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.take()
    }

    /// Present the token. Called again after success it does nothing; after
    /// a rejection it fails without contacting the server.
    pub fn open(&mut self) -> Result<(), SessionError>
    where
        B: TokenResolver,
    {
        match self.phase {
            SharedPhase::Ready | SharedPhase::Finalized => return Ok(()),
            SharedPhase::Expired => return Err(SessionError::TokenExpired),
            SharedPhase::Resolving => {}
        }

        match self.backend.resolve_token(&self.token) {
            Ok(shared) => {
                self.document_id = shared.document_id;
                self.workspace = Some(SigningWorkspace::new(shared.location, self.options.mode.default_style()));
                self.phase = SharedPhase::Ready;
                tracing::info!(mode = %self.options.mode, "shared document opened");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error = %error, "share token rejected");
                self.phase = SharedPhase::Expired;
                self.notices.push(Notice::error("Invalid or expired link."));
                Err(SessionError::TokenExpired)
            }
        }
    }

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
        result
            .map_err(|message| {
                tracing::warn!(error = %message, "page render failed");
                self.notices.push(Notice::error(format!("Could not render page: {message}")));
            })
            .ok()
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

    pub fn visible_annotations(&self) -> impl Iterator<Item = &SignatureAnnotation> + Clone {
        self.workspace.iter().flat_map(SigningWorkspace::visible_annotations)
    }

    pub fn add_signature(&mut self) -> Result<AnnotationId, SessionError> {
        Ok(self.editable()?.add()?)
    }

    pub fn update_signature(
        &mut self,
        id: AnnotationId,
        update: impl Into<AnnotationUpdate>,
    ) -> Result<(), SessionError> {
        Ok(self.editable()?.update(id, update.into())?)
    }

    pub fn apply_editor_event(
        &mut self,
        id: AnnotationId,
        event: EditorEvent,
        container: Rect,
    ) -> Result<EditorEffect, SessionError> {
        Ok(self.editable()?.apply_editor_event(id, event, container)?)
    }

    pub fn remove_signature(&mut self, id: AnnotationId) -> Option<SignatureAnnotation> {
        self.workspace.as_mut()?.remove(id)
    }

    /// Sign and finalize in one step.
    ///
    /// Zero marks is rejected locally with a warning unless the mode supplies
    /// its own preset signature.
    pub fn finalize(&mut self) -> Result<Redirect, SessionError>
    where
        B: SignatureStore + Finalizer,
    {
        self.finalize_with(&CancellationToken::new())
    }

    /// [`finalize`](Self::finalize), stopping between requests once `cancel`
    /// fires. A cancelled finalize leaves the session open for another try.
    pub fn finalize_with(&mut self, cancel: &CancellationToken) -> Result<Redirect, SessionError>
    where
        B: SignatureStore + Finalizer,
    {
        if self.finalized {
            return self.fail(SessionError::AlreadyFinalized);
        }
        if self.phase == SharedPhase::Expired {
            return self.fail(SessionError::TokenExpired);
        }
        let Some(workspace) = self.workspace.as_ref() else {
            return self.fail(SessionError::NotReady("link not opened"));
        };

        if self.options.mode.requires_annotations() && workspace.annotations().is_empty() {
            return self.fail(SessionError::Validation("Please add a signature first.".into()));
        }
        if let Err(error) = workspace.validate_pages() {
            return self.fail(error.into());
        }

        let mut signer = SignerMetadata::guest(self.options.user_agent.clone());
        if let Some(ip_address) = &self.options.ip_address {
            signer = signer.with_ip_address(ip_address.clone());
        }
        let request = FinalizeRequest {
            target: FinalizeTarget::SharedToken { token: self.token.clone(), document_id: self.document_id.clone() },
            mode: self.options.mode,
            annotations: workspace.snapshot_annotations(),
            signer: Some(signer),
        };

        tracing::debug!(mode = %request.mode, count = request.annotations.len(), "finalizing shared document");
        if let Err(error) = finalize::execute(&self.backend, None, &request, cancel, &mut self.recorded) {
            return self.fail(error);
        }

        self.finalized = true;
        self.phase = SharedPhase::Finalized;
        tracing::info!(mode = %request.mode, "shared document signed");
        self.notices.push(Notice::success("Document signed and finalized!"));
        Ok(Redirect { to: "/", after: self.options.redirect_delay })
    }

    pub fn close(&mut self) {
        if let Some(workspace) = self.workspace.as_mut() {
            workspace.clear();
        }
        self.recorded.clear();
    }

    fn editable(&mut self) -> Result<&mut SigningWorkspace, SessionError> {
        match self.phase {
            SharedPhase::Expired => Err(SessionError::TokenExpired),
            SharedPhase::Finalized => Err(SessionError::AlreadyFinalized),
            SharedPhase::Resolving => Err(SessionError::NotReady("link not opened")),
            SharedPhase::Ready => self.workspace.as_mut().ok_or(SessionError::NotReady("link not opened")),
        }
    }

    fn fail<T>(&mut self, error: SessionError) -> Result<T, SessionError> {
        tracing::warn!(error = %error, "shared session action failed");
        self.notices.push(Notice::from_error(&error));
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FinalizeStep;
    use crate::notice::Severity;
    use crate::testing::{Call, FakeBackend};
    use api_client::ApiError;
    use doc_model::{FontFamily, FontWeight, Position};

    const TOKEN: &str = "tok-123";

    fn session(backend: &FakeBackend, mode: FinalizeMode) -> SharedLinkSession<FakeBackend> {
        let options = SharedOptions { mode, user_agent: "test-agent".into(), ..SharedOptions::default() };
        SharedLinkSession::new(backend.clone(), ShareToken::new(TOKEN), options)
    }

    fn opened(backend: &FakeBackend, mode: FinalizeMode) -> SharedLinkSession<FakeBackend> {
        let mut session = session(backend, mode);
        session.open().expect("token should resolve");
        session
    }

    #[test]
    fn zero_marks_warns_without_network() {
        let backend = FakeBackend::new();
        let mut session = opened(&backend, FinalizeMode::PerAnnotation);

        let err = session.finalize().unwrap_err();

        assert!(matches!(err, SessionError::Validation(_)));
        assert_eq!(backend.calls(), vec![Call::ResolveToken(TOKEN.into())]);
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Warning);
        assert!(!session.is_finalized());
    }

    #[test]
    fn expired_token_is_terminal() {
        let backend = FakeBackend::new().with_shared(Err(ApiError::Status { status: 410, message: "used".into() }));
        let mut session = session(&backend, FinalizeMode::PerAnnotation);

        assert_eq!(session.open(), Err(SessionError::TokenExpired));
        assert_eq!(session.phase(), SharedPhase::Expired);

        assert_eq!(session.open(), Err(SessionError::TokenExpired));
        assert!(session.add_signature().is_err());
        assert_eq!(session.finalize(), Err(SessionError::TokenExpired));

        assert_eq!(backend.calls(), vec![Call::ResolveToken(TOKEN.into())]);
        assert_eq!(session.take_notices()[0], Notice::error("Invalid or expired link."));
    }

    #[test]
    fn per_annotation_records_each_then_finalizes_first() {
        let backend = FakeBackend::new();
        let mut session = opened(&backend, FinalizeMode::PerAnnotation);
        session.set_page_count(2);
        let first = session.add_signature().unwrap();
        session.update_signature(first, AnnotationUpdate::position(40.0, 60.0)).unwrap();
        session.go_to_next_page();
        session.add_signature().unwrap();

        let redirect = session.finalize().unwrap();

        assert_eq!(redirect, Redirect { to: "/", after: Duration::from_secs(2) });
        let records = backend.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.document_id == DocumentId::new("doc-1")));
        let signer = records[0].signer.as_ref().expect("guest metadata");
        assert_eq!(signer.signed_by.as_deref(), Some("guest"));
        assert_eq!(signer.user_agent, "test-agent");
        assert_eq!(signer.ip_address, None);

        let Some(Call::FinalizeShared(token, details)) = backend.calls().pop() else {
            panic!("finalize should be the last call");
        };
        assert_eq!(token, TOKEN);
        assert_eq!((details.x, details.y, details.page), (40.0, 60.0, 1));
    }

    #[test]
    fn inline_mode_skips_individual_records() {
        let backend = FakeBackend::new();
        let mut session = opened(&backend, FinalizeMode::Inline);
        let id = session.add_signature().unwrap();

        let mark = session.visible_annotations().find(|a| a.id() == id).unwrap();
        assert_eq!(mark.style().font_family, FontFamily::Cursive);
        assert_eq!(mark.style().font_size.get(), 18);

        session.finalize().unwrap();

        assert!(backend.records().is_empty());
        assert_eq!(backend.calls().len(), 2);
    }

    #[test]
    fn preset_mode_signs_without_placement() {
        let backend = FakeBackend::new();
        let mut session = opened(&backend, FinalizeMode::Preset);

        session.finalize().unwrap();

        let Some(Call::FinalizeShared(_, details)) = backend.calls().pop() else {
            panic!("expected shared finalize");
        };
        assert_eq!(details.text, "Signed by Recipient");
        assert_eq!(details.font_size.get(), 16);
        assert_eq!(details.font_weight, FontWeight::Bold);
        assert_eq!((details.x, details.y, details.page), (100.0, 100.0, 1));
    }

    #[test]
    fn finalize_cannot_be_replayed() {
        let backend = FakeBackend::new();
        let mut session = opened(&backend, FinalizeMode::Inline);
        session.add_signature().unwrap();
        session.finalize().unwrap();
        let calls = backend.calls().len();

        assert_eq!(session.finalize(), Err(SessionError::AlreadyFinalized));
        assert!(session.add_signature().is_err());
        assert_eq!(backend.calls().len(), calls);
        assert_eq!(session.phase(), SharedPhase::Finalized);
    }

    #[test]
    fn failed_record_fails_the_whole_finalize() {
        let backend = FakeBackend::new().failing_record(2);
        let mut session = opened(&backend, FinalizeMode::PerAnnotation);
        for _ in 0..3 {
            session.add_signature().unwrap();
        }

        let err = session.finalize().unwrap_err();

        assert!(matches!(
            err,
            SessionError::Finalize { step: FinalizeStep::Record { index: 2, total: 3 }, .. }
        ));
        assert!(!backend.calls().iter().any(|call| matches!(call, Call::FinalizeShared(..))));
        assert!(!session.is_finalized());
        assert_eq!(session.phase(), SharedPhase::Ready);
        assert_eq!(session.take_notices()[0].severity, Severity::Error);
    }

    #[test]
    fn retry_after_failed_record_skips_marks_already_posted() {
        let backend = FakeBackend::new().failing_record(2);
        let mut session = opened(&backend, FinalizeMode::PerAnnotation);
        session.set_page_count(3);
        for page in 1..=3 {
            session.go_to_page(page);
            session.add_signature().unwrap();
        }

        let err = session.finalize().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Finalize { step: FinalizeStep::Record { index: 2, total: 3 }, .. }
        ));

        session.finalize().unwrap();

        let pages: Vec<u32> = backend.records().iter().map(|record| record.page).collect();
        assert_eq!(pages, vec![1, 2, 2, 3]);
        assert!(session.is_finalized());
    }

    #[test]
    fn cancelled_token_stops_before_any_request() {
        let backend = FakeBackend::new();
        let mut session = opened(&backend, FinalizeMode::PerAnnotation);
        session.add_signature().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = session.finalize_with(&cancel).unwrap_err();

        assert_eq!(err, SessionError::Cancelled);
        assert_eq!(backend.calls(), vec![Call::ResolveToken(TOKEN.into())]);
        assert!(!session.is_finalized());
        assert_eq!(session.phase(), SharedPhase::Ready);
    }

    #[test]
    fn finalize_cancelled_from_another_thread_stays_open() {
        let backend = FakeBackend::new().with_finalize_delay(Duration::from_millis(200));
        let mut session = opened(&backend, FinalizeMode::Inline);
        session.add_signature().unwrap();
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                cancel.cancel();
            })
        };
        let err = session.finalize_with(&cancel).unwrap_err();
        canceller.join().unwrap();

        assert_eq!(err, SessionError::Cancelled);
        assert!(!session.is_finalized());
        assert_eq!(session.phase(), SharedPhase::Ready);
        assert_eq!(session.take_notices()[0].severity, Severity::Info);

        session.finalize().unwrap();
        assert!(session.is_finalized());
    }

    #[test]
    fn missing_document_id_blocks_per_annotation_records() {
        let shared = api_client::SharedDocument { document_id: None, location: crate::testing::location() };
        let backend = FakeBackend::new().with_shared(Ok(shared));
        let mut session = opened(&backend, FinalizeMode::PerAnnotation);
        session.add_signature().unwrap();

        let err = session.finalize().unwrap_err();

        assert_eq!(err.api_error().map(|e| matches!(e, ApiError::InvalidResponse(_))), Some(true));
        assert!(backend.records().is_empty());
    }

    #[test]
    fn drag_on_guest_page_updates_position() {
        let backend = FakeBackend::new();
        let mut session = opened(&backend, FinalizeMode::PerAnnotation);
        let id = session.add_signature().unwrap();

        let pointer = editor_core::Point::new(50.0, 70.0);
        session
            .apply_editor_event(id, EditorEvent::DragEnded { pointer }, Rect::new(0.0, 20.0, 320.0, 480.0))
            .unwrap();

        assert_eq!(session.visible_annotations().next().unwrap().position(), Position::new(50.0, 50.0));
    }
}
