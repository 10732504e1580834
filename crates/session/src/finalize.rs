//! One finalize contract for owners and guests.
//!
//! A request carries zero or more placed annotations plus signer metadata.
//! However many HTTP calls a mode needs, the caller sees a single success or
//! a single failure naming the step that broke.

use crate::cancel::CancellationToken;
use crate::error::{FinalizeStep, SessionError};
use api_client::{ApiError, Credential, FinalizeAck, Finalizer, SignatureStore};
use doc_model::{
    AnnotationId, AnnotationSnapshot, DocumentId, Position, ShareToken, SignatureAnnotation,
    SignatureDetails, SignaturePayload, SignatureStyle, SignerMetadata,
};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeTarget {
    Document(DocumentId),
    SharedToken {
        token: ShareToken,
        /// Owning document, as reported by token resolution.
        document_id: Option<DocumentId>,
    },
}

/// How a guest finalize is shaped on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalizeMode {
    /// Post the first annotation inline as the finalize payload.
    Inline,
    /// Record every annotation, then finalize with the first as representative.
    #[default]
    PerAnnotation,
    /// Finalize with a fixed signature, no placement needed.
    Preset,
}

impl FinalizeMode {
    pub const ALL: [Self; 3] = [Self::Inline, Self::PerAnnotation, Self::Preset];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::PerAnnotation => "per-annotation",
            Self::Preset => "preset",
        }
    }

    /// Style given to marks placed during a guest session in this mode.
    pub fn default_style(self) -> SignatureStyle {
        match self {
            Self::Inline => SignatureStyle::recipient(),
            Self::PerAnnotation => SignatureStyle::default(),
            Self::Preset => SignatureStyle::minimal_recipient(),
        }
    }

    pub fn requires_annotations(self) -> bool {
        self != Self::Preset
    }
}

impl fmt::Display for FinalizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinalizeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown finalize mode '{value}'"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeRequest {
    pub target: FinalizeTarget,
    pub mode: FinalizeMode,
    pub annotations: Vec<SignatureAnnotation>,
    /// Required for shared-token targets.
    pub signer: Option<SignerMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Owner flow: the signed PDF.
    Artifact(Vec<u8>),
    /// Guest flow: the server only acknowledges.
    Acknowledged(FinalizeAck),
}

/// The fixed mark used by [`FinalizeMode::Preset`]: page 1 at (100, 100).
pub fn preset_annotation() -> SignatureAnnotation {
    SignatureAnnotation::new(
        AnnotationId::new(),
        1,
        AnnotationSnapshot::new(Position::INITIAL, SignatureStyle::minimal_recipient()),
    )
}

/// Run one finalize.
///
/// `recorded` holds the marks already persisted by an earlier attempt. They
/// are skipped, and every mark recorded now is added, so a retry after a
/// failed record step never posts the same mark twice.
pub(crate) fn execute<B>(
    backend: &B,
    credential: Option<&Credential>,
    request: &FinalizeRequest,
    cancel: &CancellationToken,
    recorded: &mut HashSet<AnnotationId>,
) -> Result<FinalizeOutcome, SessionError>
where
    B: SignatureStore + Finalizer + ?Sized,
{
    match &request.target {
        FinalizeTarget::Document(document_id) => {
            let credential =
                credential.ok_or_else(|| SessionError::finalize(FinalizeStep::Submit, ApiError::Unauthorized))?;
            checkpoint(cancel)?;
            let bytes = backend
                .finalize_document(credential, document_id)
                .map_err(|e| SessionError::finalize(FinalizeStep::Submit, e))?;
            checkpoint(cancel)?;
            Ok(FinalizeOutcome::Artifact(bytes))
        }
        FinalizeTarget::SharedToken { token, document_id } => {
            let preset;
            let representative = match (request.mode, request.annotations.first()) {
                (FinalizeMode::Preset, _) => {
                    preset = preset_annotation();
                    &preset
                }
                (_, Some(first)) => first,
                (_, None) => return Err(SessionError::Validation("Please add a signature first.".into())),
            };

            let signer = request
                .signer
                .as_ref()
                .ok_or_else(|| SessionError::Validation("Signer details are required.".into()))?;

            if request.mode == FinalizeMode::PerAnnotation {
                record_each(backend, credential, document_id.as_ref(), &request.annotations, signer, cancel, recorded)?;
            }

            checkpoint(cancel)?;
            let details = SignatureDetails::new(representative, signer);
            let ack = backend
                .finalize_shared(token, &details)
                .map_err(|e| SessionError::finalize(FinalizeStep::Submit, e))?;
            checkpoint(cancel)?;
            Ok(FinalizeOutcome::Acknowledged(ack))
        }
    }
}

fn record_each<B>(
    backend: &B,
    credential: Option<&Credential>,
    document_id: Option<&DocumentId>,
    annotations: &[SignatureAnnotation],
    signer: &SignerMetadata,
    cancel: &CancellationToken,
    recorded: &mut HashSet<AnnotationId>,
) -> Result<(), SessionError>
where
    B: SignatureStore + ?Sized,
{
    let total = annotations.len();
    for (offset, annotation) in annotations.iter().enumerate() {
        if recorded.contains(&annotation.id()) {
            continue;
        }
        let step = FinalizeStep::Record { index: offset + 1, total };
        checkpoint(cancel)?;

        let document_id = document_id.ok_or_else(|| {
            SessionError::finalize(step, ApiError::InvalidResponse("shared link did not name a document".into()))
        })?;
        let payload = SignaturePayload::signed(document_id, annotation, Some(signer));
        backend
            .record_signature(credential, &payload)
            .map_err(|e| SessionError::finalize(step, e))?;
        recorded.insert(annotation.id());
    }
    Ok(())
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), SessionError> {
    if cancel.is_cancelled() {
        Err(SessionError::Cancelled)
    } else {
        Ok(())
    }
}
