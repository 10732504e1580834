//! Signing session controllers.
//!
//! [`DocumentSession`] drives an owner through load, placement, bulk save and
//! finalize. [`SharedLinkSession`] is the guest variant reached through a
//! share token. Both talk to the server only through the collaborator traits
//! of `api_client`, and both report outcomes as [`Notice`]s.

pub mod cancel;
pub mod document;
pub mod error;
pub mod finalize;
pub mod notice;
pub mod render;
pub mod save;
pub mod shared;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use cancel::CancellationToken;
pub use document::{DocumentSession, FinalArtifact, Phase, DEFAULT_FINALIZE_TIMEOUT};
pub use error::{FinalizeStep, SessionError};
pub use finalize::{preset_annotation, FinalizeMode, FinalizeOutcome, FinalizeRequest, FinalizeTarget};
pub use notice::{Notice, Severity};
pub use render::{PageRenderer, RenderedPage};
pub use save::{SaveOutcome, SaveReport};
pub use shared::{Redirect, SharedLinkSession, SharedOptions, SharedPhase, DEFAULT_REDIRECT_DELAY};
pub use workspace::{EditorEffect, SigningWorkspace};
