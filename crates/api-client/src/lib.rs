//! HTTP access to the signing server.
//!
//! Pure request/response shaping lives next to the blocking [`ApiClient`];
//! sessions depend only on the collaborator traits in [`service`].

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod service;

pub use auth::{AuthSession, Authenticator, Credential};
pub use client::ApiClient;
pub use config::{ApiConfig, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use service::{
    DocumentLocation, DocumentLookup, FinalizeAck, Finalizer, SharedDocument, SignatureRecordId,
    SignatureStore, SigningBackend, TokenResolver,
};
