use crate::auth::{Authenticator, Credential};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::service::{
    DocumentLocation, DocumentLookup, FinalizeAck, Finalizer, SharedDocument, SignatureRecordId,
    SignatureStore, TokenResolver,
};
use doc_model::{
    AuditEntry, DocumentId, DocumentSummary, ShareToken, SignatureDetails, SignaturePayload,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

/// Blocking HTTP client for the signing server.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    config: Arc<ApiConfig>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentResponse {
    file_path: Option<String>,
    #[serde(default)]
    num_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SharedResponse {
    file_path: Option<String>,
    #[serde(default)]
    document_id: Option<Value>,
    #[serde(default)]
    num_pages: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SharedFinalizeRequest<'a> {
    signature_details: &'a SignatureDetails,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build();
        Self { agent, config: Arc::new(config) }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn list_documents(&self, credential: &Credential) -> Result<Vec<DocumentSummary>, ApiError> {
        let body = self.fetch(self.request("GET", "docs", Some(credential)), "list documents")?;
        parse_json(&body)
    }

    pub fn audit_trail(
        &self,
        credential: &Credential,
        id: &DocumentId,
    ) -> Result<Vec<AuditEntry>, ApiError> {
        let request = self.request("GET", &format!("signatures/{id}"), Some(credential));
        let body = self.fetch(request, "audit trail")?;
        parse_json(&body)
    }

    /// Mail a signing link to `email`. Returns the server's message, if any.
    pub fn share_by_email(
        &self,
        credential: &Credential,
        email: &str,
        link: &str,
    ) -> Result<Option<String>, ApiError> {
        let request = self.request("POST", "email/share", Some(credential));
        let body = self.send(request, &json!({ "email": email, "link": link }), "share by email")?;
        Ok(message_field(&body))
    }

    pub fn delete_document(&self, credential: &Credential, id: &DocumentId) -> Result<(), ApiError> {
        let request = self.request("DELETE", &format!("docs/{id}"), Some(credential));
        self.fetch(request, "delete document")?;
        Ok(())
    }

    fn request(&self, method: &str, path: &str, credential: Option<&Credential>) -> ureq::Request {
        let request = self
            .agent
            .request(method, &self.config.endpoint(path))
            .set("Accept", "application/json");
        match credential {
            Some(credential) => request.set("Authorization", &credential.authorization_header()),
            None => request,
        }
    }

    fn fetch(&self, request: ureq::Request, route: &'static str) -> Result<String, ApiError> {
        tracing::debug!(route, "request");
        read_text(request.call().map_err(map_ureq_error)?)
    }

    fn send<T: Serialize + ?Sized>(
        &self,
        request: ureq::Request,
        body: &T,
        route: &'static str,
    ) -> Result<String, ApiError> {
        read_text(self.send_raw(request, body, route)?)
    }

    fn send_raw<T: Serialize + ?Sized>(
        &self,
        request: ureq::Request,
        body: &T,
        route: &'static str,
    ) -> Result<ureq::Response, ApiError> {
        let encoded = serde_json::to_string(body).map_err(|e| ApiError::Encode(e.to_string()))?;
        tracing::debug!(route, bytes = encoded.len(), "request");
        request
            .set("Content-Type", "application/json")
            .send_string(&encoded)
            .map_err(map_ureq_error)
    }

    fn finalize_timeout(&self) -> Duration {
        self.config.finalize_timeout
    }
}

impl Authenticator for ApiClient {
    fn login(&self, email: &str, password: &str) -> Result<Credential, ApiError> {
        let request = self.request("POST", "auth/login", None);
        let body = self.send(request, &json!({ "email": email, "password": password }), "login")?;
        let response: LoginResponse = parse_json(&body)?;
        Ok(Credential::new(response.token))
    }
}

impl DocumentLookup for ApiClient {
    fn fetch_document(&self, credential: &Credential, id: &DocumentId) -> Result<DocumentLocation, ApiError> {
        let request = self.request("GET", &format!("docs/{id}"), Some(credential));
        let body = self.fetch(request, "fetch document")?;
        parse_document(&self.config, &body)
    }
}

impl TokenResolver for ApiClient {
    fn resolve_token(&self, token: &ShareToken) -> Result<SharedDocument, ApiError> {
        let request = self.request("GET", &format!("shared/{}", token.as_str()), None);
        let body = self.fetch(request, "resolve share token")?;
        parse_shared(&self.config, &body)
    }
}

impl SignatureStore for ApiClient {
    fn record_signature(
        &self,
        credential: Option<&Credential>,
        payload: &SignaturePayload,
    ) -> Result<Option<SignatureRecordId>, ApiError> {
        let request = self.request("POST", "signatures", credential);
        let body = self.send(request, payload, "record signature")?;
        Ok(record_id(&body))
    }
}

impl Finalizer for ApiClient {
    fn finalize_document(&self, credential: &Credential, id: &DocumentId) -> Result<Vec<u8>, ApiError> {
        let request = self
            .request("POST", "signatures/finalize", Some(credential))
            .set("Accept", "application/pdf")
            .timeout(self.finalize_timeout());
        let response = self.send_raw(request, &json!({ "documentId": id }), "finalize document")?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(map_io_error)?;
        if bytes.is_empty() {
            return Err(ApiError::InvalidResponse("finalized document is empty".into()));
        }
        Ok(bytes)
    }

    fn finalize_shared(&self, token: &ShareToken, details: &SignatureDetails) -> Result<FinalizeAck, ApiError> {
        let request = self
            .request("POST", &format!("shared/finalize/{}", token.as_str()), None)
            .timeout(self.finalize_timeout());
        let body = self.send(
            request,
            &SharedFinalizeRequest { signature_details: details },
            "finalize shared document",
        )?;
        Ok(FinalizeAck { message: message_field(&body) })
    }
}

fn read_text(response: ureq::Response) -> Result<String, ApiError> {
    response.into_string().map_err(map_io_error)
}

fn map_io_error(error: io::Error) -> ApiError {
    if is_timeout(&error) {
        ApiError::TimedOut
    } else {
        ApiError::InvalidResponse(error.to_string())
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn map_ureq_error(error: ureq::Error) -> ApiError {
    match error {
        ureq::Error::Status(status, response) => {
            status_error(status, &response.into_string().unwrap_or_default())
        }
        ureq::Error::Transport(transport) => {
            let timed_out = std::error::Error::source(&transport)
                .and_then(|source| source.downcast_ref::<io::Error>())
                .is_some_and(is_timeout);
            if timed_out {
                ApiError::TimedOut
            } else {
                ApiError::Network(transport.to_string())
            }
        }
    }
}

fn status_error(status: u16, body: &str) -> ApiError {
    if status == 401 {
        return ApiError::Unauthorized;
    }
    let message = message_field(body).unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed.starts_with('<') {
            format!("HTTP {status}")
        } else {
            trimmed.chars().take(200).collect()
        }
    });
    ApiError::Status { status, message }
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

fn message_field(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key)?.as_str().map(str::to_owned))
}

/// Server ids arrive either as plain strings or as populated `{_id}` objects.
fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(map) => map.get("_id").or_else(|| map.get("id")).and_then(id_value),
        _ => None,
    }
}

fn record_id(body: &str) -> Option<SignatureRecordId> {
    let value: Value = serde_json::from_str(body).ok()?;
    let record = value.get("signature").unwrap_or(&value);
    record
        .get("_id")
        .or_else(|| record.get("id"))
        .and_then(id_value)
        .map(SignatureRecordId)
}

fn location(config: &ApiConfig, file_path: Option<String>, page_count: Option<u32>) -> Result<DocumentLocation, ApiError> {
    match file_path {
        Some(path) if !path.trim().is_empty() => Ok(DocumentLocation {
            url: config.resolve_file_url(&path),
            page_count,
        }),
        _ => Err(ApiError::InvalidResponse("no file found for document".into())),
    }
}

fn parse_document(config: &ApiConfig, body: &str) -> Result<DocumentLocation, ApiError> {
    let response: DocumentResponse = parse_json(body)?;
    location(config, response.file_path, response.num_pages)
}

fn parse_shared(config: &ApiConfig, body: &str) -> Result<SharedDocument, ApiError> {
    let response: SharedResponse = parse_json(body)?;
    Ok(SharedDocument {
        document_id: response.document_id.as_ref().and_then(id_value).map(DocumentId::new),
        location: location(config, response.file_path, response.num_pages)?,
    })
}
