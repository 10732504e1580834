//! Wire records exchanged with the signing server.
//!
//! Field names follow the server's camelCase JSON contract exactly.

use crate::annotation::SignatureAnnotation;
use crate::style::{FontFamily, FontSize, FontStyle, FontWeight, TextColor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-side document identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque capability token from a shared signing link.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ShareToken(String);

impl ShareToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShareToken(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    #[default]
    Pending,
    Signed,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl SignatureStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who signed, from where, and when. Sent only by guest flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_by: Option<String>,
    /// Left empty unless the caller really knows it; the server records the peer address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
}

impl SignerMetadata {
    pub const GUEST: &'static str = "guest";

    pub fn guest(user_agent: impl Into<String>) -> Self {
        Self {
            signed_by: Some(Self::GUEST.to_owned()),
            ip_address: None,
            timestamp: Utc::now(),
            user_agent: user_agent.into(),
        }
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }
}

/// Body of one `POST /signatures` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePayload {
    pub document_id: DocumentId,
    pub x: f64,
    pub y: f64,
    pub page: u32,
    pub status: SignatureStatus,
    pub text: String,
    pub font_size: FontSize,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub underline: bool,
    pub font_family: FontFamily,
    pub color: TextColor,
    #[serde(flatten)]
    pub signer: Option<SignerMetadata>,
}

impl SignaturePayload {
    pub fn signed(
        document_id: &DocumentId,
        annotation: &SignatureAnnotation,
        signer: Option<&SignerMetadata>,
    ) -> Self {
        let position = annotation.position();
        let style = annotation.style();

        Self {
            document_id: document_id.clone(),
            x: position.x,
            y: position.y,
            page: annotation.page(),
            status: SignatureStatus::Signed,
            text: style.text.clone(),
            font_size: style.font_size,
            font_weight: style.font_weight,
            font_style: style.font_style,
            underline: style.underline,
            font_family: style.font_family.clone(),
            color: style.color,
            signer: signer.cloned(),
        }
    }
}

/// Inline signature descriptor posted to `/shared/finalize/{token}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureDetails {
    pub x: f64,
    pub y: f64,
    pub page: u32,
    pub text: String,
    pub font_size: FontSize,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub underline: bool,
    pub font_family: FontFamily,
    pub color: TextColor,
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl SignatureDetails {
    pub fn new(annotation: &SignatureAnnotation, signer: &SignerMetadata) -> Self {
        let position = annotation.position();
        let style = annotation.style();

        Self {
            x: position.x,
            y: position.y,
            page: annotation.page(),
            text: style.text.clone(),
            font_size: style.font_size,
            font_weight: style.font_weight,
            font_style: style.font_style,
            underline: style.underline,
            font_family: style.font_family.clone(),
            color: style.color,
            user_agent: signer.user_agent.clone(),
            ip_address: signer.ip_address.clone(),
            timestamp: signer.timestamp,
        }
    }
}

/// Entry of the owner's document list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    pub file_path: String,
    #[serde(default)]
    pub final_path: Option<String>,
    #[serde(default)]
    pub status: SignatureStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl DocumentSummary {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.original_name.as_deref())
            .unwrap_or("document.pdf")
    }
}

/// One signature record in a document's audit trail.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub status: SignatureStatus,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub signed_by: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// ISO-8601 with millisecond precision, matching what browsers send.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
