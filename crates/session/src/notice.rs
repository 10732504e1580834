//! User-facing outcome messages.
//!
//! Every session action converts its outcome into a [`Notice`] instead of
//! letting failures escape as faults. Front ends drain them with
//! `take_notices()`.

use crate::error::SessionError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self { severity, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Validation problems are warnings; everything else is an error.
    pub fn from_error(error: &SessionError) -> Self {
        let severity = match error {
            SessionError::Validation(_)
            | SessionError::Collection(_)
            | SessionError::FinalizeInFlight
            | SessionError::AlreadyFinalized => Severity::Warning,
            SessionError::Cancelled => Severity::Info,
            _ => Severity::Error,
        };
        Self::new(severity, error.to_string())
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity.as_str(), self.message)
    }
}

/// Pending notices, oldest first.
#[derive(Debug, Default)]
pub(crate) struct NoticeQueue {
    pending: Vec<Notice>,
}

impl NoticeQueue {
    pub(crate) fn push(&mut self, notice: Notice) {
        self.pending.push(notice);
    }

    pub(crate) fn take(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.pending)
    }
}
