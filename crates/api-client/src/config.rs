use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://signature-server-5olu.onrender.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Finalization renders the whole PDF server-side and gets its own budget.
    pub finalize_timeout: Duration,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            request_timeout: Duration::from_secs(30),
            finalize_timeout: Duration::from_secs(120),
            user_agent: concat!("signdesk/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl ApiConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.origin(), path.trim_start_matches('/'))
    }

    /// Turn a server-relative storage path into a fetchable URL.
    ///
    /// Windows-style separators are normalized and absolute URLs pass through.
    pub fn resolve_file_url(&self, file_path: &str) -> String {
        let normalized = file_path.replace('\\', "/");
        if normalized.starts_with("http://") || normalized.starts_with("https://") {
            return normalized;
        }
        format!("{}/{}", self.origin(), normalized.trim_start_matches('/'))
    }
}
