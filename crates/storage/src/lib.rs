//! On-disk client configuration and the persisted login.

use api_client::{ApiConfig, Credential};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_SCHEMA_VERSION: u32 = 1;
const SESSION_SCHEMA_VERSION: u32 = 1;

/// Overrides the data directory, mainly for tests.
pub const HOME_ENV: &str = "SIGNDESK_HOME";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{file} has unsupported schema version {version}")]
    UnsupportedVersion { file: &'static str, version: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub finalize_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let api = ApiConfig::default();
        Self {
            base_url: api.base_url,
            request_timeout_secs: api.request_timeout.as_secs(),
            finalize_timeout_secs: api.finalize_timeout.as_secs(),
            user_agent: api.user_agent,
        }
    }
}

impl ClientConfig {
    pub fn to_api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            finalize_timeout: Duration::from_secs(self.finalize_timeout_secs.max(1)),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Credential from the last `login`, bound to the server that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub credential: Credential,
    pub email: String,
    pub base_url: String,
}

impl SavedSession {
    pub fn issued_by(&self, config: &ClientConfig) -> bool {
        self.base_url.trim_end_matches('/') == config.base_url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigBody {
    config: ClientConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionBody {
    session: SavedSession,
}

impl Storage {
    /// `$SIGNDESK_HOME` if set, else the platform data directory.
    pub fn from_env() -> Result<Self, StorageError> {
        match std::env::var_os(HOME_ENV) {
            Some(root) if !root.is_empty() => Ok(Self::with_root(root)),
            _ => Self::from_default_project(),
        }
    }

    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "SignDesk", "SignDesk").ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_config(&self) -> Result<ClientConfig, StorageError> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(ClientConfig::default());
        }

        let envelope: Envelope<ConfigBody> = serde_json::from_slice(&fs::read(path)?)?;
        check_version("config.json", envelope.version, CONFIG_SCHEMA_VERSION)?;
        Ok(envelope.body.config)
    }

    pub fn save_config(&self, config: &ClientConfig) -> Result<(), StorageError> {
        let envelope = Envelope { version: CONFIG_SCHEMA_VERSION, body: ConfigBody { config: config.clone() } };
        self.write(&self.config_path(), &serde_json::to_vec_pretty(&envelope)?)
    }

    pub fn load_session(&self) -> Result<Option<SavedSession>, StorageError> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }

        let envelope: Envelope<SessionBody> = serde_json::from_slice(&fs::read(path)?)?;
        check_version("session.json", envelope.version, SESSION_SCHEMA_VERSION)?;
        Ok(Some(envelope.body.session))
    }

    pub fn save_session(&self, session: &SavedSession) -> Result<(), StorageError> {
        let envelope = Envelope { version: SESSION_SCHEMA_VERSION, body: SessionBody { session: session.clone() } };
        let path = self.session_path();
        self.write(&path, &serde_json::to_vec_pretty(&envelope)?)?;
        restrict_to_owner(&path)?;
        tracing::debug!(path = %path.display(), "login session saved");
        Ok(())
    }

    /// Forget the stored login. Returns whether one existed.
    pub fn clear_session(&self) -> Result<bool, StorageError> {
        match fs::remove_file(self.session_path()) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    fn session_path(&self) -> PathBuf {
        self.root.join("session.json")
    }
}

fn check_version(file: &'static str, version: u32, supported: u32) -> Result<(), StorageError> {
    if version > supported {
        return Err(StorageError::UnsupportedVersion { file, version });
    }
    Ok(())
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SavedSession {
        SavedSession {
            credential: Credential::new("t0k"),
            email: "owner@example.com".into(),
            base_url: "http://localhost:5000".into(),
        }
    }

    #[test]
    fn config_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let config = ClientConfig { base_url: "http://localhost:5000".into(), ..ClientConfig::default() };
        store.save_config(&config).expect("save should succeed");

        assert_eq!(store.load_config().expect("load should succeed"), config);
    }

    #[test]
    fn config_defaults_when_file_absent() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let loaded = store.load_config().expect("load should succeed");
        assert_eq!(loaded, ClientConfig::default());
        assert_eq!(loaded.base_url, api_client::DEFAULT_BASE_URL);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        fs::write(
            temp.path().join("config.json"),
            r#"{"version":1,"config":{"base_url":"http://example.test"}}"#,
        )
        .unwrap();

        let loaded = Storage::with_root(temp.path()).load_config().unwrap();
        assert_eq!(loaded.base_url, "http://example.test");
        assert_eq!(loaded.finalize_timeout_secs, ClientConfig::default().finalize_timeout_secs);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        fs::write(temp.path().join("config.json"), r#"{"version":9,"config":{}}"#).unwrap();

        let err = Storage::with_root(temp.path()).load_config().unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedVersion { version: 9, .. }));
    }

    #[test]
    fn session_round_trip_and_clear() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());
        assert_eq!(store.load_session().unwrap(), None);

        store.save_session(&session()).expect("save should succeed");
        assert_eq!(store.load_session().unwrap(), Some(session()));

        assert!(store.clear_session().unwrap());
        assert!(!store.clear_session().unwrap());
        assert_eq!(store.load_session().unwrap(), None);
    }

    #[test]
    fn session_is_bound_to_issuing_server() {
        let config = ClientConfig { base_url: "http://localhost:5000/".into(), ..ClientConfig::default() };
        assert!(session().issued_by(&config));
        assert!(!session().issued_by(&ClientConfig::default()));
    }

    #[test]
    fn api_config_uses_configured_timeouts() {
        let config = ClientConfig { request_timeout_secs: 0, finalize_timeout_secs: 300, ..ClientConfig::default() };
        let api = config.to_api_config();
        assert_eq!(api.request_timeout, Duration::from_secs(1));
        assert_eq!(api.finalize_timeout, Duration::from_secs(300));
    }
}
