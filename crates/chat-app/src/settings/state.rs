use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::chat::handler::DEFAULT_GREETING;
use crate::chat::scroll_manager::DEFAULT_VIEWPORT_ROWS;
use crate::chat::view::ChatViewConfig;

pub const DEFAULT_TRANSPORT_PATH: &str = "/ilmagent";
pub const SETTINGS_DIRECTORY_NAME: &str = "zova";
pub const SETTINGS_FILE_NAME: &str = "live.json";
pub const STORAGE_FILE_NAME: &str = "local_storage.json";
pub const ENV_PREFIX: &str = "ZOVA_LIVE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSettings {
    /// Where the session id is kept; `None` uses the platform data directory.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    #[serde(default = "default_transport_path")]
    pub transport_path: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default)]
    pub response_timeout_secs: Option<u64>,
    #[serde(default = "default_viewport_rows")]
    pub viewport_rows: u32,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            storage_path: None,
            transport_path: default_transport_path(),
            greeting: default_greeting(),
            response_timeout_secs: None,
            viewport_rows: default_viewport_rows(),
        }
    }
}

impl LiveSettings {
    /// Restores defaults for blank fields and drops a zero timeout.
    pub fn normalized(mut self) -> Self {
        self.transport_path = if self.transport_path.trim().is_empty() {
            default_transport_path()
        } else {
            self.transport_path.trim().to_string()
        };
        if self.greeting.trim().is_empty() {
            self.greeting = default_greeting();
        }
        self.storage_path = self
            .storage_path
            .filter(|path| !path.as_os_str().is_empty());
        self.response_timeout_secs = self.response_timeout_secs.filter(|secs| *secs > 0);
        if self.viewport_rows == 0 {
            self.viewport_rows = default_viewport_rows();
        }

        self
    }

    /// The configured storage file, or `<data_dir>/zova/local_storage.json`.
    pub fn resolved_storage_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(default_storage_path)
    }

    /// `None` means wait for a reply forever.
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_secs.map(Duration::from_secs)
    }

    /// The subset of settings the chat view consumes.
    pub fn view_config(&self) -> ChatViewConfig {
        ChatViewConfig {
            greeting: self.greeting.clone(),
            response_timeout: self.response_timeout(),
            viewport_rows: self.viewport_rows,
        }
    }
}

/// Live settings loaded once and swappable while the session runs.
pub struct SettingsStore {
    settings: Arc<ArcSwap<LiveSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".zova"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Loads defaults, then `config_path`, then `ZOVA_LIVE_*` overrides.
    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from(&config_path, Some(ENV_PREFIX));
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    /// Reads only the file layer, ignoring `ZOVA_LIVE_*` overrides.
    pub fn from_file(config_path: PathBuf) -> Self {
        let settings = Self::load_from(&config_path, None);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    /// Loads from the platform config directory.
    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Arc<LiveSettings> {
        self.settings.load_full()
    }

    /// Normalizes, persists, then publishes `settings`.
    pub fn update(&self, settings: LiveSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from(path: &Path, env_prefix: Option<&str>) -> LiveSettings {
        if !path.exists() {
            tracing::info!(path = %path.display(), "settings file not found, using defaults");
        }

        let mut figment = Figment::from(Serialized::defaults(LiveSettings::default()))
            .merge(Json::file(path));
        if let Some(prefix) = env_prefix {
            figment = figment.merge(Env::prefixed(prefix));
        }

        match figment.extract::<LiveSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "failed to parse settings, using defaults"
                );
                LiveSettings::default()
            }
        }
    }

    fn persist(&self, settings: &LiveSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-live-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-live-settings",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-live-settings",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "replace-live-settings",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!(path = %self.config_path.display(), "saved settings");
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn default_transport_path() -> String {
    DEFAULT_TRANSPORT_PATH.to_string()
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_viewport_rows() -> u32 {
    DEFAULT_VIEWPORT_ROWS
}

fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
        .unwrap_or_else(|| PathBuf::from(".zova"))
        .join(STORAGE_FILE_NAME)
}
