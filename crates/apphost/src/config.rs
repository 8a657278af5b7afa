use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppHostError, AppHostResult};
use crate::protocol::RelayNamespace;
use crate::registry::{AppManifestEntry, AppRegistry};

pub const CONFIG_FILENAME: &str = "apphost.json";
pub const CONFIG_VERSION: &str = "1.0.0";

pub const DEFAULT_BASE_PATH: &str = "prefix_/reactapp";
pub const DEFAULT_SUMMARY_THRESHOLD: usize = 100;
pub const DEFAULT_RESPONDER_TTL_MS: u64 = 300_000;
pub const DEFAULT_RELAY_TIMEOUT_MS: u64 = 2_500;
pub const DEFAULT_FALLBACK_DELAY_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppHostConfig {
    pub version: String,
    #[serde(default)]
    pub launcher: LauncherSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub apps: Vec<AppManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Web resource folder the pages are published under.
    pub base_path: String,
    /// Open `<page>_debugger.html` instead of the page itself.
    pub use_debugger: bool,
    /// Largest selection embedded directly in the navigation data.
    pub summary_threshold: usize,
    /// How long a relay responder waits for its request; `None` waits forever.
    pub responder_ttl_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub relay_timeout_ms: u64,
    pub fallback_delay_ms: u64,
    pub relay_namespace: RelayNamespace,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            use_debugger: false,
            summary_threshold: DEFAULT_SUMMARY_THRESHOLD,
            responder_ttl_ms: Some(DEFAULT_RESPONDER_TTL_MS),
        }
    }
}

impl LauncherSettings {
    pub fn responder_ttl(&self) -> Option<Duration> {
        self.responder_ttl_ms.map(Duration::from_millis)
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            relay_timeout_ms: DEFAULT_RELAY_TIMEOUT_MS,
            fallback_delay_ms: DEFAULT_FALLBACK_DELAY_MS,
            relay_namespace: RelayNamespace::Docgen,
        }
    }
}

impl ProviderSettings {
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }
}

impl Default for AppHostConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            launcher: LauncherSettings::default(),
            provider: ProviderSettings::default(),
            apps: Vec::new(),
        }
    }
}

impl AppHostConfig {
    pub fn registry(&self) -> AppRegistry {
        AppRegistry::from_manifest(&self.apps)
    }
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILENAME)
}

pub fn load_or_create_config(dir: &Path) -> AppHostResult<AppHostConfig> {
    std::fs::create_dir_all(dir).map_err(|error| AppHostError::io(dir, error))?;

    let path = config_path(dir);
    if !path.exists() {
        let config = AppHostConfig::default();
        write_config(&path, &config)?;
        return Ok(config);
    }
    load_config(&path)
}

pub fn load_config(path: &Path) -> AppHostResult<AppHostConfig> {
    let data = std::fs::read_to_string(path).map_err(|error| AppHostError::io(path, error))?;
    let config: AppHostConfig = serde_json::from_str(&data)?;
    if config.version != CONFIG_VERSION {
        return Err(AppHostError::InvalidInput(format!(
            "unsupported config version {} in {}",
            config.version,
            path.display()
        )));
    }
    Ok(config)
}

pub fn write_config(path: &Path, config: &AppHostConfig) -> AppHostResult<()> {
    let data = serde_json::to_string_pretty(config)?;
    std::fs::write(path, data).map_err(|error| AppHostError::io(path, error))?;
    Ok(())
}
