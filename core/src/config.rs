//! Connection settings, resolved from layered sources.
//!
//! # Design
//! A `Resolver` holds an ordered list of `Source`s. Each source loads into a
//! `SettingsLayer` of optional values; layers are folded left to right, so
//! later sources win. Empty strings never override anything. The standard
//! order is built-in defaults, then the YAML config file, then `TAPI_*`
//! environment variables.
//!
//! A missing config file is an empty layer. A file that exists but cannot
//! be read or parsed is a `ConfigError`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "TAPI_URL";
pub const ENV_API_KEY: &str = "TAPI_KEY";
pub const ENV_TIMEOUT: &str = "TAPI_TIMEOUT";

const ENV_KEYS: [&str; 3] = [ENV_BASE_URL, ENV_API_KEY, ENV_TIMEOUT];

const APP_DIR: &str = "tcli";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed config file {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("config file {} already exists (use --force to overwrite)", .0.display())]
    AlreadyExists(PathBuf),

    #[error("could not write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not determine a home directory for the config file")]
    NoHomeDir,
}

/// Resolved connection settings. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Partial settings produced by a single source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsLayer {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl SettingsLayer {
    /// Overlay `other` on top of `self`. Empty strings in `other` are skipped.
    pub fn merge(mut self, other: SettingsLayer) -> SettingsLayer {
        if let Some(url) = non_empty(other.base_url) {
            self.base_url = Some(url);
        }
        if let Some(key) = non_empty(other.api_key) {
            self.api_key = Some(key);
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        self
    }

    fn into_settings(self) -> Settings {
        let defaults = Settings::default();
        Settings {
            base_url: non_empty(self.base_url).unwrap_or(defaults.base_url),
            api_key: non_empty(self.api_key),
            timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// On-disk YAML layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub api: Option<ApiSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// One configuration source.
#[derive(Debug, Clone)]
pub enum Source {
    Defaults,
    File(PathBuf),
    Env(BTreeMap<String, String>),
}

impl Source {
    /// Environment source holding the `TAPI_*` variables of this process.
    ///
    /// Only those keys are read, so unrelated variables that are not valid
    /// UTF-8 are never touched.
    pub fn process_env() -> Source {
        Source::env_from_os(ENV_KEYS.iter().map(|key| (*key, std::env::var_os(key))))
    }

    /// Environment source from raw OS values. Values that are not valid
    /// UTF-8 are skipped with a warning.
    fn env_from_os<'a, I>(vars: I) -> Source
    where
        I: IntoIterator<Item = (&'a str, Option<OsString>)>,
    {
        let mut pairs = Vec::new();
        for (key, value) in vars {
            match value.map(OsString::into_string) {
                Some(Ok(value)) => pairs.push((key, value)),
                Some(Err(_)) => warn!(key, "ignoring environment variable that is not valid UTF-8"),
                None => {}
            }
        }
        Source::env_from(pairs)
    }

    /// Environment source built from explicit pairs. Unrelated keys are dropped.
    pub fn env_from<I, K, V>(vars: I) -> Source
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Source::Env(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .filter(|(k, _)| ENV_KEYS.contains(&k.as_str()))
                .collect(),
        )
    }

    pub fn load(&self) -> Result<SettingsLayer, ConfigError> {
        match self {
            Source::Defaults => Ok(SettingsLayer {
                base_url: Some(DEFAULT_BASE_URL.to_string()),
                api_key: None,
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            }),
            Source::File(path) => load_file(path),
            Source::Env(vars) => {
                let timeout_secs = match vars.get(ENV_TIMEOUT).map(|v| v.trim()) {
                    Some(raw) if !raw.is_empty() => Some(parse_timeout(ENV_TIMEOUT, raw)?),
                    _ => None,
                };
                Ok(SettingsLayer {
                    base_url: vars.get(ENV_BASE_URL).cloned(),
                    api_key: vars.get(ENV_API_KEY).cloned(),
                    timeout_secs,
                })
            }
        }
    }
}

fn parse_timeout(key: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        Ok(_) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn load_file(path: &Path) -> Result<SettingsLayer, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file");
            return Ok(SettingsLayer::default());
        }
        Err(source) => {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(SettingsLayer::default());
    }
    let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    let api = file.api.unwrap_or_default();
    if api.timeout_seconds == Some(0) {
        warn!(path = %path.display(), "ignoring api.timeout_seconds of 0");
    }
    Ok(SettingsLayer {
        base_url: api.base_url,
        api_key: api.api_key,
        timeout_secs: api.timeout_seconds.filter(|secs| *secs > 0),
    })
}

/// Ordered list of sources; later sources override earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    sources: Vec<Source>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, then the config file (`path` or the platform default), then
    /// the process environment.
    pub fn standard(path: Option<PathBuf>) -> Self {
        let mut resolver = Resolver::new().source(Source::Defaults);
        match path.or_else(default_config_path) {
            Some(path) => resolver = resolver.source(Source::File(path)),
            None => warn!("no home directory; skipping config file"),
        }
        resolver.source(Source::process_env())
    }

    pub fn source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let layer = self
            .sources
            .iter()
            .try_fold(SettingsLayer::default(), |acc, source| {
                source.load().map(|layer| acc.merge(layer))
            })?;
        let settings = layer.into_settings();
        debug!(base_url = %settings.base_url, has_key = settings.api_key.is_some(), "resolved settings");
        Ok(settings)
    }
}

/// Resolve settings from the standard sources.
pub fn resolve() -> Result<Settings, ConfigError> {
    Resolver::standard(None).resolve()
}

/// Platform config file location.
///
/// POSIX: `$XDG_CONFIG_HOME/tcli/config.yaml`, else `~/.config/tcli/config.yaml`.
/// Windows: `~/.tcli/config.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    config_path_from(std::env::var_os("XDG_CONFIG_HOME"), home)
}

#[cfg(not(windows))]
fn config_path_from(xdg_config_home: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    let base = match xdg_config_home.filter(|dir| !dir.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => home?.join(".config"),
    };
    Some(base.join(APP_DIR).join(CONFIG_FILE))
}

#[cfg(windows)]
fn config_path_from(_xdg_config_home: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    Some(home?.join(format!(".{APP_DIR}")).join(CONFIG_FILE))
}

/// Write a config file holding the given connection values.
pub fn write_config_file(
    path: &Path,
    base_url: &str,
    api_key: Option<&str>,
    overwrite: bool,
) -> Result<(), ConfigError> {
    if path.exists() && !overwrite {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    let file = ConfigFile {
        api: Some(ApiSection {
            base_url: Some(base_url.to_string()),
            api_key: api_key.map(str::to_string),
            timeout_seconds: None,
        }),
    };
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(write_err)?;
    }
    let yaml = serde_yaml::to_string(&file).map_err(|e| ConfigError::InvalidValue {
        key: "api".to_string(),
        value: base_url.to_string(),
        reason: e.to_string(),
    })?;
    fs::write(path, yaml).map_err(write_err)
}
