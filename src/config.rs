use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE: &str = "https://signature-app-server-1.onrender.com";
pub const CONFIG_FILE_NAME: &str = "snapsign.toml";
const DEFAULT_SIGNATURE_FILE: &str = "signature.png";

/// Runtime settings. Missing fields take the defaults below; environment
/// variables win over the file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub download_dir: PathBuf,
    pub default_signature_path: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = preferred_data_dir();
        let download_dir = downloads_dir().unwrap_or_else(|| data_dir.clone());
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            default_signature_path: data_dir.join(DEFAULT_SIGNATURE_FILE),
            data_dir,
            download_dir,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Defaults, then `snapsign.toml` in the data dir, then the environment.
    pub fn load() -> Result<Self> {
        let base = Config::default();
        let mut config = match read_config_file(&base.data_dir.join(CONFIG_FILE_NAME))? {
            Some(file) => file,
            None => base,
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Fields the file leaves out take their defaults. A `data_dir` without
    /// its own `default_signature_path` carries the default asset with it.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        let defaults = Config::default();
        config.rebase_default_signature(&defaults.data_dir);
        Ok(config)
    }

    /// Moves the default signature asset under the current `data_dir` when it
    /// still points at the stock location inside `old_data_dir`.
    fn rebase_default_signature(&mut self, old_data_dir: &Path) {
        if self.default_signature_path == old_data_dir.join(DEFAULT_SIGNATURE_FILE) {
            self.default_signature_path = self.data_dir.join(DEFAULT_SIGNATURE_FILE);
        }
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup("SNAPSIGN_API_BASE").filter(|v| !v.trim().is_empty()) {
            self.api_base_url = base.trim().to_string();
        }
        if let Some(dir) = lookup("SNAPSIGN_DATA_DIR") {
            let old = std::mem::replace(&mut self.data_dir, PathBuf::from(dir));
            self.rebase_default_signature(&old);
        }
        if let Some(dir) = lookup("SNAPSIGN_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("SNAPSIGN_DEFAULT_SIGNATURE") {
            self.default_signature_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("SNAPSIGN_TIMEOUT_SECS") {
            self.request_timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("SNAPSIGN_TIMEOUT_SECS={raw}")))?;
        }
        Ok(())
    }

    /// `<base>/<path>` without doubled slashes.
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn read_config_file(path: &Path) -> Result<Option<Config>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Config::from_toml_str(&raw).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Io(e)),
    }
}

pub fn preferred_data_dir() -> PathBuf {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(custom) = std::env::var("SNAPSIGN_DATA_DIR") {
        candidates.push(PathBuf::from(custom));
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        candidates.push(PathBuf::from(xdg).join("snapsign"));
    }
    if let Ok(home) = std::env::var("HOME") {
        candidates.push(PathBuf::from(home).join(".snapsign"));
    }

    for dir in candidates {
        if let Ok(meta) = std::fs::metadata(&dir) {
            if meta.is_dir() {
                return dir;
            }
        }
    }
    std::env::temp_dir().join("snapsign")
}

pub fn downloads_dir() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(dir) = std::env::var("XDG_DOWNLOAD_DIR") {
        candidates.push(PathBuf::from(dir));
    }
    if let Ok(home) = std::env::var("HOME") {
        candidates.push(PathBuf::from(home).join("Downloads"));
    }

    for dir in candidates {
        if let Ok(meta) = std::fs::metadata(&dir) {
            if meta.is_dir() {
                return Some(dir);
            }
        }
    }
    None
}
