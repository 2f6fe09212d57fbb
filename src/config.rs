use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ChatError, Result};
use crate::store::MergePolicy;

// Default configuration
pub const DEFAULT_PUSH_URL: &str = "ws://localhost:9000/ws";
pub const DEFAULT_SNAPSHOT_URL: &str = "http://localhost:9000/api/conversations";
pub const DEFAULT_MEETING_BASE_URL: &str = "http://localhost:9000";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub user_id: String,
    pub user_name: String,
    pub push_url: String,
    pub snapshot_url: String,
    pub meeting_base_url: String,
    pub merge_policy: MergePolicy,
    /// Default tracing filter when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            user_name: String::new(),
            push_url: DEFAULT_PUSH_URL.to_string(),
            snapshot_url: DEFAULT_SNAPSHOT_URL.to_string(),
            meeting_base_url: DEFAULT_MEETING_BASE_URL.to_string(),
            merge_policy: MergePolicy::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Settings {
    /// A signed-in user is required before anything is sent or routed.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(ChatError::Configuration("user_id is not set".into()));
        }
        crate::validation::validate_user_id(&self.user_id).map_err(ChatError::Configuration)?;
        for (field, url) in [
            ("push_url", &self.push_url),
            ("snapshot_url", &self.snapshot_url),
            ("meeting_base_url", &self.meeting_base_url),
        ] {
            reqwest::Url::parse(url)
                .map_err(|e| ChatError::Configuration(format!("{} is invalid: {}", field, e)))?;
        }
        Ok(())
    }

    /// Name shown for the local user; falls back to the id.
    pub fn display_name(&self) -> &str {
        if self.user_name.trim().is_empty() {
            &self.user_id
        } else {
            &self.user_name
        }
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "casechat", "casechat")
}

pub fn settings_path() -> Option<PathBuf> {
    let proj = project_dirs()?;
    let dir = proj.config_dir();
    if let Err(e) = fs::create_dir_all(dir) {
        tracing::warn!(error = %e, "failed to create config dir");
        return None;
    }
    Some(dir.join("settings.json"))
}

pub fn load_settings() -> Option<Settings> {
    let path = settings_path()?;
    load_settings_from(&path).ok()
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let path = settings_path()
        .ok_or_else(|| ChatError::Configuration("no config directory available".into()))?;
    save_settings_to(settings, &path)
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    let data = serde_json::to_string_pretty(settings)?;
    let mut file = fs::File::create(path)?;
    file.write_all(data.as_bytes())?;
    Ok(())
}
