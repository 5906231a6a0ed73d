// Configuration storage for notekeeper
// Global config is a markdown file: settings in YAML frontmatter, notes for humans in the body

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{NoteError, NoteResult};
use crate::models::Settings;

const CONFIG_BODY: &str = "# notekeeper\n\nSettings live in the frontmatter above.\n";

// ============================================
// PATH HELPERS
// ============================================

/// Global config directory (~/.notekeeper/)
pub fn global_config_dir() -> NoteResult<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| NoteError::Config("no home directory".to_string()))?;
    Ok(home.join(".notekeeper"))
}

/// Global config file path
pub fn global_config_path() -> NoteResult<PathBuf> {
    Ok(global_config_dir()?.join("config.md"))
}

/// Storage root used when none was picked: ~/Documents/Notes
pub fn default_storage_root() -> Option<PathBuf> {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join("Notes"))
}

// ============================================
// FRONTMATTER PARSING
// ============================================

/// Parse YAML frontmatter from markdown content
pub fn parse_frontmatter<T: serde::de::DeserializeOwned>(content: &str) -> Option<(T, String)> {
    let content = content.trim();
    let rest = content.strip_prefix("---")?;
    let end = rest.find("\n---")?;
    let yaml = rest[..end].trim();
    let body = rest[end + 4..].trim().to_string();

    let frontmatter: T = serde_yaml::from_str(yaml).ok()?;
    Some((frontmatter, body))
}

/// Serialize frontmatter + body to markdown
pub fn to_markdown<T: serde::Serialize>(frontmatter: &T, body: &str) -> NoteResult<String> {
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(format!("---\n{yaml}---\n\n{body}"))
}

// ============================================
// SETTINGS
// ============================================

/// Load settings; a missing or unreadable file gives the defaults
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        tracing::debug!("[load_settings] {} does not exist, using defaults", path.display());
        return Settings::default();
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("[load_settings] could not read {}: {}", path.display(), e);
            return Settings::default();
        }
    };

    match parse_frontmatter::<Settings>(&content) {
        Some((settings, _)) => {
            tracing::debug!("[load_settings] storage root: {:?}", settings.storage_root);
            settings
        }
        None => {
            tracing::warn!("[load_settings] invalid frontmatter in {}, using defaults", path.display());
            Settings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> NoteResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = to_markdown(settings, CONFIG_BODY)?;
    fs::write(path, content)?;
    Ok(())
}
