use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Directory holding the database, settings, wizard state and log.
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// `OBRATUI_DATA_DIR` if set, otherwise the platform data directory.
    pub fn resolve() -> Result<Self> {
        let base_dir = match std::env::var("OBRATUI_DATA_DIR") {
            Ok(custom) if !custom.trim().is_empty() => PathBuf::from(custom),
            _ => directories::ProjectDirs::from("com", "obratui", "ObraTUI")
                .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
                .data_dir()
                .to_path_buf(),
        };
        Ok(Self { base_dir })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join("obratui.db")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn state_file(&self) -> PathBuf {
        self.base_dir.join("state.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.base_dir.join("obratui.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create data directory: {}",
                self.base_dir.display()
            )
        })
    }
}
