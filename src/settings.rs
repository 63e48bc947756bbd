use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::pipeline::DEFAULT_COOLDOWN;
use crate::scanner::CameraFacing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// How long the pipeline refuses new payloads after producing an outcome.
    pub cooldown_ms: u64,
    pub facing: CameraFacing,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN.as_millis() as u64,
            facing: CameraFacing::Environment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSettings {
    scanner: ScannerSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn scanner(&self) -> ScannerSettings {
        self.data.read().unwrap().scanner.clone()
    }

    pub fn update_scanner(&self, settings: ScannerSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.scanner = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
