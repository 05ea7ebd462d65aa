//! # Inspector Settings
//!
//! Persistent tuning knobs for the inspector.
//!
//! ## Settings Persistence
//! - **Location**: `~/.gantry/inspector.json`
//! - **Format**: JSON with pretty formatting
//! - **Default Fallback**: if loading fails or no file exists, defaults are used
//! - **Auto-creation**: the directory is created on save

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{InspectorError, Result};
use crate::history::CommandHistory;

#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InspectorSettings {
    /// Pointer travel (px) before a press on a collection element becomes a drag
    pub drag_threshold: f32,

    /// Bound on nested render / group resolution depth
    pub max_depth: usize,

    /// Expand a drag to the run of similar neighbours
    #[serde(default = "default_true")]
    pub smart_selection: bool,

    /// Initial state of composite fields with no stored expansion
    pub expand_fields_by_default: bool,

    /// Initial state of foldout groups with no stored expansion
    pub expand_foldouts_by_default: bool,

    /// Undo stack capacity
    pub history_capacity: usize,

    /// Edits to one field closer together than this merge into one undo step
    pub merge_window_ms: u64,
}

fn default_true() -> bool {
    true
}

impl Default for InspectorSettings {
    fn default() -> Self {
        Self {
            drag_threshold: 4.0,
            max_depth: 64,
            smart_selection: true,
            expand_fields_by_default: false,
            expand_foldouts_by_default: false,
            history_capacity: 100,
            merge_window_ms: 300,
        }
    }
}

impl InspectorSettings {
    /// `~/.gantry/inspector.json`
    pub fn settings_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".gantry").join("inspector.json"))
    }

    /// Load settings from the default location or fall back to defaults
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("Could not determine home directory. Using default inspector settings.");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No inspector settings at {:?}. Using defaults.", path);
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<InspectorSettings>(&content) {
                Ok(settings) => {
                    info!("Loaded inspector settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse inspector settings: {}. Using defaults.", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read inspector settings: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path().ok_or(InspectorError::NoHomeDirectory)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Saved inspector settings to {:?}", path);
        Ok(())
    }

    /// Undo history configured from these settings
    pub fn command_history(&self) -> CommandHistory {
        CommandHistory::new(self.history_capacity, Duration::from_millis(self.merge_window_ms))
    }
}
