use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DEFAULT_MODEL_PATH: &str = "res/rosmontis_frames";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetSettings {
    pub model_path: String,
    #[serde(rename = "is_Mute")]
    pub is_mute: bool,
    pub enabled_auto_movement: bool,
    #[serde(rename = "custom_path1")]
    pub custom_path: String,
    pub frame_rate: u32,
    pub bgm_volume: f32,
    pub effects_volume: f32,
}

impl Default for PetSettings {
    fn default() -> Self {
        Self {
            model_path: DEFAULT_MODEL_PATH.to_owned(),
            is_mute: false,
            enabled_auto_movement: true,
            custom_path: String::new(),
            frame_rate: 30,
            bgm_volume: 0.1,
            effects_volume: 1.0,
        }
    }
}

impl PetSettings {
    /// Reads the settings file, falling back to defaults when it is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "settings file not found, using defaults");
            return Self::default();
        }
        match read_object(path) {
            Ok(object) => Self::from_object(&object, path),
            Err(err) => {
                warn!(?err, path = %path.display(), "failed loading settings, using defaults");
                Self::default()
            }
        }
    }

    /// Applies `mutate` to the stored settings and writes them back, keeping
    /// keys this version does not know about.
    pub fn update<F>(path: &Path, mutate: F) -> Result<Self>
    where
        F: FnOnce(&mut Self),
    {
        let mut object = if path.exists() {
            read_object(path).unwrap_or_else(|err| {
                warn!(?err, path = %path.display(), "discarding unreadable settings");
                Map::new()
            })
        } else {
            Map::new()
        };

        let mut settings = Self::from_object(&object, path);
        mutate(&mut settings);

        let Value::Object(known) =
            serde_json::to_value(&settings).context("failed serializing settings")?
        else {
            anyhow::bail!("settings did not serialize to a json object");
        };
        object.extend(known);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating {}", parent.display()))?;
        }
        let payload = serde_json::to_string_pretty(&Value::Object(object))
            .context("failed serializing settings")?;
        fs::write(path, payload).with_context(|| format!("failed writing {}", path.display()))?;
        Ok(settings)
    }

    /// Takes every known key that holds a valid value. A rejected key keeps
    /// its default and is logged, the rest of the file still applies.
    fn from_object(object: &Map<String, Value>, path: &Path) -> Self {
        let Ok(Value::Object(mut merged)) = serde_json::to_value(Self::default()) else {
            return Self::default();
        };
        for (key, value) in object {
            if !merged.contains_key(key) {
                continue;
            }
            let mut candidate = merged.clone();
            candidate.insert(key.clone(), value.clone());
            if serde_json::from_value::<Self>(Value::Object(candidate)).is_ok() {
                merged.insert(key.clone(), value.clone());
            } else {
                warn!(key = %key, %value, path = %path.display(), "ignoring invalid setting");
            }
        }
        serde_json::from_value(Value::Object(merged)).unwrap_or_default()
    }

    pub fn set_model_path(path: &Path, model_path: &Path) -> Result<Self> {
        let model_path = model_path.display().to_string();
        Self::update(path, |settings| settings.model_path = model_path)
    }

    pub fn set_custom_path(path: &Path, custom_path: &str) -> Result<Self> {
        Self::update(path, |settings| settings.custom_path = custom_path.to_owned())
    }

    pub fn set_mute(path: &Path, is_mute: bool) -> Result<Self> {
        Self::update(path, |settings| settings.is_mute = is_mute)
    }

    pub fn toggle_auto_movement(path: &Path) -> Result<Self> {
        Self::update(path, |settings| {
            settings.enabled_auto_movement = !settings.enabled_auto_movement
        })
    }

    pub fn frame_interval(&self) -> Duration {
        if self.frame_rate == 0 {
            return Duration::from_millis(1000);
        }
        Duration::from_millis(u64::from(1000 / self.frame_rate).max(1))
    }
}

/// Picks the settings file: an explicit path, then a portable `settings.json`
/// in the working directory, then the per-user config directory.
pub fn locate_settings_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let portable = PathBuf::from(SETTINGS_FILE_NAME);
    if portable.is_file() {
        return portable;
    }
    match dirs::config_dir() {
        Some(dir) => dir.join("desktop-pet").join(SETTINGS_FILE_NAME),
        None => portable,
    }
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    match serde_json::from_str::<Value>(&text)
        .with_context(|| format!("invalid json in {}", path.display()))?
    {
        Value::Object(object) => Ok(object),
        _ => anyhow::bail!("{} does not hold a json object", path.display()),
    }
}
