pub mod settings_page;
pub mod theme;

use crate::config::PetSettings;

/// What the user asked the settings panel to do this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelAction {
    Close,
    ChangeModel,
    ConfirmRestart,
    OpenTaskManager,
    OpenDesktop,
    StartCustom(String),
    ToggleMute,
    ToggleAutoMovement,
    QuitApp,
}

pub struct SettingsPanel {
    pub model_path: String,
    pub custom_path_input: String,
    pub is_mute: bool,
    pub auto_movement: bool,
    pub status: Option<String>,
    pub restart_notice: bool,
}

impl SettingsPanel {
    pub fn new(settings: &PetSettings) -> Self {
        Self {
            model_path: settings.model_path.clone(),
            custom_path_input: settings.custom_path.clone(),
            is_mute: settings.is_mute,
            auto_movement: settings.enabled_auto_movement,
            status: None,
            restart_notice: false,
        }
    }

    pub fn mute_label(&self) -> &'static str {
        if self.is_mute {
            "Play Bgm"
        } else {
            "Mute"
        }
    }

    pub fn auto_movement_label(&self) -> &'static str {
        if self.auto_movement {
            "Auto-walk enabled"
        } else {
            "Auto-walk disabled"
        }
    }
}
