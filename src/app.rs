use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use eframe::egui::{self, Color32, Pos2, Rect, TextureHandle, TextureOptions};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, warn};

use crate::{
    audio::{AudioPlayer, SoundRequest},
    config::PetSettings,
    easter_egg::{self, EasterEggStore},
    frames::{fit_frame, load_color_image, ModelAssets, FRAME_OFFSET},
    panel::{settings_page, PanelAction, SettingsPanel},
    pet::{Pet, PetButton, PetEffect, PetState, SoundCue, TickEnv},
    system,
};

/// Ticks run back to back at most this many times per repaint.
const MAX_CATCH_UP_TICKS: u32 = 4;
const TEXTURE_CACHE_LIMIT: usize = 512;
const RESTART_GRACE: Duration = Duration::from_secs(1);
const FALLBACK_SCREEN_WIDTH: f32 = 1920.0;
pub const START_POSITION: Pos2 = Pos2::new(1000.0, 500.0);
const SETTINGS_PANEL_SIZE: [f32; 2] = [300.0, 430.0];

pub struct PetApp {
    pet: Pet<ModelAssets>,
    settings: PetSettings,
    settings_path: PathBuf,
    eggs: Option<EasterEggStore>,
    audio: AudioPlayer,
    rng: StdRng,
    textures: HashMap<PathBuf, Option<TextureHandle>>,
    current_frame: Option<PathBuf>,
    last_update: Instant,
    tick_backlog: Duration,
    window_pos: Pos2,
    screen_width: f32,
    panel: Option<SettingsPanel>,
    quit_at: Option<Instant>,
}

impl PetApp {
    pub fn new(settings: PetSettings, settings_path: PathBuf) -> Self {
        let now = Instant::now();
        let assets = ModelAssets::new(&settings.model_path);
        info!(model = %assets.root().display(), settings = %settings_path.display(), "starting pet");

        let eggs_path = settings_path
            .parent()
            .map(|dir| dir.join(easter_egg::EASTER_EGG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(easter_egg::EASTER_EGG_FILE_NAME));
        let eggs = match EasterEggStore::load_or_create(&eggs_path) {
            Ok(store) => {
                info!(path = %store.path().display(), count = store.interact_count(), "loaded easter eggs");
                Some(store)
            }
            Err(err) => {
                warn!(?err, "easter eggs disabled");
                None
            }
        };

        for state in PetState::ALL {
            let dir = assets.state_dir(state);
            if !dir.is_dir() {
                warn!(?state, dir = %dir.display(), "model is missing a frame folder");
            }
        }

        let audio = AudioPlayer::new();
        audio.start_music(assets.bgm_path(), settings.bgm_volume, settings.is_mute);
        audio.play(SoundRequest::new(
            assets.sound_path(SoundCue::Start),
            settings.effects_volume,
        ));

        Self {
            pet: Pet::new(assets, START_POSITION.x, now),
            settings,
            settings_path,
            eggs,
            audio,
            rng: StdRng::from_entropy(),
            textures: HashMap::new(),
            current_frame: None,
            last_update: now,
            tick_backlog: Duration::ZERO,
            window_pos: START_POSITION,
            screen_width: FALLBACK_SCREEN_WIDTH,
            panel: None,
            quit_at: None,
        }
    }

    fn sync_viewport_info(&mut self, ctx: &egui::Context) {
        let (outer, monitor) = ctx.input(|i| (i.viewport().outer_rect, i.viewport().monitor_size));
        if let Some(monitor) = monitor.filter(|size| size.x > 0.0) {
            self.screen_width = monitor.x;
        }
        if let Some(outer) = outer {
            self.window_pos.y = outer.min.y;
            // While walking the pet drives the window, otherwise the window may have been dragged.
            if self.pet.state() != PetState::Move {
                self.window_pos.x = outer.min.x;
                self.pet.sync_x(outer.min.x);
            }
        }
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, now: Instant) {
        let pressed: Vec<PetButton> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::PointerButton {
                        button,
                        pressed: true,
                        ..
                    } => pet_button(*button),
                    _ => None,
                })
                .collect()
        });
        for button in pressed {
            let effects = self.pet.press(button, now);
            self.apply_effects(ctx, effects);
        }
    }

    fn run_ticks(&mut self, ctx: &egui::Context, now: Instant) {
        let interval = self.settings.frame_interval();
        self.tick_backlog += now.saturating_duration_since(self.last_update);
        self.last_update = now;

        let mut ticks = 0;
        while self.tick_backlog >= interval && ticks < MAX_CATCH_UP_TICKS {
            self.tick_backlog -= interval;
            ticks += 1;
            let env = TickEnv {
                screen_width: self.screen_width,
                auto_movement: self.settings.enabled_auto_movement,
            };
            let effects = self.pet.tick(now, env, &mut self.rng);
            self.apply_effects(ctx, effects);
        }
        if self.tick_backlog >= interval {
            self.tick_backlog = Duration::ZERO;
        }
    }

    fn apply_effects(&mut self, ctx: &egui::Context, effects: Vec<PetEffect>) {
        for effect in effects {
            match effect {
                PetEffect::ShowFrame(path) => self.current_frame = Some(path),
                PetEffect::PlaySound(cue) => self.play_cue(cue),
                PetEffect::MoveWindowX(x) => {
                    self.window_pos.x = x;
                    ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(self.window_pos));
                }
                PetEffect::StartDrag => ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag),
                PetEffect::OpenSettings => {
                    if self.panel.is_none() {
                        self.panel = Some(SettingsPanel::new(&self.settings));
                    }
                }
                PetEffect::EasterEggInteraction => self.record_interaction(),
            }
        }
    }

    fn play_cue(&self, cue: SoundCue) {
        let request = SoundRequest::new(
            self.pet.source().sound_path(cue),
            self.settings.effects_volume,
        )
        .deduped(cue.file_name(), 200);
        self.audio.play(request);
    }

    fn record_interaction(&mut self) {
        let Some(store) = self.eggs.as_mut() else {
            return;
        };
        match store.record_interaction(&mut self.rng) {
            Ok(Some(egg)) => {
                let Some(dir) = easter_egg::desktop_dir() else {
                    warn!("no desktop folder to deliver easter egg to");
                    return;
                };
                if let Err(err) = easter_egg::deliver(&egg, &dir) {
                    warn!(?err, "failed delivering easter egg");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(?err, "failed saving interaction count"),
        }
    }

    fn draw_pet(&mut self, ctx: &egui::Context) {
        let texture = self
            .current_frame
            .clone()
            .and_then(|path| self.load_texture(ctx, &path));

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let Some(texture) = texture else {
                    return;
                };
                let size = fit_frame(texture.size_vec2());
                let rect = Rect::from_min_size(Pos2::ZERO + FRAME_OFFSET, size);
                ui.painter().image(
                    texture.id(),
                    rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );
            });
    }

    fn load_texture(&mut self, ctx: &egui::Context, path: &Path) -> Option<TextureHandle> {
        if let Some(existing) = self.textures.get(path) {
            return existing.clone();
        }
        if self.textures.len() >= TEXTURE_CACHE_LIMIT {
            self.textures.clear();
        }
        let texture = load_color_image(path).map(|image| {
            ctx.load_texture(
                format!("frame://{}", path.display()),
                image,
                TextureOptions::LINEAR,
            )
        });
        if texture.is_none() {
            warn!(path = %path.display(), "frame could not be loaded");
        }
        self.textures.insert(path.to_path_buf(), texture.clone());
        texture
    }

    fn draw_settings_panel(&mut self, ctx: &egui::Context) {
        let Some(panel) = self.panel.as_mut() else {
            return;
        };
        let actions = ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of("settings_panel"),
            egui::ViewportBuilder::default()
                .with_title("Settings")
                .with_inner_size(SETTINGS_PANEL_SIZE)
                .with_decorations(false)
                .with_transparent(true)
                .with_resizable(false)
                .with_always_on_top(),
            |ctx, _class| settings_page::draw(panel, ctx),
        );
        for action in actions {
            self.handle_panel_action(ctx, action);
        }
    }

    fn handle_panel_action(&mut self, ctx: &egui::Context, action: PanelAction) {
        let result: Result<Option<String>, String> = match action {
            PanelAction::Close => {
                self.panel = None;
                self.pet.settings_closed();
                return;
            }
            PanelAction::ChangeModel => self.pick_model_folder(),
            PanelAction::ConfirmRestart => self.restart(),
            PanelAction::OpenTaskManager => system::open_task_manager().map(|_| None),
            PanelAction::OpenDesktop => system::open_desktop_folder().map(|_| None),
            PanelAction::StartCustom(command) => self.start_custom(&command),
            PanelAction::ToggleMute => self.toggle_mute(),
            PanelAction::ToggleAutoMovement => PetSettings::toggle_auto_movement(&self.settings_path)
                .map_err(|err| format!("saving auto-walk failed: {err:#}"))
                .and_then(|saved| {
                    self.settings.enabled_auto_movement = saved.enabled_auto_movement;
                    if let Some(panel) = self.panel.as_mut() {
                        panel.auto_movement = saved.enabled_auto_movement;
                    }
                    self.restart()
                }),
            PanelAction::QuitApp => {
                ctx.send_viewport_cmd_to(egui::ViewportId::ROOT, egui::ViewportCommand::Close);
                return;
            }
        };
        if let Some(panel) = self.panel.as_mut() {
            match result {
                Ok(Some(status)) => panel.status = Some(status),
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, "settings action failed");
                    panel.status = Some(err);
                }
            }
        }
    }

    fn pick_model_folder(&mut self) -> Result<Option<String>, String> {
        let Some(folder) = rfd::FileDialog::new()
            .set_title("Choose a model folder")
            .set_directory(&self.settings.model_path)
            .pick_folder()
        else {
            return Ok(None);
        };
        info!(folder = %folder.display(), "model folder chosen");
        let saved = PetSettings::set_model_path(&self.settings_path, &folder)
            .map_err(|err| format!("saving model failed: {err:#}"))?;
        self.settings.model_path = saved.model_path.clone();
        if let Some(panel) = self.panel.as_mut() {
            panel.model_path = saved.model_path;
            panel.restart_notice = true;
        }
        Ok(None)
    }

    fn start_custom(&mut self, command: &str) -> Result<Option<String>, String> {
        let saved = PetSettings::set_custom_path(&self.settings_path, command)
            .map_err(|err| format!("saving custom path failed: {err:#}"))?;
        self.settings.custom_path = saved.custom_path;
        system::launch_custom_command(command)?;
        Ok(Some(format!("Started {}", command.trim())))
    }

    fn toggle_mute(&mut self) -> Result<Option<String>, String> {
        let is_mute = !self.settings.is_mute;
        let saved = PetSettings::set_mute(&self.settings_path, is_mute)
            .map_err(|err| format!("saving mute failed: {err:#}"))?;
        self.settings.is_mute = saved.is_mute;
        if saved.is_mute {
            self.audio.pause_music();
        } else {
            self.audio.resume_music();
        }
        if let Some(panel) = self.panel.as_mut() {
            panel.is_mute = saved.is_mute;
        }
        Ok(None)
    }

    fn restart(&mut self) -> Result<Option<String>, String> {
        system::restart_self()?;
        self.quit_at = Some(Instant::now() + RESTART_GRACE);
        Ok(Some("Restarting...".to_owned()))
    }
}

fn pet_button(button: egui::PointerButton) -> Option<PetButton> {
    match button {
        egui::PointerButton::Primary => Some(PetButton::Primary),
        egui::PointerButton::Secondary => Some(PetButton::Secondary),
        egui::PointerButton::Middle => Some(PetButton::Middle),
        egui::PointerButton::Extra1 | egui::PointerButton::Extra2 => None,
    }
}

impl eframe::App for PetApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        self.sync_viewport_info(ctx);
        self.handle_pointer(ctx, now);
        self.run_ticks(ctx, now);
        self.draw_pet(ctx);
        self.draw_settings_panel(ctx);

        if self.quit_at.is_some_and(|at| now >= at) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        ctx.request_repaint_after(self.settings.frame_interval());
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0, 0.0, 0.0, 0.0]
    }
}

impl Drop for PetApp {
    fn drop(&mut self) {
        self.audio.stop_music();
    }
}
