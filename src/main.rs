mod app;
mod audio;
mod chroma;
mod config;
mod easter_egg;
mod frames;
mod panel;
mod pet;
mod system;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eframe::egui;
use tracing::info;

use crate::{app::PetApp, chroma::KeyColor, config::PetSettings};

#[derive(Debug, Parser)]
#[command(name = "desktop-pet", version, about = "An animated companion that lives on your desktop")]
struct Cli {
    /// Settings file to use instead of the default location.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the pet (default).
    Run,
    /// Key a green- or red-screen frame folder into transparent PNG frames.
    KeyFrames {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = KeyColor::Green)]
        key: KeyColor,
        /// Keep every Nth source frame.
        #[arg(long, default_value_t = 1)]
        frame_skip: usize,
    },
    /// Play one sound file to check the audio setup.
    PlaySound {
        file: PathBuf,
        #[arg(long, default_value_t = 1.0)]
        volume: f32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_pet(cli.settings),
        Command::KeyFrames {
            input,
            output,
            key,
            frame_skip,
        } => {
            let written = chroma::run(&chroma::KeyJob {
                input,
                output,
                color: key,
                frame_skip,
            })?;
            info!(written, "frame keying finished");
            Ok(())
        }
        Command::PlaySound { file, volume } => audio::play_blocking(&file, volume)
            .with_context(|| format!("sound test failed for {}", file.display())),
    }
}

fn run_pet(explicit_settings: Option<PathBuf>) -> Result<()> {
    let settings_path = config::locate_settings_path(explicit_settings.as_deref());
    let settings = PetSettings::load(&settings_path);

    let viewport = egui::ViewportBuilder::default()
        .with_title("Desktop Pet")
        .with_inner_size(frames::WINDOW_SIZE)
        .with_position(app::START_POSITION)
        .with_transparent(true)
        .with_decorations(false)
        .with_resizable(false)
        .with_always_on_top();

    let native_options = eframe::NativeOptions {
        viewport,
        renderer: eframe::Renderer::Glow,
        ..Default::default()
    };

    eframe::run_native(
        "Desktop Pet",
        native_options,
        Box::new(move |cc| {
            panel::theme::apply_theme(&cc.egui_ctx);
            Ok(Box::new(PetApp::new(settings, settings_path)))
        }),
    )
    .map_err(|err| anyhow::anyhow!("failed starting pet window: {err}"))?;

    Ok(())
}
