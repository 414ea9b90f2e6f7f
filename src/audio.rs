use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::mpsc::{self, Sender},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SoundRequest {
    pub path: PathBuf,
    pub volume: f32,
    pub dedupe_key: Option<String>,
    pub dedupe_window_ms: u64,
}

impl SoundRequest {
    pub fn new(path: PathBuf, volume: f32) -> Self {
        Self {
            path,
            volume,
            dedupe_key: None,
            dedupe_window_ms: 0,
        }
    }

    /// Drops repeats of the same key arriving within `window_ms`.
    pub fn deduped(mut self, key: impl Into<String>, window_ms: u64) -> Self {
        self.dedupe_key = Some(key.into());
        self.dedupe_window_ms = window_ms;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MusicRequest {
    path: PathBuf,
    volume: f32,
    paused: bool,
}

#[derive(Debug, Clone)]
enum AudioCommand {
    Effect(SoundRequest),
    StartMusic(MusicRequest),
    PauseMusic,
    ResumeMusic,
    StopMusic,
}

/// Background music, either playing or waiting for an output device.
#[derive(Default)]
struct MusicSlot {
    playing: Option<Sink>,
    pending: Option<MusicRequest>,
}

impl MusicSlot {
    fn request(&mut self, req: MusicRequest) {
        if let Some(old) = self.playing.take() {
            old.stop();
        }
        self.pending = Some(req);
    }

    fn set_paused(&mut self, paused: bool) {
        if let Some(sink) = self.playing.as_ref() {
            if paused {
                sink.pause();
            } else {
                sink.play();
            }
        }
        if let Some(req) = self.pending.as_mut() {
            req.paused = paused;
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.playing.take() {
            sink.stop();
        }
        self.pending = None;
    }

    /// Starts the pending track. It stays pending when the device went away.
    fn start_pending(&mut self, handle: &OutputStreamHandle) -> Result<()> {
        let Some(req) = self.pending.take() else {
            return Ok(());
        };
        match start_looped(handle, &req.path, req.volume, req.paused) {
            Ok(sink) => {
                info!(path = %req.path.display(), paused = req.paused, "background music loaded");
                self.playing = Some(sink);
                Ok(())
            }
            Err(err) => {
                if is_device_error(&err) {
                    self.pending = Some(req);
                }
                Err(err)
            }
        }
    }
}

/// Handle to the audio thread. Cloning shares the same thread.
#[derive(Clone)]
pub struct AudioPlayer {
    tx: Sender<AudioCommand>,
}

impl AudioPlayer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<AudioCommand>();
        thread::spawn(move || {
            let mut output = OutputStream::try_default().ok();
            if output.is_none() {
                warn!("audio output unavailable; sounds disabled until a device is available");
            }
            let mut active_sinks: Vec<Sink> = Vec::new();
            let mut music = MusicSlot::default();
            let mut dedupe_until: HashMap<String, Instant> = HashMap::new();

            while let Ok(command) = rx.recv() {
                let now = Instant::now();
                dedupe_until.retain(|_, until| *until > now);
                active_sinks.retain(|sink| !sink.empty());

                let effect = match command {
                    AudioCommand::Effect(req) => Some(req),
                    AudioCommand::StartMusic(req) => {
                        music.request(req);
                        None
                    }
                    AudioCommand::PauseMusic => {
                        music.set_paused(true);
                        None
                    }
                    AudioCommand::ResumeMusic => {
                        music.set_paused(false);
                        None
                    }
                    AudioCommand::StopMusic => {
                        music.stop();
                        None
                    }
                };

                if output.is_none() {
                    output = OutputStream::try_default().ok();
                    if output.is_none() {
                        continue;
                    }
                }
                let Some((_, handle)) = output.as_ref() else {
                    continue;
                };

                if let Err(err) = music.start_pending(handle) {
                    warn!(?err, "failed starting background music");
                    if is_device_error(&err) {
                        output = None;
                        continue;
                    }
                }

                let Some(req) = effect else {
                    continue;
                };
                if let Some(key) = req.dedupe_key.as_ref() {
                    if dedupe_until
                        .get(key)
                        .map(|until| *until > now)
                        .unwrap_or(false)
                    {
                        debug!(key = %key, "skipping duplicate sound");
                        continue;
                    }
                }
                match play_effect(handle, &req) {
                    Ok(sink) => {
                        active_sinks.push(sink);
                        if let Some(key) = req.dedupe_key {
                            let window = Duration::from_millis(req.dedupe_window_ms.max(50));
                            dedupe_until.insert(key, now + window);
                        }
                    }
                    Err(err) => {
                        debug!(?err, path = %req.path.display(), "failed playing sound");
                        if is_device_error(&err) {
                            output = None;
                        }
                    }
                }
            }
        });
        Self { tx }
    }

    pub fn play(&self, req: SoundRequest) {
        let _ = self.tx.send(AudioCommand::Effect(req));
    }

    /// Loads `path` as looping background music, replacing any current track.
    pub fn start_music(&self, path: PathBuf, volume: f32, paused: bool) {
        let _ = self.tx.send(AudioCommand::StartMusic(MusicRequest {
            path,
            volume,
            paused,
        }));
    }

    pub fn pause_music(&self) {
        let _ = self.tx.send(AudioCommand::PauseMusic);
    }

    pub fn resume_music(&self) {
        let _ = self.tx.send(AudioCommand::ResumeMusic);
    }

    pub fn stop_music(&self) {
        let _ = self.tx.send(AudioCommand::StopMusic);
    }
}

#[derive(Debug)]
struct DeviceError(rodio::PlayError);

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "audio sink unavailable: {}", self.0)
    }
}

impl std::error::Error for DeviceError {}

fn is_device_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DeviceError>().is_some()
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file =
        File::open(path).with_context(|| format!("failed opening sound {}", path.display()))?;
    Decoder::new(BufReader::new(file))
        .with_context(|| format!("failed decoding sound {}", path.display()))
}

fn play_effect(handle: &OutputStreamHandle, req: &SoundRequest) -> Result<Sink> {
    let decoder = open_decoder(&req.path)?;
    let sink = Sink::try_new(handle).map_err(DeviceError)?;
    sink.set_volume(clamp_volume(req.volume));
    sink.append(decoder);
    Ok(sink)
}

fn start_looped(handle: &OutputStreamHandle, path: &Path, volume: f32, paused: bool) -> Result<Sink> {
    let file =
        File::open(path).with_context(|| format!("failed opening music {}", path.display()))?;
    let decoder = Decoder::new_looped(BufReader::new(file))
        .with_context(|| format!("failed decoding music {}", path.display()))?;
    let sink = Sink::try_new(handle).map_err(DeviceError)?;
    sink.set_volume(clamp_volume(volume));
    if paused {
        sink.pause();
    }
    sink.append(decoder);
    Ok(sink)
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 2.0)
    } else {
        1.0
    }
}

/// Plays one file on the calling thread and returns once it has finished.
pub fn play_blocking(path: &Path, volume: f32) -> Result<()> {
    let (_stream, handle) =
        OutputStream::try_default().context("no audio output device available")?;
    let decoder = open_decoder(path)?;
    let sink = Sink::try_new(&handle).context("failed creating audio sink")?;
    sink.set_volume(clamp_volume(volume));
    sink.append(decoder);
    info!(path = %path.display(), "playing sound");
    sink.sleep_until_end();
    Ok(())
}
