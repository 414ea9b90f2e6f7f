use std::{
    fs,
    path::{Path, PathBuf},
};

use eframe::egui::{self, Vec2};
use tracing::{debug, warn};

use crate::pet::{PetState, SoundCue};

/// Frames are scaled to fit this box, keeping their aspect ratio.
pub const FRAME_BOX: Vec2 = Vec2::new(350.0, 600.0);
/// Offset of the frame inside the pet window.
pub const FRAME_OFFSET: Vec2 = Vec2::new(100.0, 100.0);
pub const WINDOW_SIZE: Vec2 = Vec2::new(700.0, 800.0);

#[derive(Debug, Clone, Default)]
pub struct FrameSequence {
    frames: Vec<PathBuf>,
    cursor: usize,
}

impl FrameSequence {
    pub fn new(frames: Vec<PathBuf>) -> Self {
        Self { frames, cursor: 0 }
    }

    /// Lists every png in `dir`, sorted by path. An unreadable folder gives an empty sequence.
    pub fn scan(dir: &Path) -> Self {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(?err, dir = %dir.display(), "frame folder unavailable");
                return Self::default();
            }
        };
        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && is_png(path))
            .collect();
        frames.sort();
        debug!(dir = %dir.display(), count = frames.len(), "scanned frame folder");
        Self::new(frames)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.frames.len()
    }

    /// Returns the current frame and advances, or `None` once the end is reached.
    pub fn next_once(&mut self) -> Option<&Path> {
        let frame = self.frames.get(self.cursor)?;
        self.cursor += 1;
        Some(frame.as_path())
    }

    /// Like [`Self::next_once`] but starts over after the last frame.
    pub fn next_looping(&mut self) -> Option<&Path> {
        if self.is_exhausted() {
            self.cursor = 0;
        }
        self.next_once()
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}

/// Folder layout of one character model.
#[derive(Debug, Clone)]
pub struct ModelAssets {
    root: PathBuf,
}

impl ModelAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self, state: PetState) -> PathBuf {
        self.root.join(state.folder_name())
    }

    pub fn sound_path(&self, cue: SoundCue) -> PathBuf {
        self.root.join("sound").join(cue.file_name())
    }

    pub fn bgm_path(&self) -> PathBuf {
        self.root.join("sound").join("bgm.wav")
    }
}

/// Size of a frame once fitted into [`FRAME_BOX`].
pub fn fit_frame(image_size: Vec2) -> Vec2 {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return Vec2::ZERO;
    }
    let scale = (FRAME_BOX.x / image_size.x).min(FRAME_BOX.y / image_size.y);
    image_size * scale
}

pub fn load_color_image(path: &Path) -> Option<egui::ColorImage> {
    let img = match image::open(path) {
        Ok(img) => img.to_rgba8(),
        Err(err) => {
            debug!(?err, path = %path.display(), "failed decoding frame");
            return None;
        }
    };
    let size = [
        usize::try_from(img.width()).ok()?,
        usize::try_from(img.height()).ok()?,
    ];
    let pixels = img.into_raw();
    Some(egui::ColorImage::from_rgba_unmultiplied(size, &pixels))
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf, time::SystemTime};

    use eframe::egui::Vec2;

    use super::{fit_frame, FrameSequence, ModelAssets};
    use crate::pet::{PetState, SoundCue};

    fn temp_dir(tag: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("clock should be valid")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("desktop_pet_frames_{tag}_{unique}"));
        fs::create_dir_all(&dir).expect("should create temp dir");
        dir
    }

    #[test]
    fn scan_keeps_sorted_pngs_only() {
        let dir = temp_dir("scan");
        for name in ["frame_0002.png", "frame_0000.png", "notes.txt", "frame_0001.PNG"] {
            fs::write(dir.join(name), b"").expect("write");
        }
        fs::create_dir_all(dir.join("nested.png")).expect("nested dir");
        let seq = FrameSequence::scan(&dir);
        fs::remove_dir_all(&dir).ok();

        let names: Vec<String> = seq
            .frames
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, vec!["frame_0000.png", "frame_0001.PNG", "frame_0002.png"]);
    }

    #[test]
    fn missing_folder_gives_empty_sequence() {
        let mut seq = FrameSequence::scan(&std::env::temp_dir().join("desktop_pet_no_such_dir"));
        assert!(seq.is_empty());
        assert!(seq.next_looping().is_none());
        assert!(seq.next_once().is_none());
    }

    #[test]
    fn once_stops_and_looping_wraps() {
        let frames = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
        let mut once = FrameSequence::new(frames.clone());
        assert_eq!(once.next_once(), Some(PathBuf::from("a.png").as_path()));
        assert_eq!(once.next_once(), Some(PathBuf::from("b.png").as_path()));
        assert!(once.next_once().is_none());
        assert!(once.is_exhausted());

        let mut looping = FrameSequence::new(frames);
        let seen: Vec<PathBuf> = (0..5)
            .filter_map(|_| looping.next_looping().map(PathBuf::from))
            .collect();
        assert_eq!(
            seen,
            ["a.png", "b.png", "a.png", "b.png", "a.png"]
                .iter()
                .map(PathBuf::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn model_layout_paths() {
        let assets = ModelAssets::new("res/rosmontis_frames");
        assert_eq!(
            assets.state_dir(PetState::Sleep),
            PathBuf::from("res/rosmontis_frames/sleep")
        );
        assert_eq!(
            assets.sound_path(SoundCue::Wakeup),
            PathBuf::from("res/rosmontis_frames/sound/wakeup.wav")
        );
        assert_eq!(
            assets.bgm_path(),
            PathBuf::from("res/rosmontis_frames/sound/bgm.wav")
        );
    }

    #[test]
    fn fit_frame_keeps_aspect_ratio() {
        assert_eq!(fit_frame(Vec2::new(700.0, 600.0)), Vec2::new(350.0, 300.0));
        assert_eq!(fit_frame(Vec2::new(175.0, 600.0)), Vec2::new(175.0, 600.0));
        assert_eq!(fit_frame(Vec2::new(100.0, 100.0)), Vec2::new(350.0, 350.0));
        assert_eq!(fit_frame(Vec2::ZERO), Vec2::ZERO);
    }
}
