//! Turns green- or red-screen character footage into transparent frames.
//!
//! Input is a folder of already decoded frames (for example exported with
//! `ffmpeg -i clip.webm frames/%04d.png`). Every kept frame is written as
//! `frame_NNNN.png`, numbered by its position in the source folder.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use image::{Rgba, RgbaImage};
use tracing::{debug, info};

/// Hue, saturation and value on the 0..180 / 0..255 / 0..255 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    const fn new(lower: (u8, u8, u8), upper: (u8, u8, u8)) -> Self {
        Self {
            lower: Hsv {
                h: lower.0,
                s: lower.1,
                v: lower.2,
            },
            upper: Hsv {
                h: upper.0,
                s: upper.1,
                v: upper.2,
            },
        }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&hsv.h)
            && (self.lower.s..=self.upper.s).contains(&hsv.s)
            && (self.lower.v..=self.upper.v).contains(&hsv.v)
    }
}

const GREEN_RANGES: &[HsvRange] = &[HsvRange::new((35, 100, 100), (85, 255, 255))];
const RED_RANGES: &[HsvRange] = &[
    HsvRange::new((0, 100, 100), (10, 255, 255)),
    HsvRange::new((170, 100, 100), (180, 255, 255)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyColor {
    Green,
    Red,
}

impl KeyColor {
    pub fn ranges(self) -> &'static [HsvRange] {
        match self {
            KeyColor::Green => GREEN_RANGES,
            KeyColor::Red => RED_RANGES,
        }
    }

    pub fn is_keyed(self, rgb: [u8; 3]) -> bool {
        let hsv = rgb_to_hsv(rgb);
        self.ranges().iter().any(|range| range.contains(hsv))
    }
}

pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> Hsv {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };
    let mut h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv {
        h: (h / 2.0).round().clamp(0.0, 180.0) as u8,
        s: s.round().clamp(0.0, 255.0) as u8,
        v: max as u8,
    }
}

/// Clears the alpha of every keyed pixel and makes the rest fully opaque.
pub fn key_image(image: &mut RgbaImage, color: KeyColor) -> usize {
    let mut cleared = 0;
    for Rgba([r, g, b, a]) in image.pixels_mut() {
        if color.is_keyed([*r, *g, *b]) {
            *a = 0;
            cleared += 1;
        } else {
            *a = 255;
        }
    }
    cleared
}

#[derive(Debug, Clone)]
pub struct KeyJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub color: KeyColor,
    pub frame_skip: usize,
}

pub fn frame_file_name(index: usize) -> String {
    format!("frame_{index:04}.png")
}

fn list_source_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed listing frames in {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| {
                        ["png", "jpg", "jpeg", "bmp"]
                            .iter()
                            .any(|known| ext.eq_ignore_ascii_case(known))
                    })
                    .unwrap_or(false)
        })
        .collect();
    frames.sort();
    Ok(frames)
}

/// Runs the job and returns how many frames were written.
pub fn run(job: &KeyJob) -> Result<usize> {
    let sources = list_source_frames(&job.input)?;
    fs::create_dir_all(&job.output)
        .with_context(|| format!("failed creating {}", job.output.display()))?;

    let skip = job.frame_skip.max(1);
    let total = sources.len().div_ceil(skip);
    info!(
        input = %job.input.display(),
        output = %job.output.display(),
        color = ?job.color,
        total,
        "keying frames"
    );

    let mut written = 0;
    for (index, source) in sources.iter().enumerate() {
        if index % skip != 0 {
            continue;
        }
        let mut image = image::open(source)
            .with_context(|| format!("failed decoding {}", source.display()))?
            .to_rgba8();
        let cleared = key_image(&mut image, job.color);
        let target = job.output.join(frame_file_name(index));
        image
            .save(&target)
            .with_context(|| format!("failed writing {}", target.display()))?;
        written += 1;
        debug!(source = %source.display(), cleared, "keyed frame");
        if written % 50 == 0 || written == total {
            info!(done = written, total, "processing frames");
        }
    }
    Ok(written)
}
