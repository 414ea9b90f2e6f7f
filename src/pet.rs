//! Behaviour of the pet: which state it is in, which frame comes next, and
//! what the window shell has to do as a consequence.

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use rand::Rng;
use tracing::debug;

use crate::frames::{FrameSequence, ModelAssets};

/// Idle time after which the pet gets stunned.
pub const STUN_AFTER: Duration = Duration::from_secs(30);
/// Idle time after which a stunned pet falls asleep.
pub const SLEEP_AFTER: Duration = Duration::from_secs(60);
/// Minimum gap between two automatic walks.
pub const AUTO_MOVE_COOLDOWN: Duration = Duration::from_secs(5);
/// Chance per idle tick of starting an automatic walk.
pub const AUTO_MOVE_CHANCE: f64 = 0.001;
/// Horizontal pixels travelled per move tick.
pub const MOVE_STEP: f32 = 1.0;
/// The pet only walks while this much room is left before the screen edge.
pub const EDGE_MARGIN: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PetState {
    Start,
    Idle,
    Interact,
    Move,
    Stun,
    Sleep,
    Relax,
}

impl PetState {
    pub const ALL: [PetState; 7] = [
        PetState::Start,
        PetState::Idle,
        PetState::Interact,
        PetState::Move,
        PetState::Stun,
        PetState::Sleep,
        PetState::Relax,
    ];

    pub fn folder_name(self) -> &'static str {
        match self {
            PetState::Start => "start",
            PetState::Idle => "idle",
            PetState::Interact => "interact",
            PetState::Move => "move",
            PetState::Stun => "stun",
            PetState::Sleep => "sleep",
            PetState::Relax => "relax",
        }
    }

    /// One-shot states hand over to idle when their frames run out.
    pub fn loops(self) -> bool {
        !matches!(self, PetState::Start | PetState::Interact | PetState::Move)
    }

    fn is_dozing(self) -> bool {
        matches!(self, PetState::Stun | PetState::Sleep)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Start,
    Stun,
    Wakeup,
    Interact,
    Settings,
}

impl SoundCue {
    pub fn file_name(self) -> &'static str {
        match self {
            SoundCue::Start => "start.wav",
            SoundCue::Stun => "stun.wav",
            SoundCue::Wakeup => "wakeup.wav",
            SoundCue::Interact => "interact.wav",
            SoundCue::Settings => "settings.wav",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PetEffect {
    ShowFrame(PathBuf),
    PlaySound(SoundCue),
    MoveWindowX(f32),
    StartDrag,
    OpenSettings,
    EasterEggInteraction,
}

/// Per-tick facts the pet cannot know on its own.
#[derive(Debug, Clone, Copy)]
pub struct TickEnv {
    pub screen_width: f32,
    pub auto_movement: bool,
}

/// Where a state's frames come from. The app scans folders; tests hand out fixed lists.
pub trait FrameSource {
    fn frames_for(&self, state: PetState) -> FrameSequence;
}

impl FrameSource for ModelAssets {
    fn frames_for(&self, state: PetState) -> FrameSequence {
        FrameSequence::scan(&self.state_dir(state))
    }
}

pub struct Pet<S> {
    source: S,
    state: PetState,
    frames: FrameSequence,
    x: f32,
    last_user_action: Instant,
    last_auto_move: Option<Instant>,
}

impl<S: FrameSource> Pet<S> {
    pub fn new(source: S, x: f32, now: Instant) -> Self {
        let frames = source.frames_for(PetState::Start);
        Self {
            source,
            state: PetState::Start,
            frames,
            x,
            last_user_action: now,
            last_auto_move: None,
        }
    }

    pub fn state(&self) -> PetState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Keeps the walking position in step with a window the user dragged.
    pub fn sync_x(&mut self, x: f32) {
        self.x = x;
    }

    fn enter(&mut self, state: PetState) {
        debug!(from = ?self.state, to = ?state, "pet state change");
        self.state = state;
        self.frames = self.source.frames_for(state);
        if self.frames.is_empty() {
            debug!(?state, "state has no frames");
        }
    }

    /// Advances the animation by one frame interval.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        now: Instant,
        env: TickEnv,
        rng: &mut R,
    ) -> Vec<PetEffect> {
        let mut effects = Vec::new();
        self.check_idle_time(now, &mut effects);

        let frame = if self.state.loops() {
            self.frames.next_looping()
        } else {
            self.frames.next_once()
        }
        .map(Path::to_path_buf);

        match (self.state, frame) {
            (_, None) if !self.state.loops() => self.enter(PetState::Idle),
            (PetState::Move, Some(frame)) => {
                effects.push(PetEffect::ShowFrame(frame));
                self.x += MOVE_STEP;
                effects.push(PetEffect::MoveWindowX(self.x));
            }
            (state, frame) => {
                effects.extend(frame.map(PetEffect::ShowFrame));
                if state == PetState::Idle {
                    self.maybe_start_walking(now, env, rng);
                }
            }
        }
        effects
    }

    fn check_idle_time(&mut self, now: Instant, effects: &mut Vec<PetEffect>) {
        let idle_for = now.saturating_duration_since(self.last_user_action);
        if !self.state.is_dozing() {
            if idle_for > STUN_AFTER {
                self.enter(PetState::Stun);
                effects.push(PetEffect::PlaySound(SoundCue::Stun));
            }
        } else if self.state == PetState::Stun && idle_for > SLEEP_AFTER {
            self.enter(PetState::Sleep);
        }
    }

    fn maybe_start_walking<R: Rng + ?Sized>(&mut self, now: Instant, env: TickEnv, rng: &mut R) {
        if self.x + EDGE_MARGIN >= env.screen_width || rng.gen::<f64>() >= AUTO_MOVE_CHANCE {
            return;
        }
        if !env.auto_movement {
            return;
        }
        let cooled_down = self
            .last_auto_move
            .map(|at| now.saturating_duration_since(at) > AUTO_MOVE_COOLDOWN)
            .unwrap_or(true);
        if cooled_down {
            self.enter(PetState::Move);
            self.last_auto_move = Some(now);
        }
    }

    /// Reacts to a mouse button pressed over the pet.
    pub fn press(&mut self, button: PetButton, now: Instant) -> Vec<PetEffect> {
        self.last_user_action = now;
        let mut effects = Vec::new();

        if button == PetButton::Secondary {
            self.enter(PetState::Relax);
            effects.push(PetEffect::PlaySound(SoundCue::Settings));
            effects.push(PetEffect::OpenSettings);
        } else if self.state.is_dozing() {
            self.enter(PetState::Idle);
            effects.push(PetEffect::PlaySound(SoundCue::Wakeup));
        } else if button == PetButton::Primary {
            effects.push(PetEffect::StartDrag);
            if self.state == PetState::Idle {
                self.enter(PetState::Interact);
                effects.push(PetEffect::EasterEggInteraction);
                effects.push(PetEffect::PlaySound(SoundCue::Interact));
            }
        } else {
            self.enter(PetState::Move);
        }
        effects
    }

    pub fn settings_closed(&mut self) {
        self.enter(PetState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        path::PathBuf,
        time::{Duration, Instant},
    };

    use rand::{rngs::StdRng, SeedableRng};

    use super::{
        FrameSource, Pet, PetButton, PetEffect, PetState, SoundCue, TickEnv, AUTO_MOVE_COOLDOWN,
    };
    use crate::frames::FrameSequence;

    struct FixedFrames(HashMap<PetState, usize>);

    impl FixedFrames {
        fn uniform(count: usize) -> Self {
            Self(PetState::ALL.iter().map(|state| (*state, count)).collect())
        }
    }

    impl FrameSource for FixedFrames {
        fn frames_for(&self, state: PetState) -> FrameSequence {
            let count = self.0.get(&state).copied().unwrap_or(0);
            FrameSequence::new(
                (0..count)
                    .map(|i| PathBuf::from(format!("{}/frame_{i:04}.png", state.folder_name())))
                    .collect(),
            )
        }
    }

    /// Always rolls zero, so every idle tick wants to walk.
    struct ZeroRng;

    impl rand::RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            dest.fill(0);
            Ok(())
        }
    }

    const ENV: TickEnv = TickEnv {
        screen_width: 1920.0,
        auto_movement: false,
    };

    const WALK_ENV: TickEnv = TickEnv {
        auto_movement: true,
        ..ENV
    };

    fn frames_shown(effects: &[PetEffect]) -> Vec<PathBuf> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                PetEffect::ShowFrame(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    fn idle_pet(now: Instant) -> Pet<FixedFrames> {
        let mut pet = Pet::new(FixedFrames::uniform(2), 100.0, now);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..3 {
            pet.tick(now, ENV, &mut rng);
        }
        assert_eq!(pet.state(), PetState::Idle);
        pet
    }

    #[test]
    fn start_sequence_plays_once_then_idles() {
        let now = Instant::now();
        let mut pet = Pet::new(FixedFrames::uniform(2), 100.0, now);
        let mut rng = StdRng::seed_from_u64(1);

        let first = pet.tick(now, ENV, &mut rng);
        assert_eq!(frames_shown(&first), vec![PathBuf::from("start/frame_0000.png")]);
        pet.tick(now, ENV, &mut rng);
        assert_eq!(pet.state(), PetState::Start);
        let handover = pet.tick(now, ENV, &mut rng);
        assert!(frames_shown(&handover).is_empty());
        assert_eq!(pet.state(), PetState::Idle);

        let idle = pet.tick(now, ENV, &mut rng);
        assert_eq!(frames_shown(&idle), vec![PathBuf::from("idle/frame_0000.png")]);
    }

    #[test]
    fn idle_loops_over_its_frames() {
        let now = Instant::now();
        let mut pet = idle_pet(now);
        let mut rng = StdRng::seed_from_u64(9);
        let shown: Vec<PathBuf> = (0..3)
            .flat_map(|_| frames_shown(&pet.tick(now, ENV, &mut rng)))
            .collect();
        assert_eq!(
            shown,
            vec![
                PathBuf::from("idle/frame_0000.png"),
                PathBuf::from("idle/frame_0001.png"),
                PathBuf::from("idle/frame_0000.png"),
            ]
        );
    }

    #[test]
    fn long_idle_stuns_then_sleeps() {
        let start = Instant::now();
        let mut pet = idle_pet(start);
        let mut rng = StdRng::seed_from_u64(5);

        let calm = pet.tick(start + Duration::from_secs(30), ENV, &mut rng);
        assert_eq!(pet.state(), PetState::Idle);
        assert!(!calm.contains(&PetEffect::PlaySound(SoundCue::Stun)));

        let stunned = pet.tick(start + Duration::from_secs(31), ENV, &mut rng);
        assert_eq!(pet.state(), PetState::Stun);
        assert!(stunned.contains(&PetEffect::PlaySound(SoundCue::Stun)));
        assert_eq!(frames_shown(&stunned), vec![PathBuf::from("stun/frame_0000.png")]);

        pet.tick(start + Duration::from_secs(45), ENV, &mut rng);
        assert_eq!(pet.state(), PetState::Stun);

        let asleep = pet.tick(start + Duration::from_secs(61), ENV, &mut rng);
        assert_eq!(pet.state(), PetState::Sleep);
        assert!(!asleep.iter().any(|e| matches!(e, PetEffect::PlaySound(_))));

        pet.tick(start + Duration::from_secs(600), ENV, &mut rng);
        assert_eq!(pet.state(), PetState::Sleep);
    }

    #[test]
    fn click_wakes_a_sleeping_pet() {
        let start = Instant::now();
        let mut pet = idle_pet(start);
        let mut rng = StdRng::seed_from_u64(5);
        pet.tick(start + Duration::from_secs(31), ENV, &mut rng);
        pet.tick(start + Duration::from_secs(62), ENV, &mut rng);
        assert_eq!(pet.state(), PetState::Sleep);

        let woke = pet.press(PetButton::Primary, start + Duration::from_secs(70));
        assert_eq!(pet.state(), PetState::Idle);
        assert_eq!(woke, vec![PetEffect::PlaySound(SoundCue::Wakeup)]);

        pet.tick(start + Duration::from_secs(90), ENV, &mut rng);
        assert_eq!(pet.state(), PetState::Idle);
    }

    #[test]
    fn middle_click_does_not_walk_while_stunned() {
        let start = Instant::now();
        let mut pet = idle_pet(start);
        let mut rng = StdRng::seed_from_u64(5);
        pet.tick(start + Duration::from_secs(31), ENV, &mut rng);
        let effects = pet.press(PetButton::Middle, start + Duration::from_secs(32));
        assert_eq!(pet.state(), PetState::Idle);
        assert_eq!(effects, vec![PetEffect::PlaySound(SoundCue::Wakeup)]);
    }

    #[test]
    fn left_click_on_idle_interacts_once() {
        let now = Instant::now();
        let mut pet = idle_pet(now);
        let mut rng = StdRng::seed_from_u64(2);

        let effects = pet.press(PetButton::Primary, now);
        assert_eq!(pet.state(), PetState::Interact);
        assert!(effects.contains(&PetEffect::StartDrag));
        assert!(effects.contains(&PetEffect::EasterEggInteraction));
        assert!(effects.contains(&PetEffect::PlaySound(SoundCue::Interact)));

        let again = pet.press(PetButton::Primary, now);
        assert_eq!(again, vec![PetEffect::StartDrag]);

        for _ in 0..3 {
            pet.tick(now, ENV, &mut rng);
        }
        assert_eq!(pet.state(), PetState::Idle);
    }

    #[test]
    fn right_click_relaxes_and_opens_settings() {
        let now = Instant::now();
        let mut pet = idle_pet(now);
        let mut rng = StdRng::seed_from_u64(2);

        let effects = pet.press(PetButton::Secondary, now);
        assert_eq!(pet.state(), PetState::Relax);
        assert_eq!(
            effects,
            vec![
                PetEffect::PlaySound(SoundCue::Settings),
                PetEffect::OpenSettings
            ]
        );
        for _ in 0..5 {
            pet.tick(now, ENV, &mut rng);
        }
        assert_eq!(pet.state(), PetState::Relax);

        pet.settings_closed();
        assert_eq!(pet.state(), PetState::Idle);
    }

    #[test]
    fn middle_click_walks_to_the_right() {
        let now = Instant::now();
        let mut pet = idle_pet(now);
        let mut rng = StdRng::seed_from_u64(2);

        pet.press(PetButton::Middle, now);
        assert_eq!(pet.state(), PetState::Move);
        let first = pet.tick(now, ENV, &mut rng);
        assert!(first.contains(&PetEffect::MoveWindowX(101.0)));
        let second = pet.tick(now, ENV, &mut rng);
        assert!(second.contains(&PetEffect::MoveWindowX(102.0)));
        pet.tick(now, ENV, &mut rng);
        assert_eq!(pet.state(), PetState::Idle);
        assert_eq!(pet.x, 102.0);
    }

    #[test]
    fn auto_walk_respects_flag_edge_and_cooldown() {
        let now = Instant::now();

        let mut disabled = idle_pet(now);
        disabled.tick(now, ENV, &mut ZeroRng);
        assert_eq!(disabled.state(), PetState::Idle);

        let mut at_edge = idle_pet(now);
        let narrow = TickEnv {
            screen_width: 200.0,
            ..WALK_ENV
        };
        at_edge.tick(now, narrow, &mut ZeroRng);
        assert_eq!(at_edge.state(), PetState::Idle);

        let mut walker = idle_pet(now);
        walker.tick(now, WALK_ENV, &mut ZeroRng);
        assert_eq!(walker.state(), PetState::Move);
        for _ in 0..3 {
            walker.tick(now, WALK_ENV, &mut ZeroRng);
        }
        assert_eq!(walker.state(), PetState::Idle);

        walker.tick(now + Duration::from_secs(1), WALK_ENV, &mut ZeroRng);
        assert_eq!(walker.state(), PetState::Idle);

        let later = now + AUTO_MOVE_COOLDOWN + Duration::from_secs(1);
        walker.press(PetButton::Secondary, later);
        walker.settings_closed();
        walker.tick(later, WALK_ENV, &mut ZeroRng);
        assert_eq!(walker.state(), PetState::Move);
    }

    #[test]
    fn empty_folders_never_panic() {
        let now = Instant::now();
        let mut pet = Pet::new(FixedFrames::uniform(0), 0.0, now);
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..4 {
            pet.tick(now, ENV, &mut rng);
        }
        assert_eq!(pet.state(), PetState::Idle);
        pet.press(PetButton::Secondary, now);
        assert!(frames_shown(&pet.tick(now, ENV, &mut rng)).is_empty());
    }

    #[test]
    fn sync_x_follows_dragged_window() {
        let now = Instant::now();
        let mut pet = idle_pet(now);
        pet.sync_x(640.0);
        pet.press(PetButton::Middle, now);
        let mut rng = StdRng::seed_from_u64(8);
        let effects = pet.tick(now, ENV, &mut rng);
        assert!(effects.contains(&PetEffect::MoveWindowX(641.0)));
    }
}
