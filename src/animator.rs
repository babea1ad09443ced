//! Per-frame composition of the model matrix.
//!
//! [`FrameAnimator`] starts from a fixed pose and, every frame, folds a small
//! rotation and a small forward translation into the model matrix. Time is
//! measured in "animation units": one unit is 100 ms of wall-clock time.
//!
//! Two modes are available:
//!
//! - [`AnimationMode::Incremental`] right-multiplies per-frame deltas into the
//!   running matrix. The deltas are applied in the object's local frame, so the
//!   shape turns and drifts along a circle. Error compounds with every frame.
//! - [`AnimationMode::Absolute`] recomputes the pose from the time elapsed
//!   since the animation epoch using the closed form of the same motion, so
//!   nothing accumulates.

use std::f32::consts::{FRAC_PI_2, PI};
use std::time::{Duration, Instant};

use glam::Mat4;

use crate::affine;

/// Nanoseconds per animation time unit.
pub const NANOS_PER_UNIT: f64 = 1e8;

/// Rotation applied per animation unit, in radians.
pub const ANGULAR_RATE: f32 = PI / 12.0;

/// Forward (local +Y) distance travelled per animation unit.
pub const FORWARD_RATE: f32 = 1.0;

/// The fixed starting pose, `T0 * S0 * R0`.
pub fn initial_pose() -> Mat4 {
    let t0 = affine::translation(0.0, -0.75);
    let s0 = affine::scale(0.2, 0.2);
    let r0 = affine::rotation(-FRAC_PI_2);
    t0 * s0 * r0
}

/// Convert a wall-clock duration into animation units.
pub fn delta_units(elapsed: Duration) -> f32 {
    units(elapsed) as f32
}

fn units(elapsed: Duration) -> f64 {
    elapsed.as_nanos() as f64 / NANOS_PER_UNIT
}

/// Animation units after which heading and displacement repeat.
fn period_units() -> f64 {
    std::f64::consts::TAU / f64::from(ANGULAR_RATE)
}

/// How the model matrix advances over time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimationMode {
    /// Compose per-frame deltas into the running matrix.
    #[default]
    Incremental,
    /// Recompute the pose from total elapsed time every frame.
    Absolute,
}

impl std::str::FromStr for AnimationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incremental" => Ok(Self::Incremental),
            "absolute" => Ok(Self::Absolute),
            other => Err(format!(
                "unknown animation mode '{other}' (expected 'incremental' or 'absolute')"
            )),
        }
    }
}

/// The model matrix together with the deltas that produced its latest frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelState {
    /// Current composed model matrix.
    pub model: Mat4,
    /// Translation delta of the latest frame.
    pub translation: Mat4,
    /// Rotation delta of the latest frame.
    pub rotation: Mat4,
    /// Scale delta of the latest frame. The animation never scales after setup,
    /// so this holds the initial scale.
    pub scale: Mat4,
}

impl ModelState {
    /// State at the fixed starting pose, with the setup matrices as deltas.
    pub fn initial() -> Self {
        Self {
            model: initial_pose(),
            translation: affine::translation(0.0, -0.75),
            rotation: affine::rotation(-FRAC_PI_2),
            scale: affine::scale(0.2, 0.2),
        }
    }

    /// State wrapping an arbitrary model matrix, with identity deltas.
    pub fn from_model(model: Mat4) -> Self {
        Self {
            model,
            translation: Mat4::IDENTITY,
            rotation: Mat4::IDENTITY,
            scale: Mat4::IDENTITY,
        }
    }
}

impl Default for ModelState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Drives the model matrix from a monotonic clock.
///
/// The animator never reads the clock itself; callers pass the frame's
/// [`Instant`] so tests can feed synthetic timestamps.
#[derive(Clone, Debug)]
pub struct FrameAnimator {
    mode: AnimationMode,
    initial: ModelState,
    base: Mat4,
    state: ModelState,
    epoch: Instant,
    last: Instant,
    elapsed_units: f32,
    frame: u64,
}

impl FrameAnimator {
    /// Animator at the fixed starting pose, with its clock starting at `now`.
    pub fn new(mode: AnimationMode, now: Instant) -> Self {
        Self::from_state(mode, ModelState::initial(), now)
    }

    /// Animator starting from an arbitrary model matrix.
    pub fn with_model(mode: AnimationMode, model: Mat4, now: Instant) -> Self {
        Self::from_state(mode, ModelState::from_model(model), now)
    }

    fn from_state(mode: AnimationMode, initial: ModelState, now: Instant) -> Self {
        Self {
            mode,
            initial,
            base: initial.model,
            state: initial,
            epoch: now,
            last: now,
            elapsed_units: 0.0,
            frame: 0,
        }
    }

    pub fn mode(&self) -> AnimationMode {
        self.mode
    }

    /// Switch modes without moving the shape.
    ///
    /// Switching to [`AnimationMode::Absolute`] rebases the epoch on the current
    /// pose so the next frame continues from where the shape is now.
    pub fn set_mode(&mut self, mode: AnimationMode) {
        if mode == self.mode {
            return;
        }
        if mode == AnimationMode::Absolute {
            self.base = self.state.model;
            self.epoch = self.last;
            self.elapsed_units = 0.0;
        }
        self.mode = mode;
    }

    /// Current model matrix.
    pub fn model(&self) -> Mat4 {
        self.state.model
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    /// Number of frames advanced since construction or the last reset.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Total animation time since construction or the last reset, in units.
    pub fn elapsed_units(&self) -> f32 {
        self.elapsed_units
    }

    /// Timestamp of the last frame.
    pub fn last_time(&self) -> Instant {
        self.last
    }

    /// Advance to `now` and return the new model matrix.
    ///
    /// A timestamp earlier than the previous one counts as zero elapsed time.
    pub fn advance_to(&mut self, now: Instant) -> Mat4 {
        let delta_time = delta_units(now.saturating_duration_since(self.last));
        log::trace!(
            "frame {}: last {:?}, now {:?}, delta_time {delta_time}",
            self.frame,
            self.last,
            now
        );

        match self.mode {
            AnimationMode::Incremental => {
                self.step(delta_time);
            }
            AnimationMode::Absolute => {
                let total = units(now.saturating_duration_since(self.epoch));
                self.pose_at(total);
            }
        }

        self.last = self.last.max(now);
        self.state.model
    }

    /// Move the clock to `now` without animating, as if no time had passed.
    pub fn skip_to(&mut self, now: Instant) {
        let skipped = now.saturating_duration_since(self.last);
        self.epoch += skipped;
        self.last = self.last.max(now);
    }

    /// Apply one incremental frame of `delta_time` units, ignoring the clock.
    ///
    /// `model = model * R(ANGULAR_RATE * delta_time) * T(0, FORWARD_RATE * delta_time)`
    pub fn step(&mut self, delta_time: f32) -> Mat4 {
        self.state.rotation = affine::rotation(ANGULAR_RATE * delta_time);
        self.state.translation = affine::translation(0.0, FORWARD_RATE * delta_time);
        self.state.model = self.state.model * self.state.rotation * self.state.translation;

        self.elapsed_units += delta_time;
        self.frame += 1;
        self.state.model
    }

    /// Set the pose to where the continuous motion is after `total` units.
    ///
    /// With angular rate `w` and local forward speed `v`, the local
    /// displacement after `t` is `v * ((cos wt - 1) / w, sin wt / w)` and the
    /// heading is `wt`, so the pose is `base * T(displacement) * R(wt)`.
    /// Both repeat every `2π / w` units; `t` is reduced to one period in `f64`
    /// before it is narrowed, so long runs keep full `f32` precision.
    fn pose_at(&mut self, total: f64) {
        let phase = total.rem_euclid(period_units()) as f32;
        let angle = ANGULAR_RATE * phase;
        let (sin, cos) = angle.sin_cos();
        let dx = FORWARD_RATE * (cos - 1.0) / ANGULAR_RATE;
        let dy = FORWARD_RATE * sin / ANGULAR_RATE;

        self.state.rotation = affine::rotation(angle);
        self.state.translation = affine::translation(dx, dy);
        self.state.model = self.base * self.state.translation * self.state.rotation;

        self.elapsed_units = total as f32;
        self.frame += 1;
    }

    /// Return to the starting pose and restart the clock at `now`.
    pub fn reset(&mut self, now: Instant) {
        log::debug!("animation reset after {} frames", self.frame);
        *self = Self::from_state(self.mode, self.initial, now);
    }
}
