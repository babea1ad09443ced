//! # Twirl
//!
//! Two coloured triangles, one shared vertex set, and a model matrix built
//! from 2D affine pieces.
//!
//! The interesting parts are small:
//!
//! - [`affine`] builds translation, rotation and scale matrices in homogeneous
//!   4x4 form.
//! - [`FrameAnimator`] composes them into a running model matrix every frame,
//!   either by folding in per-frame deltas or by recomputing the pose from
//!   elapsed time.
//!
//! Everything else is a thin layer over wgpu and winit: [`GpuContext`],
//! vertex/index [`buffers`], a [`Shader`] with named attributes and uniforms,
//! a [`ShaderLibrary`] cache with hot reload, the [`Scene`] and the [`run`]
//! loop.
//!
//! ```no_run
//! use twirl::{AppConfig, AnimationMode, LoggingConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     twirl::init_logging(LoggingConfig::default());
//!     twirl::run(AppConfig::new().animation(AnimationMode::Absolute))
//! }
//! ```

pub mod affine;
mod animator;
mod app;
pub mod buffers;
mod gpu;
mod logging;
pub mod scene;
mod shader;
mod shader_library;

pub use animator::{
    ANGULAR_RATE, AnimationMode, FORWARD_RATE, FrameAnimator, ModelState, NANOS_PER_UNIT,
    delta_units, initial_pose,
};
pub use app::{ANIMATION_ENV, AppConfig, SHADER_DIR_ENV, run};
pub use buffers::{IndexBuffer, VertexBuffer, VertexElement};
pub use gpu::{GpuContext, SurfaceErrorAction};
pub use logging::{DEFAULT_FILTER, LoggingConfig, init_logging};
pub use scene::{COLOURS, INDICES, Scene, VERTICES};
pub use shader::{Shader, ShaderError, ShaderLayout, UniformKind, UniformValue};
pub use shader_library::{
    FRAGMENT_SHADER, ShaderId, ShaderLibrary, ShaderSource, VERTEX_SHADER,
};

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
