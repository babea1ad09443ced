//! The two-triangle scene.
//!
//! Four vertices shared by two triangles form an arrowhead pointing along +Y:
//!
//! ```text
//!          (0,1)
//!           /|\
//!          / | \
//!         /  |  \
//!        / (0,0) \
//!       /   / \   \
//!      /  /     \  \
//!     / /         \ \
//!    //             \\
//! (-1,-1)          (1,-1)
//! ```
//!
//! The tip and centre are magenta, the left corner red, the right corner blue.

use std::time::Instant;

use glam::Mat4;

use crate::animator::{AnimationMode, FrameAnimator};
use crate::buffers::{self, IndexBuffer, VertexBuffer};
use crate::gpu::GpuContext;
use crate::shader::{ShaderError, ShaderLayout, UniformKind};
use crate::shader_library::{FRAGMENT_SHADER, ShaderId, ShaderLibrary, VERTEX_SHADER};

/// Homogeneous vertex positions.
pub const VERTICES: [[f32; 4]; 4] = [
    [0.0, 0.0, 0.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
    [-1.0, -1.0, 0.0, 1.0],
    [1.0, -1.0, 0.0, 1.0],
];

pub const MAGENTA: [f32; 3] = [1.0, 0.0, 1.0];
pub const RED: [f32; 3] = [1.0, 0.0, 0.0];
pub const BLUE: [f32; 3] = [0.0, 0.0, 1.0];

/// Per-vertex colours.
pub const COLOURS: [[f32; 3]; 4] = [MAGENTA, MAGENTA, RED, BLUE];

/// Left triangle, then right triangle.
pub const INDICES: [u32; 6] = [0, 1, 2, 0, 1, 3];

pub const POSITION_ATTRIBUTE: &str = "a_position";
pub const COLOUR_ATTRIBUTE: &str = "a_colour";
pub const MODEL_MATRIX_UNIFORM: &str = "u_modelMatrix";

/// Inputs the scene's shader must declare.
pub fn shader_layout() -> ShaderLayout {
    ShaderLayout::new()
        .attribute(POSITION_ATTRIBUTE, wgpu::VertexFormat::Float32x4)
        .attribute(COLOUR_ATTRIBUTE, wgpu::VertexFormat::Float32x3)
        .uniform(MODEL_MATRIX_UNIFORM, UniformKind::Mat4)
}

/// GPU resources and animation state for the two triangles.
pub struct Scene {
    shaders: ShaderLibrary,
    shader: ShaderId,
    positions: VertexBuffer,
    colours: VertexBuffer,
    indices: IndexBuffer,
    animator: FrameAnimator,
    paused: bool,
}

impl Scene {
    /// Upload the geometry, compile the shader and start the animation clock.
    pub fn new(
        gpu: &GpuContext,
        mut shaders: ShaderLibrary,
        mode: AnimationMode,
    ) -> Result<Self, ShaderError> {
        let shader = shaders.compile_shader(gpu, VERTEX_SHADER, FRAGMENT_SHADER, shader_layout())?;

        let positions = buffers::create_buffer(gpu, "Scene Positions", &VERTICES);
        let colours = buffers::create_buffer(gpu, "Scene Colours", &COLOURS);
        let indices = buffers::create_index_buffer(gpu, "Scene Indices", &INDICES);

        Ok(Self {
            shaders,
            shader,
            positions,
            colours,
            indices,
            animator: FrameAnimator::new(mode, Instant::now()),
            paused: false,
        })
    }

    /// Record this frame's draw into `render_pass`, then advance the animation.
    ///
    /// The uniform is written before the update, so each frame shows the pose
    /// computed at the end of the previous one.
    pub fn draw(
        &mut self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass,
    ) -> Result<(), ShaderError> {
        self.shaders.check_reload(gpu);

        let shader = self.shaders.get(self.shader);
        shader.enable(render_pass);
        shader.set_attribute(render_pass, POSITION_ATTRIBUTE, &self.positions)?;
        shader.set_attribute(render_pass, COLOUR_ATTRIBUTE, &self.colours)?;
        shader.set_uniform(gpu, MODEL_MATRIX_UNIFORM, self.animator.model())?;

        let now = Instant::now();
        if self.paused {
            self.animator.skip_to(now);
        } else {
            self.animator.advance_to(now);
        }

        self.indices.bind(render_pass);
        render_pass.draw_indexed(0..self.indices.len(), 0, 0..1);
        Ok(())
    }

    pub fn model(&self) -> Mat4 {
        self.animator.model()
    }

    pub fn animator(&self) -> &FrameAnimator {
        &self.animator
    }

    /// Return to the starting pose.
    pub fn reset(&mut self) {
        self.animator.reset(Instant::now());
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        log::info!("animation {}", if self.paused { "paused" } else { "resumed" });
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
