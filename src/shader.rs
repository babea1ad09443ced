//! Compiled shader programs with named attributes and uniforms.
//!
//! A [`Shader`] pairs a vertex and a fragment WGSL module with a
//! [`ShaderLayout`] describing its inputs by name:
//!
//! - each vertex attribute reads from its own vertex buffer, bound to slot
//!   `i` and `@location(i)` in declaration order;
//! - all uniforms share one buffer at `@group(0) @binding(0)`, packed with
//!   WGSL alignment rules in declaration order.
//!
//! ```ignore
//! let layout = ShaderLayout::new()
//!     .attribute("a_position", wgpu::VertexFormat::Float32x4)
//!     .attribute("a_colour", wgpu::VertexFormat::Float32x3)
//!     .uniform("u_modelMatrix", UniformKind::Mat4);
//!
//! let shader = Shader::new(&gpu, "triangles", vertex_src, fragment_src, layout)?;
//!
//! shader.enable(&mut render_pass);
//! shader.set_attribute(&mut render_pass, "a_position", &positions)?;
//! shader.set_uniform(&gpu, "u_modelMatrix", model)?;
//! ```

use std::path::PathBuf;

use glam::{Mat4, Vec4};

use crate::buffers::VertexBuffer;
use crate::gpu::GpuContext;

/// Errors from loading, compiling or feeding a shader.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read shader '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("shader '{0}' failed to compile")]
    Compile(String),
    #[error("no shader source named '{0}'")]
    MissingSource(String),
    #[error("shader has no attribute named '{0}'")]
    UnknownAttribute(String),
    #[error("shader has no uniform named '{0}'")]
    UnknownUniform(String),
    #[error("attribute '{name}' expects {expected:?} but the buffer holds {actual:?}")]
    AttributeMismatch {
        name: String,
        expected: wgpu::VertexFormat,
        actual: wgpu::VertexFormat,
    },
    #[error("uniform '{name}' is a {expected:?} but a {actual:?} was given")]
    UniformMismatch {
        name: String,
        expected: UniformKind,
        actual: UniformKind,
    },
    #[error("shader '{0}' is already compiled with a different layout")]
    LayoutConflict(String),
}

/// WGSL type of a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec4,
    Mat4,
}

impl UniformKind {
    pub fn size(self) -> u64 {
        match self {
            UniformKind::Float => 4,
            UniformKind::Vec4 => 16,
            UniformKind::Mat4 => 64,
        }
    }

    pub fn align(self) -> u64 {
        match self {
            UniformKind::Float => 4,
            UniformKind::Vec4 | UniformKind::Mat4 => 16,
        }
    }
}

/// A value that can be written into a uniform slot.
pub trait UniformValue {
    const KIND: UniformKind;

    fn bytes(&self) -> Vec<u8>;
}

impl UniformValue for f32 {
    const KIND: UniformKind = UniformKind::Float;

    fn bytes(&self) -> Vec<u8> {
        self.to_ne_bytes().to_vec()
    }
}

impl UniformValue for Vec4 {
    const KIND: UniformKind = UniformKind::Vec4;

    fn bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.to_array()).to_vec()
    }
}

impl UniformValue for Mat4 {
    const KIND: UniformKind = UniformKind::Mat4;

    fn bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.to_cols_array()).to_vec()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct AttributeSlot {
    name: String,
    format: wgpu::VertexFormat,
}

#[derive(Debug, Clone, PartialEq)]
struct UniformSlot {
    name: String,
    kind: UniformKind,
    offset: u64,
}

/// Named inputs of a shader program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderLayout {
    attributes: Vec<AttributeSlot>,
    uniforms: Vec<UniformSlot>,
    uniform_end: u64,
}

impl ShaderLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the next vertex attribute.
    pub fn attribute(mut self, name: impl Into<String>, format: wgpu::VertexFormat) -> Self {
        self.attributes.push(AttributeSlot {
            name: name.into(),
            format,
        });
        self
    }

    /// Declare the next uniform.
    pub fn uniform(mut self, name: impl Into<String>, kind: UniformKind) -> Self {
        let offset = self.uniform_end.next_multiple_of(kind.align());
        self.uniform_end = offset + kind.size();
        self.uniforms.push(UniformSlot {
            name: name.into(),
            kind,
            offset,
        });
        self
    }

    /// Size of the uniform buffer, padded to 16 bytes.
    pub fn uniform_size(&self) -> u64 {
        self.uniform_end.next_multiple_of(16).max(16)
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Vertex buffer slot for attribute `name`, if `format` matches its declaration.
    pub fn attribute_slot(
        &self,
        name: &str,
        format: wgpu::VertexFormat,
    ) -> Result<u32, ShaderError> {
        let (slot, attr) = self
            .attributes
            .iter()
            .enumerate()
            .find(|(_, a)| a.name == name)
            .ok_or_else(|| ShaderError::UnknownAttribute(name.to_string()))?;

        if attr.format != format {
            return Err(ShaderError::AttributeMismatch {
                name: name.to_string(),
                expected: attr.format,
                actual: format,
            });
        }
        Ok(slot as u32)
    }

    /// Byte offset of uniform `name`, if `kind` matches its declaration.
    pub fn uniform_offset(&self, name: &str, kind: UniformKind) -> Result<u64, ShaderError> {
        let slot = self
            .uniforms
            .iter()
            .find(|u| u.name == name)
            .ok_or_else(|| ShaderError::UnknownUniform(name.to_string()))?;

        if slot.kind != kind {
            return Err(ShaderError::UniformMismatch {
                name: name.to_string(),
                expected: slot.kind,
                actual: kind,
            });
        }
        Ok(slot.offset)
    }

    fn vertex_attributes(&self) -> Vec<[wgpu::VertexAttribute; 1]> {
        self.attributes
            .iter()
            .enumerate()
            .map(|(location, a)| {
                [wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: location as u32,
                    format: a.format,
                }]
            })
            .collect()
    }
}

/// A compiled vertex + fragment program.
pub struct Shader {
    name: String,
    layout: ShaderLayout,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl Shader {
    /// Compile `vertex_source` (entry `vs`) and `fragment_source` (entry `fs`).
    ///
    /// wgpu reports WGSL errors through a panic in its default error handler;
    /// that panic is caught and returned as [`ShaderError::Compile`].
    pub fn new(
        gpu: &GpuContext,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
        layout: ShaderLayout,
    ) -> Result<Self, ShaderError> {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            Self::create(gpu, name, vertex_source, fragment_source, layout)
        }));

        match result {
            Ok(shader) => {
                log::debug!("compiled shader '{name}'");
                Ok(shader)
            }
            Err(_) => Err(ShaderError::Compile(name.to_string())),
        }
    }

    fn create(
        gpu: &GpuContext,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
        layout: ShaderLayout,
    ) -> Self {
        let device = &gpu.device;

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Vertex Shader"),
            source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fragment Shader"),
            source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shader Uniforms"),
            size: layout.uniform_size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shader Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shader Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shader Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let attributes = layout.vertex_attributes();
        let buffers: Vec<wgpu::VertexBufferLayout> = attributes
            .iter()
            .map(|attr| wgpu::VertexBufferLayout {
                array_stride: attr[0].format.size(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attr,
            })
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(name),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("vs"),
                buffers: &buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.format(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                polygon_mode: wgpu::PolygonMode::Fill,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            name: name.to_string(),
            layout,
            pipeline,
            uniform_buffer,
            bind_group,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &ShaderLayout {
        &self.layout
    }

    /// Make this program current for subsequent draws in `render_pass`.
    pub fn enable(&self, render_pass: &mut wgpu::RenderPass) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
    }

    /// Bind `buffer` as the source of attribute `name`.
    pub fn set_attribute(
        &self,
        render_pass: &mut wgpu::RenderPass,
        name: &str,
        buffer: &VertexBuffer,
    ) -> Result<(), ShaderError> {
        let slot = self.layout.attribute_slot(name, buffer.format())?;
        render_pass.set_vertex_buffer(slot, buffer.buffer().slice(..));
        Ok(())
    }

    /// Write `value` into uniform `name`.
    pub fn set_uniform<T: UniformValue>(
        &self,
        gpu: &GpuContext,
        name: &str,
        value: T,
    ) -> Result<(), ShaderError> {
        let offset = self.layout.uniform_offset(name, T::KIND)?;
        gpu.queue.write_buffer(&self.uniform_buffer, offset, &value.bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_layout() -> ShaderLayout {
        ShaderLayout::new()
            .attribute("a_position", wgpu::VertexFormat::Float32x4)
            .attribute("a_colour", wgpu::VertexFormat::Float32x3)
            .uniform("u_modelMatrix", UniformKind::Mat4)
    }

    #[test]
    fn attributes_take_slots_in_order() {
        let layout = scene_layout();
        assert_eq!(
            layout
                .attribute_slot("a_position", wgpu::VertexFormat::Float32x4)
                .unwrap(),
            0
        );
        assert_eq!(
            layout
                .attribute_slot("a_colour", wgpu::VertexFormat::Float32x3)
                .unwrap(),
            1
        );
        assert_eq!(layout.attribute_count(), 2);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let layout = scene_layout();
        assert!(matches!(
            layout.attribute_slot("a_normal", wgpu::VertexFormat::Float32x3),
            Err(ShaderError::UnknownAttribute(name)) if name == "a_normal"
        ));
        assert!(matches!(
            layout.uniform_offset("u_viewMatrix", UniformKind::Mat4),
            Err(ShaderError::UnknownUniform(name)) if name == "u_viewMatrix"
        ));
    }

    #[test]
    fn mismatched_types_are_rejected() {
        let layout = scene_layout();
        assert!(matches!(
            layout.attribute_slot("a_colour", wgpu::VertexFormat::Float32x4),
            Err(ShaderError::AttributeMismatch { .. })
        ));
        assert!(matches!(
            layout.uniform_offset("u_modelMatrix", UniformKind::Vec4),
            Err(ShaderError::UniformMismatch {
                expected: UniformKind::Mat4,
                actual: UniformKind::Vec4,
                ..
            })
        ));
    }

    #[test]
    fn uniforms_follow_wgsl_alignment() {
        let layout = ShaderLayout::new()
            .uniform("u_time", UniformKind::Float)
            .uniform("u_modelMatrix", UniformKind::Mat4)
            .uniform("u_scale", UniformKind::Float)
            .uniform("u_tint", UniformKind::Vec4);

        assert_eq!(layout.uniform_offset("u_time", UniformKind::Float).unwrap(), 0);
        assert_eq!(layout.uniform_offset("u_modelMatrix", UniformKind::Mat4).unwrap(), 16);
        assert_eq!(layout.uniform_offset("u_scale", UniformKind::Float).unwrap(), 80);
        assert_eq!(layout.uniform_offset("u_tint", UniformKind::Vec4).unwrap(), 96);
        assert_eq!(layout.uniform_size(), 112);
    }

    #[test]
    fn layouts_compare_by_declarations() {
        assert_eq!(scene_layout(), scene_layout());
        assert_ne!(
            scene_layout(),
            scene_layout().uniform("u_tint", UniformKind::Vec4)
        );
    }

    #[test]
    fn empty_layout_still_has_a_uniform_block() {
        assert_eq!(ShaderLayout::new().uniform_size(), 16);
        assert_eq!(scene_layout().uniform_size(), 64);
    }

    #[test]
    fn matrix_bytes_are_column_major() {
        let m = Mat4::from_cols_array(&[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        ]);
        let bytes = m.bytes();
        assert_eq!(bytes.len(), 64);
        let floats: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes[..]);
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[12], 13.0);
    }
}
