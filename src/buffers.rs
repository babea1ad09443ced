//! Uploading vertex attributes and indices to the GPU.
//!
//! Each vertex attribute lives in its own buffer (positions in one, colours in
//! another) so the shader can bind them by name. A [`VertexBuffer`] remembers
//! the element format so [`Shader::set_attribute`](crate::Shader::set_attribute)
//! can reject a buffer that does not match the attribute it is bound to.

use wgpu::util::DeviceExt;

use crate::gpu::GpuContext;

/// A plain-old-data element that maps to a single wgpu vertex format.
pub trait VertexElement: bytemuck::Pod {
    const FORMAT: wgpu::VertexFormat;
}

impl VertexElement for f32 {
    const FORMAT: wgpu::VertexFormat = wgpu::VertexFormat::Float32;
}

impl VertexElement for [f32; 2] {
    const FORMAT: wgpu::VertexFormat = wgpu::VertexFormat::Float32x2;
}

impl VertexElement for [f32; 3] {
    const FORMAT: wgpu::VertexFormat = wgpu::VertexFormat::Float32x3;
}

impl VertexElement for [f32; 4] {
    const FORMAT: wgpu::VertexFormat = wgpu::VertexFormat::Float32x4;
}

/// A GPU buffer holding one vertex attribute for every vertex.
pub struct VertexBuffer {
    buffer: wgpu::Buffer,
    format: wgpu::VertexFormat,
    len: u32,
}

impl VertexBuffer {
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Element format of every entry.
    pub fn format(&self) -> wgpu::VertexFormat {
        self.format
    }

    /// Number of vertices stored.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A GPU buffer of `u32` triangle indices.
pub struct IndexBuffer {
    buffer: wgpu::Buffer,
    len: u32,
}

impl IndexBuffer {
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of indices stored.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bind this buffer as the index source of `render_pass`.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass) {
        render_pass.set_index_buffer(self.buffer.slice(..), wgpu::IndexFormat::Uint32);
    }
}

/// Upload `data` as a vertex attribute buffer.
pub fn create_buffer<T: VertexElement>(gpu: &GpuContext, label: &str, data: &[T]) -> VertexBuffer {
    let buffer = gpu
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::VERTEX,
        });
    log::debug!(
        "uploaded vertex buffer '{label}': {} x {:?}",
        data.len(),
        T::FORMAT
    );

    VertexBuffer {
        buffer,
        format: T::FORMAT,
        len: data.len() as u32,
    }
}

/// Upload `indices` as an index buffer.
pub fn create_index_buffer(gpu: &GpuContext, label: &str, indices: &[u32]) -> IndexBuffer {
    let buffer = gpu
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
    log::debug!("uploaded index buffer '{label}': {} indices", indices.len());

    IndexBuffer {
        buffer,
        len: indices.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_formats_match_sizes() {
        fn check<T: VertexElement>() {
            assert_eq!(T::FORMAT.size() as usize, std::mem::size_of::<T>());
        }
        check::<f32>();
        check::<[f32; 2]>();
        check::<[f32; 3]>();
        check::<[f32; 4]>();
    }
}
