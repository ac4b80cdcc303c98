//! Static quad geometry shared by every pass.

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coord: [f32; 2],
}

/// Unit quad centred on the origin, drawn as a triangle strip.
///
/// Texture coordinates use a top-left origin to match how decoded rows are
/// uploaded, so the vertex at `+0.5` on y samples row zero.
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex {
        position: [-0.5, -0.5],
        tex_coord: [0.0, 1.0],
    },
    Vertex {
        position: [0.5, -0.5],
        tex_coord: [1.0, 1.0],
    },
    Vertex {
        position: [-0.5, 0.5],
        tex_coord: [0.0, 0.0],
    },
    Vertex {
        position: [0.5, 0.5],
        tex_coord: [1.0, 0.0],
    },
];

pub const QUAD_VERTEX_COUNT: u32 = QUAD_VERTICES.len() as u32;

pub(crate) const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

pub(crate) fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// Texture coordinates for a parallax pan done by shifting the sampled window.
///
/// `visible_fraction` is the share of the image width shown at once. The draw
/// path pans with the transform in [`crate::transform`] instead; this helper is
/// kept as a simpler reference for the same motion.
pub fn parallax_tex_coords(offset: f32, visible_fraction: f32) -> [[f32; 2]; 4] {
    let visible = visible_fraction.clamp(0.0, 1.0);
    let slack = 1.0 - visible;
    let left = slack * offset.clamp(0.0, 1.0);
    let right = left + visible;
    [[left, 1.0], [right, 1.0], [left, 0.0], [right, 0.0]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_unit_square() {
        let xs: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -0.5);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 0.5);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), -0.5);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 0.5);
        assert_eq!(std::mem::size_of::<Vertex>(), 16);
    }

    #[test]
    fn centred_parallax_window_is_symmetric() {
        let coords = parallax_tex_coords(0.5, 0.8);
        assert!((coords[0][0] - 0.1).abs() < 1e-6);
        assert!((coords[1][0] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn parallax_window_moves_with_offset() {
        let left = parallax_tex_coords(0.0, 0.5);
        let right = parallax_tex_coords(1.0, 0.5);
        assert_eq!(left[0][0], 0.0);
        assert_eq!(right[1][0], 1.0);
        assert_eq!(parallax_tex_coords(0.3, 1.0)[0][0], 0.0);
    }
}
