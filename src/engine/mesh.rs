// Procedural mesh types and geometry builders.
//
// Two vertex layouts:
//   GpuVertex  : position / normal / uv            (plane, light sphere)
//   TubeVertex : position / normal / tangent / uv  (curl tubes)
//
// All builders emit indexed triangle lists with u32 indices. Surfaces are
// drawn double-sided, so winding only matters for normals.

use std::f32::consts::{PI, TAU};
use glam::{Vec2, Vec3};
use super::spline::CatmullRomCurve;

// ============================================================================
// GPU VERTICES
// ============================================================================

/// Vertex for flat-shaded surfaces.
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
///   @location(2) uv:       vec2<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
    pub uv:       [f32; 2],
}

impl GpuVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Vertex for swept tubes; carries the path tangent so the shader can light
/// the filament along its direction of travel.
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
///   @location(2) tangent:  vec3<f32>
///   @location(3) uv:       vec2<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TubeVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
    pub tangent:  [f32; 3],
    pub uv:       [f32; 2],
}

impl TubeVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const F3: wgpu::BufferAddress = std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress;
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TubeVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute { offset: 0,      shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
                wgpu::VertexAttribute { offset: F3,     shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
                wgpu::VertexAttribute { offset: F3 * 2, shader_location: 2, format: wgpu::VertexFormat::Float32x3 },
                wgpu::VertexAttribute { offset: F3 * 3, shader_location: 3, format: wgpu::VertexFormat::Float32x2 },
            ],
        }
    }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// GPU-ready indexed triangle mesh.
/// Upload vertex_bytes() to a VERTEX buffer, index_bytes() to an INDEX buffer.
#[derive(Clone, Debug)]
pub struct RenderMesh<V> {
    pub vertices: Vec<V>,
    pub indices:  Vec<u32>,
}

impl<V: bytemuck::Pod> RenderMesh<V> {
    /// Cast vertex slice to raw bytes for wgpu buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Cast index slice to raw bytes for wgpu buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn vertex_count(&self) -> usize { self.vertices.len() }
    pub fn index_count(&self) -> usize  { self.indices.len() }
}

/// Quad grid indices for a (rows + 1) × (cols + 1) vertex lattice.
/// Each cell [a b c d] becomes triangles (a, b, d) and (b, c, d).
fn grid_indices(rows: u32, cols: u32) -> Vec<u32> {
    let stride = cols + 1;
    let mut indices = Vec::with_capacity((rows * cols * 6) as usize);
    for r in 0..rows {
        for c in 0..cols {
            let a = r * stride + c;
            let b = (r + 1) * stride + c;
            let cc = (r + 1) * stride + c + 1;
            let d = r * stride + c + 1;
            indices.extend_from_slice(&[a, b, d, b, cc, d]);
        }
    }
    indices
}

// ============================================================================
// PLANE
// ============================================================================

/// Axis-aligned plane in the XY plane, centred on the origin, facing +Z.
pub fn plane_geometry(size: Vec2, segments_x: u32, segments_y: u32) -> RenderMesh<GpuVertex> {
    let half = size * 0.5;
    let seg_w = size.x / segments_x as f32;
    let seg_h = size.y / segments_y as f32;

    let mut vertices = Vec::with_capacity(((segments_x + 1) * (segments_y + 1)) as usize);
    for iy in 0..=segments_y {
        let y = iy as f32 * seg_h - half.y;
        for ix in 0..=segments_x {
            let x = ix as f32 * seg_w - half.x;
            vertices.push(GpuVertex {
                position: [x, -y, 0.0],
                normal:   [0.0, 0.0, 1.0],
                uv:       [ix as f32 / segments_x as f32, 1.0 - iy as f32 / segments_y as f32],
            });
        }
    }

    RenderMesh { vertices, indices: grid_indices(segments_y, segments_x) }
}

// ============================================================================
// UV SPHERE
// ============================================================================

/// UV sphere centred on the origin. Pole rows emit a single triangle per cell.
pub fn sphere_geometry(radius: f32, width_segments: u32, height_segments: u32) -> RenderMesh<GpuVertex> {
    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let theta = v * PI;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * TAU;
            let p = Vec3::new(
                -radius * phi.cos() * theta.sin(),
                radius * theta.cos(),
                radius * phi.sin() * theta.sin(),
            );
            vertices.push(GpuVertex {
                position: p.to_array(),
                normal:   p.normalize_or_zero().to_array(),
                uv:       [u, 1.0 - v],
            });
        }
    }

    let stride = width_segments + 1;
    let mut indices = Vec::new();
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * stride + ix + 1;
            let b = iy * stride + ix;
            let c = (iy + 1) * stride + ix;
            let d = (iy + 1) * stride + ix + 1;
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    RenderMesh { vertices, indices }
}

// ============================================================================
// TUBE
// ============================================================================

/// Sweep a circle of `radius` along `curve`.
///
/// Produces `tubular_segments + 1` rings of `radial_segments + 1` vertices
/// (the seam vertex is duplicated for clean uvs). Rings sit at evenly spaced
/// arc length and are oriented by the curve's parallel-transport frames.
/// Ends are left open.
pub fn tube_geometry(
    curve: &CatmullRomCurve,
    tubular_segments: u32,
    radius: f32,
    radial_segments: u32,
) -> RenderMesh<TubeVertex> {
    let frames = curve.frenet_frames(tubular_segments as usize);
    let ring = (radial_segments + 1) as usize;
    let mut vertices = Vec::with_capacity((tubular_segments as usize + 1) * ring);

    for i in 0..=tubular_segments as usize {
        let u = i as f32 / tubular_segments as f32;
        let center = curve.point_at(u);
        let n = frames.normals[i];
        let b = frames.binormals[i];
        let tangent = frames.tangents[i];

        for j in 0..=radial_segments {
            let angle = j as f32 / radial_segments as f32 * TAU;
            let normal = (-angle.cos() * n + angle.sin() * b).normalize_or_zero();
            vertices.push(TubeVertex {
                position: (center + radius * normal).to_array(),
                normal:   normal.to_array(),
                tangent:  tangent.to_array(),
                uv:       [u, j as f32 / radial_segments as f32],
            });
        }
    }

    RenderMesh { vertices, indices: grid_indices(tubular_segments, radial_segments) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_counts_and_extent() {
        let plane = plane_geometry(Vec2::new(10.0, 10.0), 1, 1);
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.index_count(), 6);
        for v in &plane.vertices {
            assert_eq!(v.position[0].abs(), 5.0);
            assert_eq!(v.position[1].abs(), 5.0);
            assert_eq!(v.position[2], 0.0);
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_sphere_vertices_lie_on_radius() {
        let sphere = sphere_geometry(0.02, 20, 20);
        assert_eq!(sphere.vertex_count(), 21 * 21);
        // Two pole rows emit one triangle per cell instead of two.
        assert_eq!(sphere.index_count(), (20 * 20 * 2 - 2 * 20) * 3);
        for v in &sphere.vertices {
            assert_relative_eq!(Vec3::from(v.position).length(), 0.02, epsilon = 1e-6);
        }
        assert!(sphere.indices.iter().all(|&i| (i as usize) < sphere.vertex_count()));
    }

    #[test]
    fn test_tube_rings_surround_the_curve() {
        let points: Vec<Vec3> = (0..30)
            .map(|i| Vec3::new(i as f32 * 0.01, (i as f32 * 0.2).sin() * 0.05, 0.0))
            .collect();
        let curve = CatmullRomCurve::new(points);
        let tube = tube_geometry(&curve, 300, 0.005, 8);

        assert_eq!(tube.vertex_count(), 301 * 9);
        assert_eq!(tube.index_count(), 300 * 8 * 6);
        assert!(tube.indices.iter().all(|&i| (i as usize) < tube.vertex_count()));

        for (i, ring) in tube.vertices.chunks(9).enumerate() {
            let center = curve.point_at(i as f32 / 300.0);
            for v in ring {
                let offset = Vec3::from(v.position) - center;
                assert_relative_eq!(offset.length(), 0.005, epsilon = 1e-5);
                // Ring lies in the plane perpendicular to the tangent.
                assert!(offset.normalize().dot(Vec3::from(v.tangent)).abs() < 1e-2);
            }
        }
    }

    #[test]
    fn test_tube_seam_is_duplicated() {
        let curve = CatmullRomCurve::new(vec![Vec3::ZERO, Vec3::X, Vec3::new(2.0, 1.0, 0.0)]);
        let tube = tube_geometry(&curve, 10, 0.1, 8);
        for ring in tube.vertices.chunks(9) {
            let first = Vec3::from(ring[0].position);
            let last = Vec3::from(ring[8].position);
            assert!(first.distance(last) < 1e-5);
            assert_eq!(ring[0].uv[1], 0.0);
            assert_eq!(ring[8].uv[1], 1.0);
        }
    }
}
