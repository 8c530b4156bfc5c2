// Ray casting against triangle meshes.
// Used to project the pointer onto the invisible backdrop plane.

use glam::{Mat4, Vec3};
use super::mesh::{GpuVertex, RenderMesh};

const EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

/// Nearest intersection along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin in world units.
    pub distance: f32,
    /// World-space intersection point.
    pub point: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction: direction.normalize_or_zero() }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Möller–Trumbore, accepting hits on either face.
    /// Returns the distance to the hit, if it lies in front of the origin.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPSILON {
            // Parallel to the triangle.
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        (t >= 0.0).then_some(t)
    }
}

/// Nearest hit of `ray` against `mesh` placed in the world by `model`.
pub fn raycast_mesh(ray: &Ray, mesh: &RenderMesh<GpuVertex>, model: Mat4) -> Option<RayHit> {
    let world = |i: u32| model.transform_point3(Vec3::from(mesh.vertices[i as usize].position));

    mesh.indices
        .chunks_exact(3)
        .filter_map(|tri| ray.intersect_triangle(world(tri[0]), world(tri[1]), world(tri[2])))
        .min_by(|a, b| a.total_cmp(b))
        .map(|distance| RayHit { distance, point: ray.at(distance) })
}
