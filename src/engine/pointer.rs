// Pointer state: raw screen position, its projection onto the backdrop
// plane, and the elastic follower that trails it.

use glam::{Mat4, Vec2};
use super::camera::PerspectiveCamera;
use super::follower::ElasticFollower;
use super::mesh::{GpuVertex, RenderMesh};
use super::raycast::raycast_mesh;

#[derive(Debug, Clone, Copy, Default)]
pub struct PointerState {
    /// Last cursor position in physical pixels, origin top-left.
    pub screen: Vec2,
    /// World-space X/Y the follower is pulled toward.
    pub raw_target: Vec2,
    pub follower: ElasticFollower,
}

impl PointerState {
    /// Record a cursor move. Moves between frames coalesce: only the latest
    /// target is seen by the next frame.
    pub fn moved(&mut self, screen: Vec2, raw_target: Vec2) {
        self.screen = screen;
        self.raw_target = raw_target;
    }

    /// One follower integration step toward the latest target.
    pub fn step(&mut self) {
        self.follower.step(self.raw_target);
    }
}

/// Screen pixels → normalised device coordinates (x right, y up).
pub fn screen_to_ndc(screen: Vec2, surface: (u32, u32)) -> Vec2 {
    let w = surface.0.max(1) as f32;
    let h = surface.1.max(1) as f32;
    Vec2::new(screen.x / w * 2.0 - 1.0, -(screen.y / h) * 2.0 + 1.0)
}

/// World X/Y under the cursor on the target mesh, or the NDC coordinates
/// themselves when the ray misses it. Hits past the far plane are not drawn
/// and count as misses.
pub fn project_pointer(
    screen: Vec2,
    surface: (u32, u32),
    camera: &PerspectiveCamera,
    target: &RenderMesh<GpuVertex>,
    model: Mat4,
) -> Vec2 {
    let ndc = screen_to_ndc(screen, surface);
    let ray = camera.ray_from_ndc(ndc);
    match raycast_mesh(&ray, target, model) {
        Some(hit) if hit.distance <= camera.far => hit.point.truncate(),
        _ => ndc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use approx::assert_relative_eq;
    use crate::engine::mesh::plane_geometry;

    fn camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(70.0, 800.0 / 600.0, 0.1, 1000.0);
        camera.position = Vec3::new(0.0, 0.0, 2.0);
        camera
    }

    #[test]
    fn test_screen_to_ndc_corners() {
        assert_eq!(screen_to_ndc(Vec2::new(0.0, 0.0), (800, 600)), Vec2::new(-1.0, 1.0));
        assert_eq!(screen_to_ndc(Vec2::new(800.0, 600.0), (800, 600)), Vec2::new(1.0, -1.0));
        assert_eq!(screen_to_ndc(Vec2::new(400.0, 300.0), (800, 600)), Vec2::ZERO);
    }

    #[test]
    fn test_center_of_screen_projects_to_origin() {
        let plane = plane_geometry(Vec2::new(10.0, 10.0), 1, 1);
        let p = project_pointer(Vec2::new(400.0, 300.0), (800, 600), &camera(), &plane, Mat4::IDENTITY);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_top_right_projects_onto_frustum_edge() {
        let plane = plane_geometry(Vec2::new(10.0, 10.0), 1, 1);
        let p = project_pointer(Vec2::new(800.0, 0.0), (800, 600), &camera(), &plane, Mat4::IDENTITY);
        let half_h = 2.0 * 35.0_f32.to_radians().tan();
        assert_relative_eq!(p.y, half_h, epsilon = 1e-4);
        assert_relative_eq!(p.x, half_h * 800.0 / 600.0, epsilon = 1e-4);
    }

    #[test]
    fn test_miss_falls_back_to_ndc() {
        let plane = plane_geometry(Vec2::new(10.0, 10.0), 1, 1);
        let mut camera = camera();
        // Look away from the plane.
        camera.target = Vec3::new(0.0, 0.0, 5.0);
        let p = project_pointer(Vec2::new(200.0, 150.0), (800, 600), &camera, &plane, Mat4::IDENTITY);
        assert_eq!(p, Vec2::new(-0.5, 0.5));
    }

    #[test]
    fn test_hit_beyond_far_plane_is_a_miss() {
        let plane = plane_geometry(Vec2::new(10.0, 10.0), 1, 1);
        let mut camera = camera();
        camera.far = 1.5;
        let p = project_pointer(Vec2::new(600.0, 450.0), (800, 600), &camera, &plane, Mat4::IDENTITY);
        assert_eq!(p, Vec2::new(0.5, -0.5));
    }

    #[test]
    fn test_moved_overwrites_previous_target() {
        let mut pointer = PointerState::default();
        pointer.moved(Vec2::new(1.0, 2.0), Vec2::new(0.1, 0.2));
        pointer.moved(Vec2::new(3.0, 4.0), Vec2::new(0.3, 0.4));
        assert_eq!(pointer.screen, Vec2::new(3.0, 4.0));
        assert_eq!(pointer.raw_target, Vec2::new(0.3, 0.4));
    }
}
