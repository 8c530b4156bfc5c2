// Perspective camera + orbit controls
//
// Camera model:
//   - An eye position looking at a target point, +Y up
//   - Vertical field of view in degrees, aspect = surface width / height
//   - Left-drag orbits the eye around the target on a sphere
//   - Mouse wheel dollies toward / away from the target

use glam::{Mat4, Vec2, Vec3};
use super::input::InputState;
use super::raycast::Ray;

pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Width / height of the drawing surface. Set by `Experience::resize`.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    pub position: Vec3,
    pub target: Vec3,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
        }
    }

    /// View matrix: looks from the eye toward the target.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    /// Perspective projection matrix (wgpu depth range 0..1).
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray from the eye through a point in normalised device coordinates
    /// (x right, y up, both in [-1, 1]).
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let through = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.5));
        Ray::new(self.position, through - self.position)
    }
}

// ============================================================================
// ORBIT CONTROLS
// ============================================================================

pub struct OrbitControls {
    /// Radians of orbit per window-height of drag, divided by 2π.
    pub rotate_speed: f32,
    /// Distance multiplier per scroll line (< 1 zooms in on scroll up).
    pub dolly_scale: f32,
    /// 1.0 keeps the point under the cursor at target depth fixed to the cursor.
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Keeps the polar angle this far from the poles so look_at stays defined.
    pub polar_margin: f32,
}

impl OrbitControls {
    pub fn new() -> Self {
        Self {
            rotate_speed: 1.0,
            dolly_scale: 0.95,
            pan_speed: 1.0,
            min_distance: 0.1,
            max_distance: 50.0,
            polar_margin: 1e-3,
        }
    }

    /// Apply this frame's drag and scroll to the camera. Call once per frame
    /// before the view-projection is read.
    pub fn update(&self, camera: &mut PerspectiveCamera, input: &InputState) {
        let height = input.window_size.1.max(1) as f32;

        if input.is_pan_drag() && input.mouse_delta != (0.0, 0.0) {
            self.pan(camera, input.mouse_delta, height);
        }

        let (dx, dy) = if input.is_orbit_drag() { input.mouse_delta } else { (0.0, 0.0) };
        if dx == 0.0 && dy == 0.0 && input.scroll_delta == 0.0 {
            return;
        }

        let offset = camera.position - camera.target;

        // Spherical coordinates about +Y: theta around the axis, phi from the pole.
        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius.max(f32::EPSILON)).clamp(-1.0, 1.0).acos();

        theta -= std::f32::consts::TAU * dx / height * self.rotate_speed;
        phi -= std::f32::consts::TAU * dy / height * self.rotate_speed;
        phi = phi.clamp(self.polar_margin, std::f32::consts::PI - self.polar_margin);

        // Scroll up (positive) zooms in.
        radius *= self.dolly_scale.powf(input.scroll_delta);
        radius = radius.clamp(self.min_distance, self.max_distance);

        camera.position = camera.target + Vec3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
    }

    /// Translate eye and target together in the view plane.
    fn pan(&self, camera: &mut PerspectiveCamera, (dx, dy): (f32, f32), height: f32) {
        let offset = camera.position - camera.target;
        let forward = -offset.normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);

        // World units per pixel at the target's depth.
        let half_height = offset.length() * (camera.fov.to_radians() * 0.5).tan();
        let scale = 2.0 * half_height / height * self.pan_speed;

        let shift = (-right * dx + up * dy) * scale;
        camera.position += shift;
        camera.target += shift;
    }
}
