// Renderer seam: what a frame asks the backend to draw.
//
// The composite is described as data (COMPOSITE_PLAN) rather than as a
// sequence of clear calls: the backdrop pass clears colour and depth, the
// foreground pass keeps the colour but clears depth so it always lands on top.

use glam::{Mat4, Vec3};
use super::scene::Scenes;

// ============================================================================
// UNIFORMS
// ============================================================================

/// Shared by the plane and tube programs. Updated in place every frame.
///
/// WGSL layout:
///   view_proj: mat4x4<f32>   offset  0
///   light:     vec3<f32>     offset 64
///   time:      f32           offset 76
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light: [f32; 3],
    pub time: f32,
}

impl MaterialUniforms {
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            light: [0.0; 3],
            time: 0.0,
        }
    }

    pub fn update(&mut self, view_proj: Mat4, light: Vec3, time: f32) {
        self.view_proj = view_proj.to_cols_array_2d();
        self.light = light.to_array();
        self.time = time;
    }
}

/// Per-entity uniforms for the unlit program.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BasicUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

// ============================================================================
// COMPOSITE PLAN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneLayer {
    Backdrop,
    Foreground,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorLoad {
    Clear([f64; 4]),
    Keep,
}

/// One render pass of the composite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositePass {
    pub label: &'static str,
    pub layer: SceneLayer,
    pub color: ColorLoad,
    /// Depth is cleared at the start of every pass; this records that explicitly.
    pub clear_depth: bool,
}

pub const CLEAR_COLOR: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

pub const COMPOSITE_PLAN: [CompositePass; 2] = [
    CompositePass {
        label: "Backdrop Pass",
        layer: SceneLayer::Backdrop,
        color: ColorLoad::Clear(CLEAR_COLOR),
        clear_depth: true,
    },
    CompositePass {
        label: "Foreground Pass",
        layer: SceneLayer::Foreground,
        color: ColorLoad::Keep,
        clear_depth: true,
    },
];

// ============================================================================
// FRAME
// ============================================================================

/// Per-frame numbers shown by the debug overlay.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub fps: u32,
    pub frame_time_ms: f32,
    pub elapsed: f32,
    pub tube_count: usize,
    pub follower: (f32, f32),
    pub playing: bool,
}

/// Everything the backend needs to draw one frame.
pub struct FrameContext<'a> {
    pub scenes: &'a Scenes,
    pub passes: &'a [CompositePass],
    pub plane_uniforms: &'a MaterialUniforms,
    pub tube_uniforms: &'a MaterialUniforms,
    pub view_proj: Mat4,
    pub stats: &'a FrameStats,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface does not support any texture format")]
    NoSurfaceFormat,
    #[error("GPU out of memory")]
    OutOfMemory,
}

/// A drawing surface the experience renders into.
pub trait Renderer {
    /// Resize the drawing surface in physical pixels.
    fn set_size(&mut self, width: u32, height: u32);

    /// Current drawing surface size in physical pixels.
    fn size(&self) -> (u32, u32);

    /// Allocate GPU resources for every renderable in both scenes.
    fn upload(&mut self, scenes: &Scenes);

    /// Draw one frame following `frame.passes` in order.
    fn render(&mut self, frame: &FrameContext<'_>) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 80);
        assert_eq!(std::mem::offset_of!(MaterialUniforms, light), 64);
        assert_eq!(std::mem::offset_of!(MaterialUniforms, time), 76);
        assert_eq!(std::mem::size_of::<BasicUniforms>(), 144);
    }

    #[test]
    fn test_update_overwrites_in_place() {
        let mut uniforms = MaterialUniforms::new();
        uniforms.update(Mat4::from_scale(Vec3::splat(2.0)), Vec3::new(1.0, 2.0, 3.0), 4.5);
        assert_eq!(uniforms.light, [1.0, 2.0, 3.0]);
        assert_eq!(uniforms.time, 4.5);
        assert_eq!(uniforms.view_proj[0][0], 2.0);
    }

    #[test]
    fn test_plan_draws_backdrop_then_foreground_over_it() {
        assert_eq!(COMPOSITE_PLAN[0].layer, SceneLayer::Backdrop);
        assert_eq!(COMPOSITE_PLAN[0].color, ColorLoad::Clear(CLEAR_COLOR));
        assert_eq!(COMPOSITE_PLAN[1].layer, SceneLayer::Foreground);
        assert_eq!(COMPOSITE_PLAN[1].color, ColorLoad::Keep);
        assert!(COMPOSITE_PLAN.iter().all(|p| p.clear_depth));
    }
}
