// The interactive scene: owns the surface, camera, both scenes, pointer
// state and the per-frame update/render loop.
//
// Frame order:
//   1. integrate the elastic follower toward the latest pointer target
//   2. move the light indicator to the follower
//   3. write time, light and view-projection into both materials in place
//   4. draw the two-pass composite
//   5. schedule the next frame if still playing

use std::sync::Arc;
use std::time::Instant;

use glam::{Vec2, Vec3};
use log::{debug, info};
use rand::Rng;

use super::camera::{OrbitControls, PerspectiveCamera};
use super::components::Tube;
use super::frame_loop::{FrameLoop, LoopState};
use super::input::InputState;
use super::pointer::{project_pointer, screen_to_ndc, PointerState};
use super::renderer::{
    FrameContext, FrameStats, MaterialUniforms, RenderError, Renderer, COMPOSITE_PLAN,
};
use super::scene::Scenes;

/// Vertical field of view in degrees.
const CAMERA_FOV: f32 = 70.0;
const CAMERA_NEAR: f32 = 0.1;
const CAMERA_FAR: f32 = 1000.0;
const CAMERA_START: Vec3 = Vec3::new(0.0, 0.0, 2.0);
/// Drawing-buffer pixels per logical pixel never exceed this.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

// ============================================================================
// MOUNT
// ============================================================================

/// The container the experience draws into.
///
/// Must report a non-zero size at construction time.
pub trait Mount {
    /// Inner size in physical pixels.
    fn inner_size(&self) -> (u32, u32);

    /// Ask the host to deliver a redraw callback at the next display refresh.
    fn request_redraw(&self);

    /// Physical pixels per logical pixel.
    fn scale_factor(&self) -> f64 {
        1.0
    }
}

impl Mount for winit::window::Window {
    fn inner_size(&self) -> (u32, u32) {
        let size = winit::window::Window::inner_size(self);
        (size.width, size.height)
    }

    fn request_redraw(&self) {
        winit::window::Window::request_redraw(self);
    }

    fn scale_factor(&self) -> f64 {
        winit::window::Window::scale_factor(self)
    }
}

impl<M: Mount + ?Sized> Mount for Arc<M> {
    fn inner_size(&self) -> (u32, u32) {
        (**self).inner_size()
    }

    fn request_redraw(&self) {
        (**self).request_redraw();
    }

    fn scale_factor(&self) -> f64 {
        (**self).scale_factor()
    }
}

/// Drawing-buffer size for a mount of `physical` pixels at `scale_factor`,
/// capped at `MAX_PIXEL_RATIO` buffer pixels per logical pixel.
pub fn surface_size(physical: (u32, u32), scale_factor: f64) -> (u32, u32) {
    if scale_factor <= MAX_PIXEL_RATIO {
        return physical;
    }
    let ratio = MAX_PIXEL_RATIO / scale_factor;
    let scale = |v: u32| ((v as f64 * ratio).round() as u32).max(1);
    (scale(physical.0), scale(physical.1))
}

/// Construction options. `dom` is the only recognised option.
pub struct ExperienceOptions<M> {
    pub dom: Option<M>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExperienceError {
    #[error("mount target is missing or has no measurable size")]
    InvalidMountTarget,
    #[error(transparent)]
    Render(#[from] RenderError),
}

// ============================================================================
// EXPERIENCE
// ============================================================================

pub struct Experience<M: Mount, R: Renderer> {
    container: M,
    /// Mount size in physical pixels; pointer positions arrive in this space.
    viewport: (u32, u32),
    renderer: R,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    scenes: Scenes,
    pointer: PointerState,
    plane_uniforms: MaterialUniforms,
    tube_uniforms: MaterialUniforms,
    frame_loop: FrameLoop,
    clock: Instant,
    stats: FrameStats,
    fps: FpsCounter,
}

impl<M: Mount, R: Renderer> Experience<M, R> {
    pub fn new(options: ExperienceOptions<M>, renderer: R) -> Result<Self, ExperienceError> {
        Self::with_rng(options, renderer, &mut rand::thread_rng())
    }

    /// Like `new`, drawing tube seeds and the noise seed from `rng`.
    pub fn with_rng<G: Rng + ?Sized>(
        options: ExperienceOptions<M>,
        mut renderer: R,
        rng: &mut G,
    ) -> Result<Self, ExperienceError> {
        let container = options.dom.ok_or(ExperienceError::InvalidMountTarget)?;
        let (width, height) = container.inner_size();
        if width == 0 || height == 0 {
            return Err(ExperienceError::InvalidMountTarget);
        }

        let (surface_w, surface_h) = surface_size((width, height), container.scale_factor());
        renderer.set_size(surface_w, surface_h);

        let mut camera = PerspectiveCamera::new(
            CAMERA_FOV,
            width as f32 / height as f32,
            CAMERA_NEAR,
            CAMERA_FAR,
        );
        camera.position = CAMERA_START;

        let scenes = Scenes::build(rng);
        renderer.upload(&scenes);

        let stats = FrameStats {
            tube_count: scenes.foreground.count::<Tube>(),
            ..FrameStats::default()
        };

        let mut experience = Self {
            container,
            viewport: (width, height),
            renderer,
            camera,
            controls: OrbitControls::new(),
            scenes,
            pointer: PointerState::default(),
            plane_uniforms: MaterialUniforms::new(),
            tube_uniforms: MaterialUniforms::new(),
            frame_loop: FrameLoop::new(),
            clock: Instant::now(),
            stats,
            fps: FpsCounter::default(),
        };

        // The loop runs from construction on.
        experience.frame_loop.play();
        experience.schedule_frame();
        info!("experience mounted at {width}x{height}");

        Ok(experience)
    }

    // ---- lifecycle ---------------------------------------------------------

    /// Start or resume rendering. Renders one frame immediately when resuming;
    /// no-op while already playing.
    pub fn play(&mut self) -> Result<(), RenderError> {
        if self.frame_loop.play() {
            debug!("play");
            self.render()?;
        }
        Ok(())
    }

    /// Halt rendering and cancel the already scheduled frame.
    pub fn stop(&mut self) {
        if let Some(handle) = self.frame_loop.stop() {
            debug!("stop: cancelled {handle:?}");
        }
    }

    pub fn state(&self) -> LoopState {
        self.frame_loop.state()
    }

    // ---- events ------------------------------------------------------------

    /// Re-measure the container and resize surface and camera to match.
    pub fn resize(&mut self) {
        let (width, height) = self.container.inner_size();
        if width == 0 || height == 0 {
            debug!("resize to {width}x{height} skipped");
            return;
        }
        let (surface_w, surface_h) = surface_size((width, height), self.container.scale_factor());
        self.viewport = (width, height);
        self.renderer.set_size(surface_w, surface_h);
        self.camera.aspect = width as f32 / height as f32;
    }

    /// Cursor moved to `screen` (physical pixels, origin top-left).
    pub fn pointer_moved(&mut self, screen: Vec2) {
        let raw = match self.scenes.ray_target_mesh() {
            Some((mesh, model)) => project_pointer(screen, self.viewport, &self.camera, mesh, model),
            None => screen_to_ndc(screen, self.viewport),
        };
        self.pointer.moved(screen, raw);
    }

    /// Apply orbit drag / dolly for this frame.
    pub fn update_controls(&mut self, input: &InputState) {
        self.controls.update(&mut self.camera, input);
    }

    /// Display refresh callback. Draws only if a frame is pending.
    pub fn on_redraw(&mut self) -> Result<(), RenderError> {
        let elapsed = self.clock.elapsed().as_secs_f32();
        self.on_redraw_at(elapsed)
    }

    /// `on_redraw` with an explicit elapsed time in seconds.
    pub fn on_redraw_at(&mut self, elapsed: f32) -> Result<(), RenderError> {
        if !self.frame_loop.begin_frame() {
            return Ok(());
        }
        self.render_at(elapsed)
    }

    // ---- frame -------------------------------------------------------------

    fn render(&mut self) -> Result<(), RenderError> {
        let elapsed = self.clock.elapsed().as_secs_f32();
        self.render_at(elapsed)
    }

    fn render_at(&mut self, elapsed: f32) -> Result<(), RenderError> {
        self.pointer.step();
        let light = self.scenes.set_light_xy(self.pointer.follower.position);

        let view_proj = self.camera.view_projection();
        self.plane_uniforms.update(view_proj, light, elapsed);
        self.tube_uniforms.update(view_proj, light, elapsed);

        self.fps.tick(elapsed, &mut self.stats);
        self.stats.elapsed = elapsed;
        self.stats.follower = self.pointer.follower.position.into();
        self.stats.playing = self.frame_loop.is_playing();

        let result = self.renderer.render(&FrameContext {
            scenes: &self.scenes,
            passes: &COMPOSITE_PLAN,
            plane_uniforms: &self.plane_uniforms,
            tube_uniforms: &self.tube_uniforms,
            view_proj,
            stats: &self.stats,
        });

        // A failed frame does not end the loop; the caller decides whether to exit.
        if self.frame_loop.is_playing() {
            self.schedule_frame();
        }
        result
    }

    fn schedule_frame(&mut self) {
        self.frame_loop.schedule();
        self.container.request_redraw();
    }

    // ---- accessors ---------------------------------------------------------

    pub fn renderer(&self) -> &R { &self.renderer }
    pub fn renderer_mut(&mut self) -> &mut R { &mut self.renderer }
}

/// Frames per second over one-second windows of elapsed time.
#[derive(Debug, Default)]
struct FpsCounter {
    frames: u32,
    window_start: f32,
    last: Option<f32>,
}

impl FpsCounter {
    fn tick(&mut self, elapsed: f32, stats: &mut FrameStats) {
        if let Some(last) = self.last {
            stats.frame_time_ms = (elapsed - last) * 1000.0;
        }
        self.last = Some(elapsed);
        self.frames += 1;

        if elapsed - self.window_start >= 1.0 {
            stats.fps = self.frames;
            debug!("FPS: {} | Tubes: {} | Passes: {}", self.frames, stats.tube_count, COMPOSITE_PLAN.len());
            self.frames = 0;
            self.window_start = elapsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use crate::engine::components::{LightIndicator, RayTarget};
    use crate::engine::renderer::SceneLayer;

    struct TestMount {
        size: Cell<(u32, u32)>,
        scale: Cell<f64>,
        redraws: Cell<u32>,
    }

    impl TestMount {
        fn new(width: u32, height: u32) -> Arc<Self> {
            Arc::new(Self {
                size: Cell::new((width, height)),
                scale: Cell::new(1.0),
                redraws: Cell::new(0),
            })
        }
    }

    impl Mount for TestMount {
        fn inner_size(&self) -> (u32, u32) {
            self.size.get()
        }

        fn request_redraw(&self) {
            self.redraws.set(self.redraws.get() + 1);
        }

        fn scale_factor(&self) -> f64 {
            self.scale.get()
        }
    }

    struct RecordedFrame {
        layers: Vec<SceneLayer>,
        light: [f32; 3],
        time: f32,
        drawables: usize,
    }

    #[derive(Default)]
    struct RecordingRenderer {
        size: (u32, u32),
        uploaded: usize,
        frames: Vec<RecordedFrame>,
        fail_next: bool,
    }

    impl Renderer for RecordingRenderer {
        fn set_size(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }

        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn upload(&mut self, scenes: &Scenes) {
            self.uploaded = scenes.backdrop.renderables().count() + scenes.foreground.renderables().count();
        }

        fn render(&mut self, frame: &FrameContext<'_>) -> Result<(), RenderError> {
            if std::mem::take(&mut self.fail_next) {
                return Err(RenderError::OutOfMemory);
            }
            assert_eq!(frame.plane_uniforms, frame.tube_uniforms);
            self.frames.push(RecordedFrame {
                layers: frame.passes.iter().map(|p| p.layer).collect(),
                light: frame.tube_uniforms.light,
                time: frame.tube_uniforms.time,
                drawables: frame.scenes.backdrop.renderables().count()
                    + frame.scenes.foreground.renderables().count(),
            });
            Ok(())
        }
    }

    fn experience(mount: &Arc<TestMount>) -> Experience<Arc<TestMount>, RecordingRenderer> {
        Experience::with_rng(
            ExperienceOptions { dom: Some(mount.clone()) },
            RecordingRenderer::default(),
            &mut StdRng::seed_from_u64(2024),
        )
        .expect("valid mount")
    }

    #[test]
    fn test_missing_mount_is_rejected() {
        let result = Experience::<Arc<TestMount>, _>::with_rng(
            ExperienceOptions { dom: None },
            RecordingRenderer::default(),
            &mut StdRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(ExperienceError::InvalidMountTarget)));
    }

    #[test]
    fn test_zero_sized_mount_is_rejected() {
        let result = Experience::with_rng(
            ExperienceOptions { dom: Some(TestMount::new(0, 600)) },
            RecordingRenderer::default(),
            &mut StdRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(ExperienceError::InvalidMountTarget)));
    }

    #[test]
    fn test_sixty_frames_end_to_end() {
        let mount = TestMount::new(800, 600);
        let mut exp = experience(&mount);

        assert_eq!(exp.renderer().size(), (800, 600));
        assert_eq!(exp.scenes.foreground.count::<Tube>(), 100);
        assert_eq!(exp.scenes.foreground.count::<LightIndicator>(), 1);
        assert_eq!(exp.scenes.backdrop.count::<RayTarget>(), 1);
        assert_eq!(exp.renderer().uploaded, 102);
        assert_eq!(exp.state(), LoopState::Playing);

        exp.pointer_moved(Vec2::new(600.0, 200.0));
        for i in 0..60 {
            exp.on_redraw_at(i as f32 / 60.0).expect("frame renders");
        }

        let frames = &exp.renderer().frames;
        assert_eq!(frames.len(), 60);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.layers, vec![SceneLayer::Backdrop, SceneLayer::Foreground]);
            assert_eq!(frame.drawables, 102);
            assert_eq!(frame.time, i as f32 / 60.0);
        }
        // Initial schedule plus one reschedule per frame.
        assert_eq!(mount.redraws.get(), 61);
    }

    #[test]
    fn test_light_follows_pointer_with_lag() {
        let mount = TestMount::new(800, 600);
        let mut exp = experience(&mount);

        exp.pointer_moved(Vec2::new(600.0, 150.0));
        let target = exp.pointer.raw_target;
        assert!(target.x > 0.0 && target.y > 0.0);

        exp.on_redraw_at(0.0).expect("frame renders");
        let first = exp.renderer().frames[0].light;
        // First frame covers 12% of the gap, not all of it.
        assert_relative_eq!(first[0], target.x * 0.12, epsilon = 1e-5);
        assert_relative_eq!(first[1], target.y * 0.12, epsilon = 1e-5);
        assert_eq!(first[2], 0.0);

        for i in 1..300 {
            exp.on_redraw_at(i as f32 / 60.0).expect("frame renders");
        }
        let last = exp.renderer().frames.last().expect("frames").light;
        assert_relative_eq!(last[0], target.x, epsilon = 1e-3);
        assert_relative_eq!(last[1], target.y, epsilon = 1e-3);
    }

    #[test]
    fn test_resize_updates_aspect_and_surface() {
        let mount = TestMount::new(800, 600);
        let mut exp = experience(&mount);
        assert_eq!(exp.camera.aspect, 800.0 / 600.0);

        mount.size.set((1024, 512));
        exp.resize();
        assert_eq!(exp.camera.aspect, 1024.0 / 512.0);
        assert_eq!(exp.renderer().size(), (1024, 512));

        // Minimised: nothing changes.
        mount.size.set((0, 0));
        exp.resize();
        assert_eq!(exp.renderer().size(), (1024, 512));
    }

    #[test]
    fn test_pointer_miss_falls_back_to_ndc() {
        let mount = TestMount::new(800, 600);
        let mut exp = experience(&mount);

        exp.pointer_moved(Vec2::new(400.0, 300.0));
        assert_relative_eq!(exp.pointer.raw_target.x, 0.0, epsilon = 1e-5);

        exp.camera.target = Vec3::new(0.0, 0.0, 10.0);
        exp.pointer_moved(Vec2::new(600.0, 450.0));
        assert_eq!(exp.pointer.raw_target, Vec2::new(0.5, -0.5));
        assert_eq!(exp.pointer.screen, Vec2::new(600.0, 450.0));
    }

    #[test]
    fn test_stop_cancels_scheduled_frame() {
        let mount = TestMount::new(800, 600);
        let mut exp = experience(&mount);

        exp.on_redraw_at(0.0).expect("frame renders");
        exp.stop();
        assert_eq!(exp.state(), LoopState::Stopped);

        // The redraw the host already queued arrives, but draws nothing.
        exp.on_redraw_at(0.016).expect("no-op");
        exp.on_redraw_at(0.033).expect("no-op");
        assert_eq!(exp.renderer().frames.len(), 1);
    }

    #[test]
    fn test_play_resumes_with_immediate_frame() {
        let mount = TestMount::new(800, 600);
        let mut exp = experience(&mount);

        exp.stop();
        exp.play().expect("frame renders");
        assert_eq!(exp.state(), LoopState::Playing);
        assert_eq!(exp.renderer().frames.len(), 1);

        // Playing again is a no-op: no extra frame, no second chain.
        exp.play().expect("no-op");
        assert_eq!(exp.renderer().frames.len(), 1);

        exp.on_redraw_at(1.0).expect("frame renders");
        exp.on_redraw_at(1.1).expect("frame renders");
        assert_eq!(exp.renderer().frames.len(), 3);
    }

    #[test]
    fn test_uniforms_track_follower_and_time() {
        let mount = TestMount::new(800, 600);
        let mut exp = experience(&mount);
        exp.pointer_moved(Vec2::new(100.0, 500.0));
        exp.on_redraw_at(2.5).expect("frame renders");

        let (plane, tubes) = (&exp.plane_uniforms, &exp.tube_uniforms);
        let follower = exp.pointer.follower.position;
        assert_eq!(plane.time, 2.5);
        assert_eq!(tubes.light, [follower.x, follower.y, 0.0]);
        assert_eq!(plane.view_proj, exp.camera.view_projection().to_cols_array_2d());
    }

    #[test]
    fn test_surface_size_caps_pixel_ratio() {
        assert_eq!(surface_size((800, 600), 1.0), (800, 600));
        assert_eq!(surface_size((1600, 1200), 2.0), (1600, 1200));
        assert_eq!(surface_size((1200, 900), 3.0), (800, 600));
        assert_eq!(surface_size((1, 1), 4.0), (1, 1));
    }

    #[test]
    fn test_high_density_mount_keeps_pointer_mapping() {
        let mount = TestMount::new(1200, 900);
        mount.scale.set(3.0);
        let mut exp = experience(&mount);
        assert_eq!(exp.renderer().size(), (800, 600));
        assert_eq!(exp.camera.aspect, 1200.0 / 900.0);

        // Cursor positions stay in physical pixels of the mount.
        exp.camera.target = Vec3::new(0.0, 0.0, 10.0);
        exp.pointer_moved(Vec2::new(900.0, 225.0));
        assert_eq!(exp.pointer.raw_target, Vec2::new(0.5, 0.5));

        mount.size.set((1500, 600));
        exp.resize();
        assert_eq!(exp.renderer().size(), (1000, 400));
        assert_eq!(exp.camera.aspect, 1500.0 / 600.0);
    }

    #[test]
    fn test_failed_frame_keeps_loop_scheduled() {
        let mount = TestMount::new(800, 600);
        let mut exp = experience(&mount);

        exp.renderer_mut().fail_next = true;
        assert!(matches!(exp.on_redraw_at(0.0), Err(RenderError::OutOfMemory)));
        assert_eq!(exp.state(), LoopState::Playing);

        exp.on_redraw_at(0.016).expect("frame renders");
        assert_eq!(exp.renderer().frames.len(), 1);
    }
}
