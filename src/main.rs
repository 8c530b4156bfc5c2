// Curl-noise filaments over a pointer-lit plane.
//
// Controls:
//   mouse move   light follows the cursor
//   left drag    orbit the camera
//   wheel        dolly
//   Space        play / stop
//   F3           debug overlay
//   Escape       quit

mod engine;

use std::sync::Arc;

use anyhow::Context as _;
use glam::Vec2;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use engine::experience::{Experience, ExperienceOptions};
use engine::gpu::GpuRenderer;
use engine::input::InputState;
use engine::renderer::{RenderError, Renderer as _};

const WINDOW_TITLE: &str = "Curl Filaments";

type GpuExperience = Experience<Arc<Window>, GpuRenderer>;

#[derive(Default)]
struct App {
    experience: Option<GpuExperience>,
    input: InputState,
    failure: Option<anyhow::Error>,
}

impl App {
    fn mount(event_loop: &ActiveEventLoop) -> anyhow::Result<GpuExperience> {
        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("failed to create window")?,
        );

        let renderer = pollster::block_on(GpuRenderer::new(window.clone()))
            .context("failed to initialise renderer")?;
        let experience = Experience::new(ExperienceOptions { dom: Some(window) }, renderer)
            .context("failed to mount experience")?;
        Ok(experience)
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        let Some(experience) = self.experience.as_mut() else {
            return;
        };
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::F3 => experience.renderer_mut().toggle_overlay(),
            KeyCode::Space if experience.state() == engine::frame_loop::LoopState::Playing => {
                info!("stopped");
                experience.stop();
            }
            KeyCode::Space => {
                info!("playing");
                // Drag accumulated while stopped must not jump the camera.
                self.input.end_frame();
                if let Err(err) = experience.play() {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(experience) = self.experience.as_mut() else {
            return;
        };
        experience.update_controls(&self.input);
        let result = experience.on_redraw();
        self.input.end_frame();
        if let Err(err) = result {
            self.fail(event_loop, err);
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: RenderError) {
        match err {
            RenderError::OutOfMemory => {
                error!("{err}");
                self.failure = Some(err.into());
                event_loop.exit();
            }
            other => warn!("frame skipped: {other}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.experience.is_some() {
            return;
        }
        match Self::mount(event_loop) {
            Ok(experience) => {
                let (width, height) = experience.renderer().size();
                self.input.window_size = (width, height);
                self.experience = Some(experience);
            }
            Err(err) => {
                self.failure = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(experience) = self.experience.as_mut() else {
            return;
        };

        let consumed = experience.renderer_mut().handle_window_event(&event);
        if !consumed {
            self.input.process_event(&event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, code),
            WindowEvent::CursorMoved { position, .. } if !consumed => {
                experience.pointer_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::Resized(_) => experience.resize(),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = App::default();
    event_loop.run_app(&mut app)?;

    match app.failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
