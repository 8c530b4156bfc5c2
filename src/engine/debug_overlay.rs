// F3 stats panel drawn with egui over the resolved frame.

use egui::epaint::Shadow;
use super::renderer::FrameStats;

const PANEL_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);
const FONT_SIZE: f32 = 13.0;

pub struct DebugOverlay {
    pub visible: bool,
    ctx: egui::Context,
    input: egui_winit::State,
    painter: egui_wgpu::Renderer,
}

/// Text rows of the panel, top to bottom.
pub fn stat_lines(stats: &FrameStats, surface: [u32; 2]) -> Vec<String> {
    vec![
        format!("FPS: {}", stats.fps),
        format!("Frame: {:.2} ms", stats.frame_time_ms),
        format!("Surface: {} x {}", surface[0], surface[1]),
        format!("Tubes: {}", stats.tube_count),
        format!("Follower: ({:.3}, {:.3})", stats.follower.0, stats.follower.1),
        format!("Elapsed: {:.1} s", stats.elapsed),
        if stats.playing { "Playing" } else { "Stopped" }.to_string(),
    ]
}

fn styled_context() -> egui::Context {
    let ctx = egui::Context::default();
    ctx.set_visuals(egui::Visuals {
        window_fill: PANEL_FILL,
        window_stroke: egui::Stroke::NONE,
        window_shadow: Shadow::NONE,
        override_text_color: Some(egui::Color32::WHITE),
        ..egui::Visuals::dark()
    });
    ctx.style_mut(|style| style.override_font_id = Some(egui::FontId::monospace(FONT_SIZE)));
    ctx
}

impl DebugOverlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let ctx = styled_context();
        let input = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        // Single-sample, no depth: painted after the MSAA resolve.
        let painter = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self { visible: false, ctx, input, painter }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.input.on_window_event(window, event)
    }

    /// Lay out and paint the panel onto `view`.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen: &egui_wgpu::ScreenDescriptor,
        stats: &FrameStats,
    ) {
        let lines = stat_lines(stats, screen.size_in_pixels);
        let raw_input = self.input.take_egui_input(window);
        let output = self.ctx.run(raw_input, |ctx| {
            egui::Area::new(egui::Id::new("stats_panel"))
                .fixed_pos(egui::pos2(10.0, 10.0))
                .show(ctx, |ui| {
                    egui::Frame::none()
                        .fill(PANEL_FILL)
                        .inner_margin(egui::Margin::same(8.0))
                        .rounding(4.0)
                        .show(ui, |ui: &mut egui::Ui| {
                            for line in &lines {
                                ui.label(line.as_str());
                            }
                        });
                });
        });
        self.input.handle_platform_output(window, output.platform_output);

        let primitives = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        for (id, delta) in &output.textures_delta.set {
            self.painter.update_texture(device, queue, *id, delta);
        }
        self.painter.update_buffers(device, queue, encoder, &primitives, screen);

        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Stats Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            })
            .forget_lifetime();
        self.painter.render(&mut pass, &primitives, screen);
        drop(pass);

        for id in &output.textures_delta.free {
            self.painter.free_texture(id);
        }
    }
}
