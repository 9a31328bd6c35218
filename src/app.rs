//! # Application Module
//!
//! [`App`] is the application context: it owns the window, the renderer, the HUD state, the
//! held-key vector and the camera controller, and every winit callback reaches them through
//! `&mut self`. Nothing lives in globals.
//!
//! ## Lifecycle
//!
//! The viewer walks [`SceneState`] forward only:
//!
//! ```text
//! Uninitialized -> WindowReady -> DeviceReady -> Rendering -> ShuttingDown -> Terminated
//! ```
//!
//! Any initialisation failure is recorded, the event loop is asked to exit, and [`run`]
//! returns the recorded error once the loop has stopped.
//!
//! ## Frame
//!
//! On every `RedrawRequested` the held keys move the camera, the projection follows the
//! zoom, the HUD is laid out and the renderer draws and presents. The next redraw is
//! requested right away; presentation is vsynced.

// The window is shared between the app, egui-winit and the wgpu surface.
use std::sync::Arc;

// Frame timing for the HUD.
use web_time::{Duration, Instant};

// Window creation, the event loop and the events routed below.
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Theme, Window, WindowId},
};

use crate::camera::CameraController;
use crate::config::{SceneConfig, WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH};
use crate::input::{InputResponse, InputState};
use crate::renderer::{Renderer, RendererError};
use crate::transform::ProjectionError;

/// Lifecycle of the viewer, in the order it is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SceneState {
    #[default]
    Uninitialized,
    WindowReady,
    DeviceReady,
    Rendering,
    ShuttingDown,
    Terminated,
}

impl SceneState {
    /// States only move forward; failures jump straight to `ShuttingDown`.
    pub fn can_advance_to(self, next: SceneState) -> bool {
        next > self
    }
}

/// Every way the viewer can stop with a failure status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The platform refused to create an event loop.
    #[error("failed to create the event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// The 640x480 window could not be opened.
    #[error("failed to create the window: {0}")]
    Window(#[from] winit::error::OsError),

    /// Device, shader program or scene setup failed.
    #[error(transparent)]
    Renderer(#[from] RendererError),

    #[error("failed to update the projection: {0}")]
    Projection(#[from] ProjectionError),

    #[error("the surface ran out of memory")]
    SurfaceOutOfMemory,
}

/// The application context threaded through every winit callback.
pub struct App {
    /// Parsed command-line options.
    config: SceneConfig,

    /// Where the viewer is in its lifecycle.
    state: SceneState,

    /// The window, once `resumed` created it.
    window: Option<Arc<Window>>,

    /// Device-side state: surface, shader program, scene and HUD renderer.
    renderer: Option<Renderer>,

    /// egui's view of the window: input translation and platform output.
    gui_state: Option<egui_winit::State>,

    /// Held keys and the last cursor position.
    input: InputState,

    /// The only source of the view matrix and the field of view.
    camera: CameraController,

    /// When the previous frame started.
    last_render_time: Option<Instant>,

    /// Duration of the previous frame, shown on the HUD.
    frame_time: Duration,

    /// Draw with line polygons; toggled from the HUD.
    wireframe: bool,

    /// The first fatal error, returned by [`run`] after the loop stops.
    failure: Option<AppError>,
}

impl App {
    /// A fresh context; nothing touches the platform until `resumed`.
    pub fn new(config: SceneConfig) -> Self {
        let wireframe = !config.fill;
        Self {
            config,
            state: SceneState::default(),
            window: None,
            renderer: None,
            gui_state: None,
            input: InputState::new(),
            camera: CameraController::default(),
            last_render_time: None,
            frame_time: Duration::ZERO,
            wireframe,
            failure: None,
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SceneState {
        self.state
    }

    /// The camera controller driven by the input callbacks.
    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    /// Moves to `next` unless that would go backwards.
    fn advance(&mut self, next: SceneState) {
        if self.state.can_advance_to(next) {
            log::debug!("Scene state: {:?} -> {next:?}", self.state);
            self.state = next;
        }
    }

    /// Records a fatal error and stops the event loop.
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
        log::error!("{error}");
        self.failure.get_or_insert(error);
        self.shut_down(event_loop);
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        self.advance(SceneState::ShuttingDown);
        event_loop.exit();
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .with_resizable(false);

        let window_handle = Arc::new(event_loop.create_window(attributes)?);
        self.window = Some(window_handle.clone());
        self.advance(SceneState::WindowReady);

        let gui_context = egui::Context::default();
        let viewport_id = gui_context.viewport_id();
        let gui_state = egui_winit::State::new(
            gui_context,
            viewport_id,
            &window_handle,
            Some(window_handle.scale_factor() as _),
            Some(Theme::Dark),
            None,
        );

        // The framebuffer size, which differs from the logical size on high-DPI displays.
        let PhysicalSize { width, height } = window_handle.inner_size();
        log::info!("Framebuffer size: ({width} x {height})");

        let field_of_view = self.camera.field_of_view();
        let renderer = pollster::block_on(Renderer::new(
            window_handle.clone(),
            width,
            height,
            &self.config,
            field_of_view,
        ))?;

        if self.wireframe && !renderer.supports_wireframe() {
            self.wireframe = false;
        }

        self.renderer = Some(renderer);
        self.gui_state = Some(gui_state);
        self.advance(SceneState::DeviceReady);

        self.last_render_time = Some(Instant::now());
        self.advance(SceneState::Rendering);
        window_handle.request_redraw();
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state != SceneState::Uninitialized {
            return;
        }
        if let Err(error) = self.initialize(event_loop) {
            self.fail(event_loop, error);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.state != SceneState::Rendering {
            return;
        }

        let (Some(gui_state), Some(renderer), Some(window), Some(last_render_time)) = (
            self.gui_state.as_mut(),
            self.renderer.as_mut(),
            self.window.as_ref(),
            self.last_render_time.as_mut(),
        ) else {
            return;
        };

        let gui_consumed = gui_state.on_window_event(window, &event).consumed;

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting...");
                self.shut_down(event_loop);
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                log::info!("Resizing renderer surface to: ({width}, {height})");
                renderer.resize(width, height);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                self.frame_time = now - *last_render_time;
                *last_render_time = now;

                self.input.update_camera_pose(&mut self.camera);

                if let Err(error) = renderer.update_projection(self.camera.field_of_view()) {
                    self.fail(event_loop, error.into());
                    return;
                }

                let gui_input = gui_state.take_egui_input(window);
                let gui_context = gui_state.egui_ctx().clone();
                gui_context.begin_pass(gui_input);

                let camera = self.camera.camera();
                let position = camera.position();
                let supports_wireframe = renderer.supports_wireframe();
                egui::Window::new("Camera")
                    .resizable(false)
                    .show(&gui_context, |ui| {
                        ui.label(format!(
                            "Position: ({:.2}, {:.2}, {:.2})",
                            position.x, position.y, position.z
                        ));
                        ui.label(format!(
                            "Yaw: {:.1}°  Pitch: {:.1}°",
                            camera.yaw().to_degrees(),
                            camera.pitch().to_degrees()
                        ));
                        ui.label(format!("Field of view: {:.1}°", self.camera.zoom()));
                        ui.label(format!(
                            "Frame time: {:.2} ms",
                            self.frame_time.as_secs_f64() * 1000.0
                        ));
                        ui.add_enabled(
                            supports_wireframe,
                            egui::Checkbox::new(&mut self.wireframe, "Wireframe"),
                        );
                    });

                let egui_winit::egui::FullOutput {
                    textures_delta,
                    shapes,
                    pixels_per_point,
                    platform_output,
                    ..
                } = gui_context.end_pass();

                gui_state.handle_platform_output(window, platform_output);

                let paint_jobs = gui_context.tessellate(shapes, pixels_per_point);

                let screen_descriptor = {
                    let PhysicalSize { width, height } = window.inner_size();
                    egui_wgpu::ScreenDescriptor {
                        size_in_pixels: [width, height],
                        pixels_per_point: window.scale_factor() as f32,
                    }
                };

                let view = self.camera.view_matrix();
                if let Err(error) = renderer.render_frame(
                    &view,
                    self.wireframe,
                    screen_descriptor,
                    paint_jobs,
                    textures_delta,
                ) {
                    log::error!("Surface error: {error}");
                    self.fail(event_loop, AppError::SurfaceOutOfMemory);
                    return;
                }

                window.request_redraw();
            }
            event => {
                let response =
                    self.input
                        .handle_window_event(&event, &mut self.camera, gui_consumed);
                if response == InputResponse::CloseRequested {
                    log::info!("Escape pressed. Exiting...");
                    self.shut_down(event_loop);
                }
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.advance(SceneState::ShuttingDown);
        // Models release their buffers before the device and surface go away.
        self.renderer = None;
        self.gui_state = None;
        self.window = None;
        self.advance(SceneState::Terminated);
        log::info!("Scene viewer terminated");
    }
}

/// Runs the viewer until the window closes.
///
/// # Errors
///
/// Returns the first fatal error hit while initialising or rendering.
pub fn run(config: SceneConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    match app.failure.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_only_move_forward() {
        use SceneState::*;
        let order = [
            Uninitialized,
            WindowReady,
            DeviceReady,
            Rendering,
            ShuttingDown,
            Terminated,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]));
            assert!(!pair[1].can_advance_to(pair[0]));
        }
        assert!(WindowReady.can_advance_to(ShuttingDown));
        assert!(!Terminated.can_advance_to(Rendering));
        assert!(!Rendering.can_advance_to(Rendering));
    }

    #[test]
    fn new_app_is_uninitialized_at_the_initial_pose() {
        let app = App::new(SceneConfig::default());
        assert_eq!(app.state(), SceneState::Uninitialized);
        assert_eq!(app.camera().zoom(), CameraController::DEFAULT_ZOOM);
        assert!(app.wireframe);
    }

    #[test]
    fn fill_flag_disables_wireframe() {
        let app = App::new(SceneConfig {
            fill: true,
            ..SceneConfig::default()
        });
        assert!(!app.wireframe);
    }
}
