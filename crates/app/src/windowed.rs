//! Windowed run on the Vulkan backend.

use anyhow::{Context, Result};
use glam::Vec2;
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use shapes_core::{AppConfig, GameTimer};
use shapes_platform::{InputState, KeyCode, MouseButton, Window};
use shapes_renderer::{FrameInput, FrameOrchestrator, VulkanBackend};
use shapes_scene::{OrbitCamera, build_shapes_scene};

/// Held to draw in wireframe.
const WIREFRAME_KEY: KeyCode = KeyCode::Digit1;

struct ShapesApp {
    config: AppConfig,
    start_wireframe: bool,
    // The orchestrator owns the surface, so it drops before the window.
    orchestrator: Option<FrameOrchestrator<VulkanBackend>>,
    window: Option<Window>,
    input: InputState,
    timer: GameTimer,
    fatal: Option<anyhow::Error>,
}

impl ShapesApp {
    fn new(config: AppConfig, start_wireframe: bool) -> Self {
        Self {
            config,
            start_wireframe,
            orchestrator: None,
            window: None,
            input: InputState::new(),
            timer: GameTimer::new(),
            fatal: None,
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = Window::new(
            event_loop,
            self.config.window.width,
            self.config.window.height,
            &self.config.window.title,
        )?;

        let frames = self.config.frames.frame_resources;
        let backend = VulkanBackend::new(&window, &self.config.render, frames)
            .context("Failed to initialize the Vulkan backend")?;
        let scene = build_shapes_scene(frames).context("Failed to build the shapes scene")?;
        let aspect = window.width().max(1) as f32 / window.height().max(1) as f32;
        let camera = OrbitCamera::new(&self.config.camera, aspect);

        let mut orchestrator = FrameOrchestrator::new(backend, scene, camera, &self.config)?;
        orchestrator.resize(window.width(), window.height());

        info!("Initialization complete, entering main loop");
        self.orchestrator = Some(orchestrator);
        self.window = Some(window);
        self.timer.reset();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        window.resize(width, height);

        if window.is_minimized() {
            debug!("Window minimized, pausing");
            self.timer.stop();
            return;
        }
        self.timer.start();

        if let Some(orchestrator) = self.orchestrator.as_mut() {
            orchestrator.resize(width, height);
            orchestrator.backend_mut().resize(width, height);
        }
    }

    fn render(&mut self) -> Result<()> {
        let (Some(window), Some(orchestrator)) = (self.window.as_ref(), self.orchestrator.as_mut())
        else {
            return Ok(());
        };
        if window.is_minimized() {
            return Ok(());
        }

        self.timer.tick();

        if let Some((dx, dy)) = self.input.drag_delta(MouseButton::Left) {
            orchestrator.camera_mut().rotate(Vec2::new(dx, dy));
        } else if let Some((dx, dy)) = self.input.drag_delta(MouseButton::Right) {
            orchestrator.camera_mut().zoom(Vec2::new(dx, dy));
        }
        self.input.end_frame();

        orchestrator.tick(&FrameInput {
            wireframe: self.start_wireframe ^ self.input.is_key_held(WIREFRAME_KEY),
            total_time: self.timer.total_time(),
            delta_time: self.timer.delta_time(),
        })?;
        Ok(())
    }
}

impl ApplicationHandler for ShapesApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if self.input.handle_window_event(&event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    self.fail(event_loop, e.context("Frame failed"));
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Drain the frame ring while the window and surface still exist.
        self.orchestrator = None;
        self.window = None;
    }
}

/// Opens the window and renders until it is closed or a frame fails.
pub fn run(config: AppConfig, start_wireframe: bool) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ShapesApp::new(config, start_wireframe);
    event_loop.run_app(&mut app)?;

    app.fatal.take().map_or(Ok(()), Err)
}
