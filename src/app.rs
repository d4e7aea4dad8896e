use std::{sync::Arc, time::Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

use crate::{
    config::ViewerConfig,
    error::{Result, ViewerError},
    gfx::{
        assets::FsAssetSource,
        camera::camera_controller::{self, CameraController, CameraParams, HeldKeys, KeyAction},
        rendering::{FrameInputs, PassOrchestrator, RenderEngine},
        resources::global_bindings::LightRig,
        scene::{reflective_translation, SceneGraph, SceneRole},
    },
};

/// Frame-to-frame state owned by the session loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Session {
    pub camera: CameraParams,
    /// Animation time in seconds, frozen while paused
    pub time: f32,
    pub paused: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            camera: CameraParams::default(),
            time: 0.0,
            paused: false,
        }
    }
}

impl Session {
    /// Integrates one frame of `dt` seconds. The camera always moves; the
    /// animation clock only runs while not paused.
    pub fn step(&mut self, keys: &HeldKeys, dt: f32) {
        self.camera = camera_controller::update(self.camera, keys, dt);
        if !self.paused {
            self.time += dt;
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn frame_inputs(&self) -> FrameInputs {
        FrameInputs {
            camera: self.camera,
            reflective_translation: reflective_translation(self.time),
        }
    }
}

pub struct AtriumApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    orchestrator: PassOrchestrator,
    static_scene: SceneGraph,
    reflective: SceneGraph,
    controller: CameraController,
    session: Session,
    last_frame: Instant,
    // First fatal error; ends the event loop and is returned from `run`
    error: Option<ViewerError>,
}

impl AtriumApp {
    /// Loads both mesh assets and prepares the event loop
    ///
    /// # Errors
    /// Any asset error aborts startup before a window is opened.
    pub fn new(config: ViewerConfig) -> Result<Self> {
        let source = FsAssetSource::new(config.asset_root.clone());

        let static_scene = SceneGraph::load(&source, &config.scene, SceneRole::Static)?;
        let mut reflective = SceneGraph::load(
            &source,
            &config.reflective_object,
            SceneRole::AnimatedReflective,
        )?;

        let session = Session::default();
        reflective.set_translation(reflective_translation(session.time));

        let event_loop = EventLoop::new()
            .map_err(|e| ViewerError::DeviceInit(format!("cannot create event loop: {}", e)))?;

        let orchestrator = PassOrchestrator::new(&config, LightRig::default());

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                config,
                window: None,
                render_engine: None,
                orchestrator,
                static_scene,
                reflective,
                controller: CameraController::new(),
                session,
                last_frame: Instant::now(),
                error: None,
            },
        })
    }

    /// Run the application until the window closes or a fatal error occurs
    pub fn run(mut self) -> Result<()> {
        let Some(event_loop) = self.event_loop.take() else {
            return Ok(());
        };
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop
            .run_app(&mut self.app_state)
            .map_err(|e| ViewerError::DeviceInit(format!("event loop failed: {}", e)))?;

        match self.app_state.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: ViewerError) {
        log::error!("{}", error);
        if self.error.is_none() {
            self.error = Some(error);
        }
        event_loop.exit();
    }

    fn init_renderer(&mut self, window: Arc<Window>) -> Result<()> {
        let (width, height): (u32, u32) = window.inner_size().into();
        let viewer = self.config.clone().with_window_size(width, height);
        self.orchestrator.resize(width, height);

        let renderer = pollster::block_on(RenderEngine::new(
            window,
            &viewer,
            self.orchestrator.lights(),
        ))?;

        renderer.upload_scene(&mut self.static_scene);
        renderer.upload_scene(&mut self.reflective);

        self.render_engine = Some(renderer);
        Ok(())
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));

        match event_loop.create_window(attributes) {
            Ok(window) => {
                let window_handle = Arc::new(window);
                self.window = Some(window_handle.clone());

                if let Err(error) = self.init_renderer(window_handle) {
                    self.fail(event_loop, error);
                    return;
                }
                self.last_frame = Instant::now();
            }
            Err(e) => self.fail(
                event_loop,
                ViewerError::DeviceInit(format!("cannot create window: {}", e)),
            ),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(render_engine) = self.render_engine.as_mut() else {
            return;
        };

        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                match self.controller.process_keyboard_event(&event) {
                    KeyAction::TogglePause => {
                        self.session.toggle_pause();
                        log::info!(
                            "Animation {}",
                            if self.session.paused { "paused" } else { "resumed" }
                        );
                    }
                    KeyAction::Exit => event_loop.exit(),
                    KeyAction::None => {}
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.orchestrator.resize(width, height);
                render_engine.resize(width, height);
            }
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(self.last_frame).as_secs_f32();
                self.last_frame = now;

                self.session.step(&self.controller.keys, dt);
                self.reflective
                    .set_translation(reflective_translation(self.session.time));
                render_engine.sync_scene(&mut self.reflective);

                let plan = self.orchestrator.plan_frame(&self.session.frame_inputs());
                if let Err(error) =
                    render_engine.render_frame(&plan, &self.static_scene, &self.reflective)
                {
                    self.fail(event_loop, error);
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paused_session_freezes_animation_but_not_camera() {
        let mut session = Session::default();
        let keys = HeldKeys {
            forward: true,
            ..Default::default()
        };

        session.step(&keys, 0.5);
        assert!((session.time - 0.5).abs() < 1e-6);

        session.toggle_pause();
        let before = session.frame_inputs().reflective_translation;
        let z = session.camera.z;
        session.step(&keys, 0.25);

        assert!((session.time - 0.5).abs() < 1e-6);
        assert_eq!(session.frame_inputs().reflective_translation, before);
        assert!(session.camera.z > z);
    }

    #[test]
    fn test_toggle_pause_twice_resumes() {
        let mut session = Session::default();
        session.toggle_pause();
        session.toggle_pause();
        session.step(&HeldKeys::default(), 1.0);
        assert!(!session.paused);
        assert!((session.time - 1.0).abs() < 1e-6);
    }
}
