mod egui_host;
mod frame_loop;
mod input;
mod loading;
mod stage;
mod timing;

pub use egui_host::EguiFrameOutput;

use crate::assets::{AttachOutcome, FileSource};
use crate::config::{self, SettingsStore, ViewerConfig};
use crate::render::RenderContext;
use crate::ui::{LoadStatus, PanelView, UiActions, UiState};
use egui_host::EguiHost;
use frame_loop::{LoopHandle, RenderLoop, TickOutcome};
use input::{DragButton, InputState};
use loading::{load_async, LoadEvent, LoadHandle};
use stage::Stage;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

const WINDOW_TITLE: &str = "Sun Study";
const DOLLY_PER_PIXEL: f32 = 0.05;
const WHEEL_PIXELS_PER_STEP: f32 = 50.0;

pub struct App {
    config: ViewerConfig,
    config_path: PathBuf,
    window: Option<Arc<Window>>,
    egui: Option<EguiHost>,
    stage: Option<Stage>,
    settings: SettingsStore,
    ui: UiState,
    input: InputState,
    render_loop: RenderLoop,
    loop_handle: LoopHandle,
    pending_load: Option<LoadHandle>,
    target_frame_duration: Duration,
    next_frame_time: Instant,
    close_requested: bool,
}

impl App {
    fn new(config: ViewerConfig, config_path: PathBuf) -> Self {
        let settings = SettingsStore::new(config.initial_settings());
        let render_loop = RenderLoop::new(WINDOW_TITLE.to_string());
        let loop_handle = render_loop.handle();
        Self {
            config,
            config_path,
            window: None,
            egui: None,
            stage: None,
            settings,
            ui: UiState::new(),
            input: InputState::default(),
            render_loop,
            loop_handle,
            pending_load: None,
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
            close_requested: false,
        }
    }

    fn init_stage(&mut self, window: &Window) {
        let render = RenderContext::headless(window.inner_size(), window.scale_factor());
        self.stage = Some(Stage::new(&self.config, render));
        self.egui = Some(EguiHost::new(window));
        let paths = self.config.model_paths.clone();
        self.start_load(paths);
    }

    /// Starts a new load. A load still in flight is superseded and its result discarded.
    fn start_load(&mut self, paths: Vec<String>) {
        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        let ticket = stage.begin_load();
        let first = paths.first().cloned().unwrap_or_default();
        log::info!("Loading model ({} candidate paths)", paths.len());
        self.pending_load = Some(load_async(ticket, paths, FileSource));
        self.ui.set_status(LoadStatus::Loading {
            path: first,
            progress: Default::default(),
        });
    }

    fn poll_loads(&mut self) {
        let (Some(handle), Some(stage)) = (self.pending_load.as_mut(), self.stage.as_mut()) else {
            return;
        };
        let ticket = handle.ticket();
        for event in handle.poll() {
            if !stage.is_current(ticket) {
                continue;
            }
            match event {
                LoadEvent::Progress { path, progress } => {
                    self.ui.set_status(LoadStatus::Loading { path, progress });
                }
                LoadEvent::Finished(Ok(model)) => {
                    let name = model.name.clone();
                    let path = model.path.clone();
                    if let AttachOutcome::Attached { .. } =
                        stage.attach_model(ticket, model, &mut self.settings)
                    {
                        self.ui.set_status(LoadStatus::Loaded { name, path });
                    }
                }
                LoadEvent::Finished(Err(err)) => {
                    log::error!("Model load failed: {}", err);
                    self.ui.set_status(LoadStatus::Failed(err.to_string()));
                }
            }
        }
        if handle.is_finished() {
            self.pending_load = None;
        }
    }

    fn handle_actions(&mut self, actions: UiActions) {
        if let Some(path) = actions.open_model {
            let primary = path.to_string_lossy().into_owned();
            let paths = self
                .config
                .clone()
                .with_primary_path(Some(primary))
                .model_paths;
            self.start_load(paths);
        }
        if actions.frame_model {
            if let Some(stage) = self.stage.as_mut() {
                stage.frame_model();
            }
        }
        if actions.save_settings {
            self.config.remember(self.settings.snapshot());
            match config::save_config_to_file(&self.config, &self.config_path) {
                Ok(()) => log::info!("Saved settings to {}", self.config_path.display()),
                Err(err) => log::warn!(
                    "Failed to save settings to {}: {}",
                    self.config_path.display(),
                    err
                ),
            }
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>, scale_factor: f64) {
        if let Some(stage) = &mut self.stage {
            stage.render.resize(new_size, scale_factor);
        }
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn ui_wants_pointer(&self) -> bool {
        self.egui
            .as_ref()
            .map(|host| host.wants_pointer_input())
            .unwrap_or(false)
    }

    fn ui_wants_keyboard(&self) -> bool {
        self.egui
            .as_ref()
            .map(|host| host.wants_keyboard_input())
            .unwrap_or(false)
    }

    fn handle_cursor(&mut self, x: f32, y: f32) {
        let Some(drag) = self.input.handle_cursor(x, y) else {
            return;
        };
        if self.ui_wants_pointer() {
            return;
        }
        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        let height = stage.render.viewport().height as f32;
        match drag.button {
            DragButton::Rotate => stage.orbit.rotate_by_pixels(drag.dx, drag.dy, height),
            DragButton::Pan => stage
                .orbit
                .pan_by_pixels(&stage.camera, drag.dx, drag.dy, height),
            DragButton::Dolly => stage.orbit.zoom(-drag.dy * DOLLY_PER_PIXEL),
        }
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.clone() else {
            return;
        };
        self.poll_loads();

        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        let ui_frame = match self.egui.as_mut() {
            Some(host) => {
                let view = PanelView {
                    registry: stage.registry(),
                    report: stage.report(),
                    draw_failures: stage.render.draw_failures(),
                };
                let ui = &mut self.ui;
                let settings = &mut self.settings;
                Some(host.run_ui(&window, |ctx| ui.show(ctx, settings, &view)))
            }
            None => None,
        };
        let (ui_output, actions) = match ui_frame {
            Some((output, actions)) => (Some(output), actions),
            None => (None, UiActions::default()),
        };

        let outcome = self.render_loop.tick(
            Instant::now(),
            stage,
            &self.input.movement,
            &mut self.settings,
            ui_output.as_ref(),
        );
        if let Some(title) = self.render_loop.take_title() {
            window.set_title(&title);
        }
        self.handle_actions(actions);

        if outcome == TickOutcome::Stopped {
            log::info!("Render loop stopped after {} frames", self.render_loop.frames());
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let [width, height] = self.config.window_size;
        let window_attrs = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
            .with_resizable(true);

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("Failed to create window"),
        );

        self.init_stage(&window);
        self.update_target_frame_duration(&window);
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let ui_consumed = match (self.egui.as_mut(), self.window.as_ref()) {
            (Some(host), Some(window)) => host.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
                self.loop_handle.stop();
                event_loop.exit();
            }
            WindowEvent::Focused(focused) => {
                if !focused {
                    self.input.clear();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) if pressed => {
                        self.close_requested = true;
                        self.loop_handle.stop();
                        event_loop.exit();
                        return;
                    }
                    PhysicalKey::Code(KeyCode::F1) if pressed && !event.repeat => {
                        self.ui.toggle_panel();
                        return;
                    }
                    _ => {}
                }
                // Releases always go through so a key cannot stick while the panel has focus.
                if !pressed || !(ui_consumed || self.ui_wants_keyboard()) {
                    self.input.handle_key(event.physical_key, pressed);
                }
            }
            WindowEvent::Resized(new_size) => {
                let scale_factor = self
                    .window
                    .as_ref()
                    .map(|window| window.scale_factor())
                    .unwrap_or(1.0);
                self.handle_resize(new_size, scale_factor);
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(window) = self.window.as_ref() {
                    let size = window.inner_size();
                    self.handle_resize(size, scale_factor);
                }
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor(position.x as f32, position.y as f32);
            }
            WindowEvent::CursorLeft { .. } => {
                self.input.cursor_left();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                if !pressed || !(ui_consumed || self.ui_wants_pointer()) {
                    self.input.handle_mouse_button(button, pressed);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if ui_consumed || self.ui_wants_pointer() {
                    return;
                }
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / WHEEL_PIXELS_PER_STEP,
                };
                if let Some(stage) = self.stage.as_mut() {
                    stage.orbit.zoom(steps);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.close_requested || !self.loop_handle.is_running() {
            return;
        }
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config_path = config::config_path();
    let config = config::load_or_default(&config_path).with_primary_path(std::env::args().nth(1));

    log::info!("☀ Sun Study viewer");
    log::info!("   WASD/arrows move, Q/E down/up, drag to orbit, F1 toggles the panel, ESC exits");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, config_path);
    event_loop.run_app(&mut app).expect("Event loop error");

    log::info!("👋 Goodbye!");
}
