use crate::app::stage::Stage;
use crate::app::timing::FrameTiming;
use crate::app::EguiFrameOutput;
use crate::config::SettingsStore;
use crate::render::{CameraMovement, FrameDesc};
use crate::scene::sun::{compute_sun_position, SunClock};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Cloneable stop switch for a `RenderLoop`.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    running: Rc<Cell<bool>>,
}

impl LoopHandle {
    pub fn stop(&self) {
        self.running.set(false);
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Schedule another frame.
    Continue,
    Stopped,
}

/// One frame per call: movement, orbit, sun, draw.
pub struct RenderLoop {
    timing: FrameTiming,
    handle: LoopHandle,
    sun_clock: SunClock,
    frame_index: u64,
}

impl RenderLoop {
    pub fn new(base_title: String) -> Self {
        Self {
            timing: FrameTiming::new(base_title),
            handle: LoopHandle {
                running: Rc::new(Cell::new(true)),
            },
            sun_clock: SunClock::default(),
            frame_index: 0,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn frames(&self) -> u64 {
        self.frame_index
    }

    pub fn take_title(&mut self) -> Option<String> {
        self.timing.take_title()
    }

    pub fn tick(
        &mut self,
        now: Instant,
        stage: &mut Stage,
        movement: &CameraMovement,
        settings: &mut SettingsStore,
        ui: Option<&EguiFrameOutput>,
    ) -> TickOutcome {
        if !self.handle.is_running() {
            return TickOutcome::Stopped;
        }
        let dt = self.timing.update(now);

        stage.camera.update_movement(movement, dt);
        stage.orbit.update(&mut stage.camera);

        let (animate, sun, time_speed) = {
            let snapshot = settings.snapshot();
            (snapshot.animate_time, snapshot.sun, snapshot.time_speed)
        };
        if animate {
            if let Some((hour, minute)) = self.sun_clock.advance(&sun, dt, time_speed) {
                settings.set_time_of_day(hour, minute);
            }
        } else {
            self.sun_clock.reset();
        }

        let changes = settings.take_changes();
        let snapshot = settings.snapshot();
        if changes.materials {
            stage.apply_palette(&snapshot.palette);
        }
        if changes.sun {
            log::trace!(
                "Sun time {:02}:{:02}, radius {}",
                snapshot.sun.hour_of_day,
                snapshot.sun.minute_of_hour,
                snapshot.sun.orbit_radius
            );
        }
        let sun_position = compute_sun_position(&snapshot.sun);
        stage.sun.apply(&mut stage.graph, sun_position);

        let draw_start = Instant::now();
        let viewport = stage.render.viewport();
        let frame = FrameDesc {
            frame_index: self.frame_index,
            scene: &stage.graph,
            camera: stage.camera.view(viewport.aspect()),
            sun: stage.sun.light(),
            ambient: stage.ambient,
            viewport,
            ui,
        };
        stage.render.draw(&frame);
        self.timing
            .set_render_ms(draw_start.elapsed().as_secs_f32() * 1000.0);
        self.frame_index += 1;

        if self.handle.is_running() {
            TickOutcome::Continue
        } else {
            TickOutcome::Stopped
        }
    }
}
