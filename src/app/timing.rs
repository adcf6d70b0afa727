use std::time::{Duration, Instant};

const FIRST_FRAME_DT: f32 = 1.0 / 60.0;
const MAX_FRAME_DT: f32 = 0.25;
const TITLE_PERIOD: Duration = Duration::from_millis(500);

pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_fps_time: Option<Instant>,
    frame_count: u32,
    pub frame_dt: f32,
    render_ms: f32,
    base_title: String,
    pending_title: Option<String>,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: None,
            frame_count: 0,
            frame_dt: FIRST_FRAME_DT,
            render_ms: 0.0,
            base_title,
            pending_title: None,
        }
    }

    pub fn set_render_ms(&mut self, render_ms: f32) {
        self.render_ms = render_ms;
    }

    /// Advances to `now` and returns the clamped frame delta in seconds.
    pub fn update(&mut self, now: Instant) -> f32 {
        self.frame_dt = match self.last_frame_time {
            Some(last) => now
                .saturating_duration_since(last)
                .as_secs_f32()
                .clamp(0.0, MAX_FRAME_DT),
            None => FIRST_FRAME_DT,
        };
        self.last_frame_time = Some(now);

        self.frame_count = self.frame_count.saturating_add(1);
        let since = *self.last_fps_time.get_or_insert(now);
        let elapsed = now.saturating_duration_since(since);
        if elapsed >= TITLE_PERIOD {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            self.pending_title = Some(format!(
                "{} - {:.1} fps (frame {:.2} ms, draw {:.2} ms)",
                self.base_title,
                fps,
                self.frame_dt * 1000.0,
                self.render_ms
            ));
            self.frame_count = 0;
            self.last_fps_time = Some(now);
        }
        self.frame_dt
    }

    /// Window title with fresh FPS figures, at most once per half second.
    pub fn take_title(&mut self) -> Option<String> {
        self.pending_title.take()
    }
}
