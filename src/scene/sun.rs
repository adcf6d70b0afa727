//! Time-of-day sun placement.
//!
//! The sun travels a circle in the XY plane. The angle model is a plain 24 hour rotation,
//! offset so that 12:00 sits at the top of the circle and 00:00 at the bottom.

use crate::scene::{AuthoredMaterial, Bounds, MeshData, NodeId, SceneGraph};
use glam::Vec3;
use std::f64::consts::TAU;

pub const DAY_SECONDS: u32 = 86_400;
const EPOCH_OFFSET_SECONDS: u32 = 6 * 3600;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunState {
    pub hour_of_day: u32,
    pub minute_of_hour: u32,
    pub orbit_radius: f32,
}

impl SunState {
    pub fn seconds_of_day(&self) -> u32 {
        let seconds = self.hour_of_day as u64 * 3600 + self.minute_of_hour as u64 * 60;
        (seconds % DAY_SECONDS as u64) as u32
    }
}

pub fn compute_sun_position(state: &SunState) -> Vec3 {
    let t = state.seconds_of_day();
    let phase = (t + EPOCH_OFFSET_SECONDS) % DAY_SECONDS;
    let angle = -TAU * phase as f64 / DAY_SECONDS as f64;
    let radius = state.orbit_radius as f64;
    Vec3::new(
        (radius * angle.cos()) as f32,
        (radius * angle.sin()) as f32,
        0.0,
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: [f32; 3],
    pub intensity: f32,
    pub range: f32,
    pub cast_shadows: bool,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: [1.0, 1.0, 1.0],
            intensity: 100.0,
            range: 100.0,
            cast_shadows: true,
        }
    }
}

/// Visible sun marker plus the light that follows it.
#[derive(Debug, Clone)]
pub struct SunRig {
    marker: NodeId,
    light: PointLight,
}

impl SunRig {
    const MARKER_RADIUS: f32 = 0.5;

    /// Adds the marker sphere under `parent` in the live graph.
    pub fn spawn(graph: &mut SceneGraph, parent: NodeId) -> Self {
        let marker = graph.add_mesh(
            parent,
            "Sun",
            MeshData::new(
                AuthoredMaterial {
                    name: Some("SunMarker".to_string()),
                    base_color_rgba: [0.933, 0.933, 0.933, 1.0],
                },
                Some(Bounds {
                    min: Vec3::splat(-Self::MARKER_RADIUS),
                    max: Vec3::splat(Self::MARKER_RADIUS),
                }),
            ),
        );
        Self {
            marker,
            light: PointLight::default(),
        }
    }

    pub fn marker(&self) -> NodeId {
        self.marker
    }

    pub fn light(&self) -> &PointLight {
        &self.light
    }

    /// Moves the marker and copies the same position into the light.
    pub fn apply(&mut self, graph: &mut SceneGraph, position: Vec3) {
        if let Some(node) = graph.get_mut(self.marker) {
            node.transform.translation = position;
        }
        self.light.position = position;
    }
}

/// Advances the time of day while animation is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SunClock {
    carry_seconds: f64,
}

impl SunClock {
    /// Returns the new `(hour, minute)` after `dt` real seconds at `time_speed` simulated
    /// seconds per second, or `None` when the minute did not roll over.
    pub fn advance(&mut self, state: &SunState, dt: f32, time_speed: f32) -> Option<(u32, u32)> {
        if dt <= 0.0 || time_speed <= 0.0 || !time_speed.is_finite() {
            return None;
        }
        self.carry_seconds += dt as f64 * time_speed as f64;
        let whole_minutes = (self.carry_seconds / 60.0).floor();
        if whole_minutes < 1.0 {
            return None;
        }
        self.carry_seconds = self.carry_seconds.rem_euclid(60.0);
        let minutes_of_day = (DAY_SECONDS / 60) as u64;
        // Whole days drop out before the cast so huge speeds cannot overflow.
        let skipped = (whole_minutes % minutes_of_day as f64) as u64;
        let current = (state.seconds_of_day() / 60) as u64;
        let next = (current + skipped) % minutes_of_day;
        Some(((next / 60) as u32, (next % 60) as u32))
    }

    pub fn reset(&mut self) {
        self.carry_seconds = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeKind;

    const EPS: f32 = 1e-4;

    fn state(hour: u32, minute: u32, radius: f32) -> SunState {
        SunState {
            hour_of_day: hour,
            minute_of_hour: minute,
            orbit_radius: radius,
        }
    }

    #[test]
    fn position_stays_on_the_circle() {
        for radius in [0.5f32, 1.0, 18.0, 250.0] {
            for hour in 0..24 {
                for minute in [0, 15, 30, 45, 59] {
                    let p = compute_sun_position(&state(hour, minute, radius));
                    assert!((p.length() - radius).abs() < radius * EPS);
                    assert_eq!(p.z, 0.0);
                }
            }
        }
    }

    #[test]
    fn noon_is_the_top_and_midnight_the_bottom() {
        for radius in [1.0f32, 18.0, 42.0] {
            let noon = compute_sun_position(&state(12, 0, radius));
            assert!((noon.y - radius).abs() < radius * EPS);
            assert!(noon.x.abs() < radius * EPS);

            let midnight = compute_sun_position(&state(0, 0, radius));
            assert!((midnight.y + radius).abs() < radius * EPS);
        }
    }

    #[test]
    fn wraps_after_a_full_day() {
        for hour in 0..24 {
            let today = compute_sun_position(&state(hour, 30, 18.0));
            let tomorrow = compute_sun_position(&state(hour + 24, 30, 18.0));
            assert!((today - tomorrow).length() < EPS);
        }
    }

    #[test]
    fn six_and_eighteen_sit_on_the_horizon() {
        let sunrise = compute_sun_position(&state(6, 0, 10.0));
        let sunset = compute_sun_position(&state(18, 0, 10.0));
        assert!(sunrise.y.abs() < EPS && sunset.y.abs() < EPS);
        assert!((sunrise.x + 10.0).abs() < EPS);
        assert!((sunset.x - 10.0).abs() < EPS);
    }

    #[test]
    fn rig_copies_position_into_light() {
        let mut graph = SceneGraph::new("world", NodeKind::Other);
        let root = graph.root();
        let mut rig = SunRig::spawn(&mut graph, root);
        let position = compute_sun_position(&state(15, 45, 18.0));
        rig.apply(&mut graph, position);
        assert_eq!(rig.light().position, position);
        assert_eq!(
            graph.get(rig.marker()).unwrap().transform.translation,
            position
        );
    }

    #[test]
    fn clock_rolls_minutes_and_wraps_midnight() {
        let mut clock = SunClock::default();
        let s = state(23, 59, 18.0);
        assert_eq!(clock.advance(&s, 0.1, 100.0), None);
        assert_eq!(clock.advance(&s, 0.5, 100.0), Some((0, 0)));

        let mut clock = SunClock::default();
        assert_eq!(clock.advance(&state(10, 0, 1.0), 1.0, 3600.0), Some((11, 0)));
        assert_eq!(clock.advance(&state(10, 0, 1.0), 1.0, 0.0), None);
    }

    #[test]
    fn clock_survives_extreme_speeds() {
        let mut clock = SunClock::default();
        let (hour, minute) = clock.advance(&state(10, 0, 1.0), 1.0, 1e38).unwrap();
        assert!(hour < 24 && minute < 60);
        assert_eq!(clock.advance(&state(10, 0, 1.0), 1.0, 60.0), Some((10, 1)));

        assert_eq!(clock.advance(&state(10, 0, 1.0), 1.0, f32::INFINITY), None);
        assert_eq!(clock.advance(&state(10, 0, 1.0), 1.0, f32::NAN), None);
    }
}
