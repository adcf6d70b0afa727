use crate::render::camera::{CameraController, WORLD_UP};
use glam::Vec3;
use std::f32::consts::{PI, TAU};

const POLE_EPSILON: f32 = 1e-6;

/// Damped orbit around `CameraController::target`.
///
/// Pointer gestures accumulate rotation and pan deltas. Each `update` applies a
/// `damping_factor` share of what is pending and then decays the rest.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    theta_delta: f32,
    phi_delta: f32,
    pan_offset: Vec3,
    scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            damping_factor: 0.05,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar: 0.0,
            max_polar: PI,
            theta_delta: 0.0,
            phi_delta: 0.0,
            pan_offset: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y.
    phi: f32,
    /// Azimuth around +Y, measured from +Z.
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

impl OrbitControls {
    pub fn rotate_left(&mut self, angle: f32) {
        self.theta_delta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.phi_delta -= angle;
    }

    /// Pointer drag in pixels, scaled by viewport height like a turntable.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.rotate_left(TAU * dx / height * self.rotate_speed);
        self.rotate_up(TAU * dy / height * self.rotate_speed);
    }

    /// Screen-space pan so the point under the cursor follows it at the target's depth.
    pub fn pan_by_pixels(
        &mut self,
        camera: &CameraController,
        dx: f32,
        dy: f32,
        viewport_height: f32,
    ) {
        let height = viewport_height.max(1.0);
        let distance = (camera.position - camera.target).length()
            * (camera.projection.fov_y_deg.to_radians() * 0.5).tan();
        let look = camera.look_direction();
        let right = look.cross(WORLD_UP).try_normalize().unwrap_or(Vec3::X);
        let screen_up = right.cross(look);
        let pan_left = 2.0 * dx * distance / height * self.pan_speed;
        let pan_up = 2.0 * dy * distance / height * self.pan_speed;
        self.pan_offset += right * -pan_left + screen_up * pan_up;
    }

    /// Positive steps move towards the target.
    pub fn zoom(&mut self, steps: f32) {
        self.scale *= 0.95f32.powf(steps * self.zoom_speed);
    }

    pub fn is_settled(&self) -> bool {
        self.theta_delta.abs() < 1e-6
            && self.phi_delta.abs() < 1e-6
            && self.pan_offset.length_squared() < 1e-12
            && (self.scale - 1.0).abs() < 1e-6
    }

    /// Applies one damping step to `camera`. Returns true when the camera moved.
    pub fn update(&mut self, camera: &mut CameraController) -> bool {
        let before = (camera.position, camera.target);
        let damping = self.damping_factor.clamp(0.0, 1.0);

        let mut spherical = Spherical::from_offset(camera.position - camera.target);
        spherical.theta += self.theta_delta * damping;
        spherical.phi += self.phi_delta * damping;
        spherical.phi = spherical
            .phi
            .clamp(self.min_polar, self.max_polar)
            .clamp(POLE_EPSILON, PI - POLE_EPSILON);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        camera.target += self.pan_offset * damping;
        camera.position = camera.target + spherical.to_offset();

        self.theta_delta *= 1.0 - damping;
        self.phi_delta *= 1.0 - damping;
        self.pan_offset *= 1.0 - damping;
        self.scale = 1.0;

        (camera.position, camera.target) != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::camera::CameraMovement;

    const EPS: f32 = 1e-4;

    fn camera() -> CameraController {
        CameraController::new(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO, 2.5)
    }

    #[test]
    fn idle_update_keeps_pose() {
        let mut controls = OrbitControls::default();
        let mut camera = camera();
        controls.update(&mut camera);
        assert!((camera.position - Vec3::new(0.0, 1.0, 5.0)).length() < EPS);
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn movement_survives_the_orbit_step() {
        let mut controls = OrbitControls::default();
        let mut camera = camera();
        let held = CameraMovement {
            move_left: true,
            ..CameraMovement::default()
        };
        camera.update_movement(&held, 1.0);
        let moved = camera.position;
        controls.update(&mut camera);
        assert!((camera.position - moved).length() < EPS);
    }

    #[test]
    fn rotation_converges_to_requested_angle() {
        let mut controls = OrbitControls::default();
        let mut camera = CameraController::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 2.5);
        controls.rotate_left(-PI / 2.0);

        let first_moved = controls.update(&mut camera);
        assert!(first_moved);
        for _ in 0..600 {
            controls.update(&mut camera);
        }
        assert!(controls.is_settled());
        // Quarter turn around +Y from +Z lands on +X.
        assert!((camera.position - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-2);
        assert!(((camera.position - camera.target).length() - 5.0).abs() < EPS);
    }

    #[test]
    fn polar_angle_is_clamped_off_the_pole() {
        let mut controls = OrbitControls {
            damping_factor: 1.0,
            ..OrbitControls::default()
        };
        let mut camera = camera();
        controls.rotate_up(10.0);
        controls.update(&mut camera);
        let offset = camera.position - camera.target;
        assert!(offset.y > 0.0);
        assert!(offset.x.is_finite() && offset.z.is_finite());
    }

    #[test]
    fn zoom_scales_distance_within_limits() {
        let mut controls = OrbitControls {
            min_distance: 2.0,
            ..OrbitControls::default()
        };
        let mut camera = CameraController::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 2.5);
        controls.zoom(1.0);
        controls.update(&mut camera);
        assert!((camera.position.z - 4.75).abs() < EPS);

        controls.zoom(100.0);
        controls.update(&mut camera);
        assert!((camera.position.z - 2.0).abs() < EPS);
    }

    #[test]
    fn pan_moves_target_and_eye_together() {
        let mut controls = OrbitControls {
            damping_factor: 1.0,
            ..OrbitControls::default()
        };
        let mut camera = CameraController::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 2.5);
        let offset_before = camera.position - camera.target;
        controls.pan_by_pixels(&camera, 100.0, 0.0, 600.0);
        controls.update(&mut camera);

        assert!(camera.target.x < 0.0);
        assert!(((camera.position - camera.target) - offset_before).length() < EPS);
    }
}
