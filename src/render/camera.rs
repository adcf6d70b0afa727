use crate::scene::Bounds;
use glam::{Mat4, Vec3};

pub const WORLD_UP: Vec3 = Vec3::Y;

/// Held movement keys, one flag per direction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CameraMovement {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
}

impl CameraMovement {
    pub fn any(&self) -> bool {
        self.move_forward
            || self.move_backward
            || self.move_left
            || self.move_right
            || self.move_up
            || self.move_down
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y_deg: 75.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Camera state handed to the rasterizer for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
}

/// Free-fly camera. Orientation is implied by `target`, which the orbit controls own as well.
#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    pub position: Vec3,
    pub target: Vec3,
    pub speed: f32,
    pub projection: Projection,
}

impl CameraController {
    pub fn new(position: Vec3, target: Vec3, speed: f32) -> Self {
        Self {
            position,
            target,
            speed,
            projection: Projection::default(),
        }
    }

    /// Unit vector from the eye towards the target.
    pub fn look_direction(&self) -> Vec3 {
        (self.target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z)
    }

    /// Unit vector `up × look`; points to the viewer's left.
    pub fn strafe_axis(&self) -> Vec3 {
        WORLD_UP
            .cross(self.look_direction())
            .try_normalize()
            .unwrap_or(Vec3::NEG_X)
    }

    /// Moves the eye along each held direction by `speed * frame_dt`. The target stays put.
    pub fn update_movement(&mut self, input: &CameraMovement, frame_dt: f32) -> bool {
        if !input.any() || frame_dt <= 0.0 {
            return false;
        }
        let step = self.speed * frame_dt;
        let look = self.look_direction();
        let left = self.strafe_axis();
        let mut delta = Vec3::ZERO;

        if input.move_forward {
            delta += look * step;
        }
        if input.move_backward {
            delta -= look * step;
        }
        if input.move_left {
            delta += left * step;
        }
        if input.move_right {
            delta -= left * step;
        }
        if input.move_up {
            delta += WORLD_UP * step;
        }
        if input.move_down {
            delta -= WORLD_UP * step;
        }

        self.position += delta;
        delta != Vec3::ZERO
    }

    /// Re-aims at the bounds center from a distance that fits them, keeping the view direction.
    pub fn frame_bounds(&mut self, bounds: &Bounds) {
        let radius = bounds.extent().max_element();
        let distance = if radius > 0.0 { radius * 3.0 } else { 3.0 };
        let look = self.look_direction();
        self.target = bounds.center();
        self.position = self.target - look * distance;
    }

    pub fn view(&self, aspect: f32) -> CameraView {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        CameraView {
            eye: self.position,
            target: self.target,
            up: WORLD_UP,
            view: Mat4::look_at_rh(self.position, self.target, WORLD_UP),
            projection: Mat4::perspective_rh(
                self.projection.fov_y_deg.to_radians(),
                aspect,
                self.projection.near,
                self.projection.far,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn camera() -> CameraController {
        CameraController::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 2.5)
    }

    #[test]
    fn forward_moves_speed_times_dt_along_look() {
        let mut camera = camera();
        let look = camera.look_direction();
        let start = camera.position;
        let held = CameraMovement {
            move_forward: true,
            ..CameraMovement::default()
        };

        assert!(camera.update_movement(&held, 1.0));
        let moved = camera.position - start;
        assert!((moved.length() - 2.5).abs() < EPS);
        assert!((moved.normalize() - look).length() < EPS);

        let released = CameraMovement::default();
        let before = camera.position;
        assert!(!camera.update_movement(&released, 1.0));
        assert_eq!(camera.position, before);
    }

    #[test]
    fn strafe_uses_up_cross_look() {
        let mut camera = camera();
        // Looking down -Z, up × look is -X.
        assert!((camera.strafe_axis() - Vec3::NEG_X).length() < EPS);

        let left = CameraMovement {
            move_left: true,
            ..CameraMovement::default()
        };
        camera.update_movement(&left, 0.5);
        assert!((camera.position - Vec3::new(-1.25, 0.0, 5.0)).length() < EPS);

        let right = CameraMovement {
            move_right: true,
            ..CameraMovement::default()
        };
        camera.update_movement(&right, 0.5);
        assert!((camera.position - Vec3::new(0.0, 0.0, 5.0)).length() < EPS);
    }

    #[test]
    fn vertical_movement_follows_world_up() {
        let mut camera = CameraController::new(Vec3::new(2.0, 2.0, 5.0), Vec3::new(0.0, 0.75, 0.0), 2.5);
        let up = CameraMovement {
            move_up: true,
            ..CameraMovement::default()
        };
        camera.update_movement(&up, 0.2);
        assert!((camera.position - Vec3::new(2.0, 2.5, 5.0)).length() < EPS);
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut camera = camera();
        let both = CameraMovement {
            move_forward: true,
            move_backward: true,
            ..CameraMovement::default()
        };
        assert!(!camera.update_movement(&both, 1.0));
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn frame_bounds_preserves_direction() {
        let mut camera = camera();
        let look = camera.look_direction();
        camera.frame_bounds(&Bounds {
            min: Vec3::new(9.0, -1.0, -1.0),
            max: Vec3::new(11.0, 1.0, 1.0),
        });
        assert_eq!(camera.target, Vec3::new(10.0, 0.0, 0.0));
        assert!((camera.look_direction() - look).length() < EPS);
        assert!(((camera.target - camera.position).length() - 3.0).abs() < EPS);
    }

    #[test]
    fn view_is_finite_for_degenerate_aspect() {
        let view = camera().view(0.0);
        assert!(view.projection.is_finite());
        assert!(view.view.is_finite());
    }
}
