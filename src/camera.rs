//! # Camera and Camera Controller
//!
//! A free-flying camera described by a position and two angles, and the controller that
//! is the only way to change them.
//!
//! ## Conventions
//!
//! - World up is `+Y`; the camera looks down `front`, derived from yaw and pitch:
//!   `front = (cos(pitch) * cos(yaw), sin(pitch), cos(pitch) * sin(yaw))`.
//! - `right = normalize(front x up)`, so yaw `-90°` with zero pitch looks down `-Z` with
//!   `+X` to the right, and the view matrix of the initial pose is the identity.
//! - Pitch is clamped to `±89°` so `front` never becomes parallel to world up, where the
//!   cross product degenerates.
//! - Movement is a fixed step per call. It is not scaled by elapsed time, so its speed
//!   follows the frame rate.

use nalgebra_glm as glm;

use crate::transform::convert_degrees_to_radians;

/// Largest pitch magnitude, in degrees.
pub const PITCH_LIMIT_DEGREES: f32 = 89.0;

/// Allowed field of view range, in degrees.
pub const ZOOM_RANGE_DEGREES: (f32, f32) = (1.0, 90.0);

/// Camera pose: where it is and where it looks.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: glm::Vec3,
    yaw: f32,
    pitch: f32,
}

impl Default for Camera {
    /// At the origin looking down `-Z`.
    fn default() -> Self {
        Self::new(glm::Vec3::zeros(), convert_degrees_to_radians(-90.0), 0.0)
    }
}

impl Camera {
    /// Creates a camera; `pitch` is clamped to the allowed range.
    pub fn new(position: glm::Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch: clamp_pitch(pitch),
        }
    }

    pub fn position(&self) -> &glm::Vec3 {
        &self.position
    }

    /// Yaw in radians.
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in radians.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Unit vector the camera looks along.
    pub fn front(&self) -> glm::Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        glm::vec3(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    /// Unit vector pointing to the camera's right, always horizontal.
    pub fn right(&self) -> glm::Vec3 {
        self.front().cross(&glm::Vec3::y()).normalize()
    }

    /// Unit vector pointing up in the camera's frame.
    pub fn up(&self) -> glm::Vec3 {
        self.right().cross(&self.front()).normalize()
    }

    /// Right-handed look-at matrix from the current pose.
    pub fn view_matrix(&self) -> glm::Mat4 {
        glm::look_at_rh(
            &self.position,
            &(self.position + self.front()),
            &glm::Vec3::y(),
        )
    }
}

fn clamp_pitch(pitch: f32) -> f32 {
    let limit = convert_degrees_to_radians(PITCH_LIMIT_DEGREES);
    pitch.clamp(-limit, limit)
}

/// Mutates a [`Camera`] through named operations and carries the tuning constants.
#[derive(Debug, Clone)]
pub struct CameraController {
    camera: Camera,
    movement_speed: f32,
    rotation_sensitivity: f32,
    zoom: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(Camera::default())
    }
}

impl CameraController {
    /// World units moved per `move_*` call.
    pub const DEFAULT_MOVEMENT_SPEED: f32 = 0.05;

    /// Radians of rotation per pixel of mouse motion.
    pub const DEFAULT_ROTATION_SENSITIVITY: f32 = 0.0025;

    /// Initial vertical field of view, in degrees.
    pub const DEFAULT_ZOOM: f32 = 45.0;

    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            movement_speed: Self::DEFAULT_MOVEMENT_SPEED,
            rotation_sensitivity: Self::DEFAULT_ROTATION_SENSITIVITY,
            zoom: Self::DEFAULT_ZOOM,
        }
    }

    pub fn with_movement_speed(mut self, movement_speed: f32) -> Self {
        self.movement_speed = movement_speed;
        self
    }

    pub fn with_rotation_sensitivity(mut self, rotation_sensitivity: f32) -> Self {
        self.rotation_sensitivity = rotation_sensitivity;
        self
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    /// Multiplier applied to raw mouse deltas before they reach the offset mutators.
    pub fn rotation_sensitivity(&self) -> f32 {
        self.rotation_sensitivity
    }

    /// Current field of view, in degrees.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Current field of view, in radians.
    pub fn field_of_view(&self) -> f32 {
        convert_degrees_to_radians(self.zoom)
    }

    pub fn move_front(&mut self) {
        self.camera.position += self.camera.front() * self.movement_speed;
    }

    pub fn move_back(&mut self) {
        self.camera.position -= self.camera.front() * self.movement_speed;
    }

    pub fn move_left(&mut self) {
        self.camera.position -= self.camera.right() * self.movement_speed;
    }

    pub fn move_right(&mut self) {
        self.camera.position += self.camera.right() * self.movement_speed;
    }

    /// Turns the camera around world up by `delta` radians.
    pub fn add_yaw_offset(&mut self, delta: f32) {
        self.camera.yaw += delta;
    }

    /// Tilts the camera by `delta` radians, stopping at the pitch limit.
    pub fn add_pitch_offset(&mut self, delta: f32) {
        self.camera.pitch = clamp_pitch(self.camera.pitch + delta);
    }

    /// Narrows the field of view by `delta` degrees (widens it for negative deltas).
    pub fn adjust_zoom(&mut self, delta: f32) {
        let (min, max) = ZOOM_RANGE_DEGREES;
        self.zoom = (self.zoom - delta).clamp(min, max);
    }

    pub fn view_matrix(&self) -> glm::Mat4 {
        self.camera.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn assert_vec_eq(actual: &glm::Vec3, expected: &glm::Vec3) {
        assert!(
            (actual - expected).norm() < EPSILON,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn initial_pose_looks_down_negative_z() {
        let camera = Camera::default();
        assert_vec_eq(&camera.front(), &glm::vec3(0.0, 0.0, -1.0));
        assert_vec_eq(&camera.right(), &glm::vec3(1.0, 0.0, 0.0));
        assert_vec_eq(&camera.up(), &glm::vec3(0.0, 1.0, 0.0));
        assert!((camera.view_matrix() - glm::Mat4::identity()).norm() < EPSILON);
    }

    #[test]
    fn front_is_unit_length_for_any_orientation() {
        let mut controller = CameraController::default();
        for _ in 0..36 {
            controller.add_yaw_offset(convert_degrees_to_radians(10.0));
            for _ in 0..20 {
                controller.add_pitch_offset(convert_degrees_to_radians(10.0));
                let front = controller.camera().front();
                assert!((front.norm() - 1.0).abs() < EPSILON);
            }
            controller.add_pitch_offset(convert_degrees_to_radians(-400.0));
        }
    }

    #[test]
    fn pitch_is_clamped() {
        let mut controller = CameraController::default();
        controller.add_pitch_offset(10.0);
        assert!((controller.camera().pitch() - convert_degrees_to_radians(89.0)).abs() < EPSILON);
        controller.add_pitch_offset(-20.0);
        assert!((controller.camera().pitch() + convert_degrees_to_radians(89.0)).abs() < EPSILON);

        let camera = Camera::new(glm::Vec3::zeros(), 0.0, std::f32::consts::PI);
        assert!(camera.pitch() < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn move_front_advances_by_speed_times_count() {
        let mut controller = CameraController::default().with_movement_speed(0.5);
        let front = controller.camera().front();
        for count in 1..=10 {
            controller.move_front();
            let expected = front * (0.5 * count as f32);
            assert_vec_eq(controller.camera().position(), &expected);
        }
    }

    #[test]
    fn opposite_moves_cancel() {
        let mut controller = CameraController::default();
        controller.add_yaw_offset(0.3);
        controller.move_front();
        controller.move_left();
        controller.move_back();
        controller.move_right();
        assert_vec_eq(controller.camera().position(), &glm::Vec3::zeros());
    }

    #[test]
    fn strafing_stays_horizontal() {
        let mut controller = CameraController::default();
        controller.add_pitch_offset(0.7);
        controller.move_right();
        assert!(controller.camera().position().y.abs() < EPSILON);
        assert!(controller.camera().position().x > 0.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut controller = CameraController::default();
        controller.adjust_zoom(5.0);
        assert_eq!(controller.zoom(), 40.0);
        controller.adjust_zoom(100.0);
        assert_eq!(controller.zoom(), 1.0);
        controller.adjust_zoom(-500.0);
        assert_eq!(controller.zoom(), 90.0);
    }

    #[test]
    fn view_follows_position() {
        let mut controller = CameraController::default();
        controller.move_back();
        // Moving back along -Z puts the camera at +z, so the origin sits in front of it.
        let origin = controller.view_matrix() * glm::vec4(0.0, 0.0, 0.0, 1.0);
        assert!((origin.z + CameraController::DEFAULT_MOVEMENT_SPEED).abs() < EPSILON);
    }
}
