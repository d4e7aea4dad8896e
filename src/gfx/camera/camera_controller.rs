//! First-person camera driven by held keys
//!
//! The controller only records which keys are down. [`update`] integrates
//! the held keys over a frame's `dt`, so camera motion is frame-rate
//! independent and the maths stays a pure function.

use cgmath::{Matrix4, Rad, SquareMatrix, Vector3, Vector4};
use winit::{
    event::{ElementState, KeyEvent},
    keyboard::{KeyCode, PhysicalKey},
};

/// Translation speed in units per second
pub const MOVE_SPEED: f32 = 1.0;
/// Azimuth speed in radians per second
pub const AZIMUTH_SPEED: f32 = 2.0;
/// Elevation speed in radians per second
pub const ELEVATION_SPEED: f32 = 1.0;

/// Camera state mutated every frame. Angles are unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Rotation about X in radians
    pub elevation: f32,
    /// Rotation about Y in radians
    pub azimuth: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: -0.5,
            z: 0.0,
            elevation: 30f32.to_radians(),
            azimuth: 0.0,
        }
    }
}

/// Keys that move the camera while held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    pub up: bool,
    pub down: bool,
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub tilt_up: bool,
    pub tilt_down: bool,
}

/// What a key press asks of the session besides camera motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    TogglePause,
    Exit,
}

/// Integrates held keys over `dt` seconds
pub fn update(params: CameraParams, keys: &HeldKeys, dt: f32) -> CameraParams {
    let axis = |positive: bool, negative: bool| -> f32 {
        (positive as i32 - negative as i32) as f32
    };

    CameraParams {
        x: params.x + axis(keys.left, keys.right) * MOVE_SPEED * dt,
        y: params.y + axis(keys.down, keys.up) * MOVE_SPEED * dt,
        z: params.z + axis(keys.forward, keys.backward) * MOVE_SPEED * dt,
        elevation: params.elevation + axis(keys.tilt_down, keys.tilt_up) * ELEVATION_SPEED * dt,
        azimuth: params.azimuth + axis(keys.turn_right, keys.turn_left) * AZIMUTH_SPEED * dt,
    }
}

/// translate(x, y, z) · rotateX(elevation) · rotateY(azimuth)
pub fn view_matrix(params: &CameraParams) -> Matrix4<f32> {
    Matrix4::from_translation(Vector3::new(params.x, params.y, params.z))
        * Matrix4::from_angle_x(Rad(params.elevation))
        * Matrix4::from_angle_y(Rad(params.azimuth))
}

/// World-space eye position: inverse(view) applied to the origin
pub fn camera_world_position(view: &Matrix4<f32>) -> Vector3<f32> {
    match view.invert() {
        Some(inverse) => (inverse * Vector4::new(0.0, 0.0, 0.0, 1.0)).truncate(),
        None => Vector3::new(0.0, 0.0, 0.0),
    }
}

/// Tracks held keys from keyboard events
#[derive(Debug, Default)]
pub struct CameraController {
    pub keys: HeldKeys,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_keyboard_event(&mut self, event: &KeyEvent) -> KeyAction {
        let PhysicalKey::Code(code) = event.physical_key else {
            return KeyAction::None;
        };
        self.process_key(code, event.state == ElementState::Pressed, event.repeat)
    }

    /// Updates held state for `code`. Pause toggles once per physical press.
    pub fn process_key(&mut self, code: KeyCode, pressed: bool, repeat: bool) -> KeyAction {
        let slot = match code {
            KeyCode::ArrowUp => &mut self.keys.up,
            KeyCode::ArrowDown => &mut self.keys.down,
            KeyCode::KeyW => &mut self.keys.forward,
            KeyCode::KeyS => &mut self.keys.backward,
            KeyCode::KeyA => &mut self.keys.left,
            KeyCode::KeyD => &mut self.keys.right,
            KeyCode::ArrowLeft => &mut self.keys.turn_left,
            KeyCode::ArrowRight => &mut self.keys.turn_right,
            KeyCode::PageUp => &mut self.keys.tilt_up,
            KeyCode::PageDown => &mut self.keys.tilt_down,
            KeyCode::Space if pressed && !repeat => return KeyAction::TogglePause,
            KeyCode::KeyQ | KeyCode::Escape if pressed => return KeyAction::Exit,
            _ => return KeyAction::None,
        };
        *slot = pressed;
        KeyAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_no_keys_no_motion() {
        let params = CameraParams::default();
        assert_eq!(update(params, &HeldKeys::default(), 0.5), params);
    }

    #[test]
    fn test_keys_integrate_at_fixed_rates() {
        let keys = HeldKeys {
            up: true,
            forward: true,
            left: true,
            turn_right: true,
            ..Default::default()
        };
        let start = CameraParams::default();
        let next = update(start, &keys, 0.25);

        assert!(approx(next.y, start.y - 0.25));
        assert!(approx(next.z, start.z + 0.25));
        assert!(approx(next.x, start.x + 0.25));
        assert!(approx(next.azimuth, start.azimuth + 0.5));
        assert!(approx(next.elevation, start.elevation));
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let keys = HeldKeys {
            turn_left: true,
            turn_right: true,
            ..Default::default()
        };
        let start = CameraParams::default();
        assert_eq!(update(start, &keys, 1.0).azimuth, start.azimuth);
    }

    #[test]
    fn test_rotation_is_not_clamped() {
        let keys = HeldKeys {
            tilt_down: true,
            ..Default::default()
        };
        let mut params = CameraParams::default();
        for _ in 0..10 {
            params = update(params, &keys, 1.0);
        }
        assert!(params.elevation > std::f32::consts::TAU);
    }

    #[test]
    fn test_world_position_inverts_view() {
        let params = CameraParams {
            x: 0.2,
            y: -0.5,
            z: 0.1,
            elevation: 0.0,
            azimuth: 0.0,
        };
        let position = camera_world_position(&view_matrix(&params));
        assert!((position - Vector3::new(-0.2, 0.5, -0.1)).magnitude() < 1e-5);
    }

    #[test]
    fn test_world_position_with_rotation() {
        let params = CameraParams {
            x: 0.0,
            y: 0.0,
            z: -1.0,
            elevation: 0.0,
            azimuth: std::f32::consts::FRAC_PI_2,
        };
        // view = T(0,0,-1) * Ry(90°), eye = Ry(-90°) * (0,0,1)
        let position = camera_world_position(&view_matrix(&params));
        assert!((position - Vector3::new(-1.0, 0.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn test_key_map() {
        let mut controller = CameraController::new();
        assert_eq!(controller.process_key(KeyCode::KeyW, true, false), KeyAction::None);
        assert!(controller.keys.forward);
        controller.process_key(KeyCode::KeyW, false, false);
        assert!(!controller.keys.forward);

        assert_eq!(
            controller.process_key(KeyCode::Space, true, false),
            KeyAction::TogglePause
        );
        assert_eq!(controller.process_key(KeyCode::Space, true, true), KeyAction::None);
        assert_eq!(controller.process_key(KeyCode::Space, false, false), KeyAction::None);
        assert_eq!(controller.process_key(KeyCode::KeyQ, true, false), KeyAction::Exit);
        assert_eq!(controller.process_key(KeyCode::KeyQ, false, false), KeyAction::None);
    }
}
