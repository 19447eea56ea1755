//! Player input handling

use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;

/// Radians of camera rotation per pixel of mouse motion
pub const MOUSE_SENSITIVITY: f32 = 0.002;

/// Walking speed used to turn WASD into a velocity (m/s)
pub const WALK_SPEED: f32 = 3.5;
pub const RUN_SPEED: f32 = 6.0;

/// One-frame weapon requests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Triggers {
    pub fire: bool,
    pub reload: bool,
    pub melee: bool,
    pub switch_mode: bool,
    pub interact: bool,
    pub vault: bool,
    pub toggle_holster: bool,
    /// Equip slot 1 (rifle) or 2 (fists)
    pub equip: Option<usize>,
}

/// Client-side input state
#[derive(Resource, Debug, Default)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub running: bool,
    pub sliding: bool,
    /// Right-click = Aim Down Sights
    pub aiming: bool,
    /// Mouse motion accumulated this frame (pixels)
    pub mouse_delta: Vec2,
    pub yaw: f32,
    pub pitch: f32,
    pub triggers: Triggers,
}

impl InputState {
    /// -1 (left) to 1 (right)
    pub fn strafe(&self) -> f32 {
        self.right as i32 as f32 - self.left as i32 as f32
    }

    pub fn is_moving(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }

    /// Local-space velocity implied by the held movement keys
    pub fn velocity(&self) -> Vec3 {
        let direction = Vec3::new(
            self.strafe(),
            0.0,
            self.backward as i32 as f32 - self.forward as i32 as f32,
        );
        let speed = if self.running { RUN_SPEED } else { WALK_SPEED };
        direction.normalize_or_zero() * speed
    }
}

pub fn handle_keyboard_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut input_state: ResMut<InputState>,
) {
    input_state.forward = keyboard.pressed(KeyCode::KeyW);
    input_state.backward = keyboard.pressed(KeyCode::KeyS);
    input_state.left = keyboard.pressed(KeyCode::KeyA);
    input_state.right = keyboard.pressed(KeyCode::KeyD);
    let shift = keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight);
    input_state.running = shift && input_state.forward;
    input_state.sliding = keyboard.pressed(KeyCode::KeyC) && input_state.is_moving();

    let triggers = &mut input_state.triggers;
    triggers.reload = keyboard.just_pressed(KeyCode::KeyR);
    triggers.melee = keyboard.just_pressed(KeyCode::KeyF);
    triggers.switch_mode = keyboard.just_pressed(KeyCode::KeyB);
    triggers.interact = keyboard.just_pressed(KeyCode::KeyE);
    triggers.vault = keyboard.just_pressed(KeyCode::KeyV);
    triggers.toggle_holster = keyboard.just_pressed(KeyCode::KeyH);
    triggers.equip = if keyboard.just_pressed(KeyCode::Digit1) {
        Some(0)
    } else if keyboard.just_pressed(KeyCode::Digit2) {
        Some(1)
    } else {
        None
    };
}

pub fn handle_mouse_input(
    mut mouse_motion: MessageReader<MouseMotion>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut input_state: ResMut<InputState>,
) {
    input_state.aiming = mouse_button.pressed(MouseButton::Right);
    input_state.triggers.fire = mouse_button.just_pressed(MouseButton::Left);

    let mut delta = Vec2::ZERO;
    for motion in mouse_motion.read() {
        delta += motion.delta;
    }
    input_state.mouse_delta = delta;

    // Slower look while aiming for finer control
    let sensitivity = if input_state.aiming {
        MOUSE_SENSITIVITY * 0.5
    } else {
        MOUSE_SENSITIVITY
    };
    input_state.yaw -= delta.x * sensitivity;
    input_state.pitch = (input_state.pitch - delta.y * sensitivity).clamp(-1.5, 1.5);
}

/// Point the camera where the mouse says
pub fn update_camera_look(
    input_state: Res<InputState>,
    mut camera: Query<&mut Transform, With<Camera3d>>,
) {
    let Ok(mut transform) = camera.single_mut() else {
        return;
    };
    transform.rotation = Quat::from_euler(EulerRot::YXZ, input_state.yaw, input_state.pitch, 0.0);
}
