//! Keyboard state machine driving camera, orbit and spin

use std::collections::HashSet;

use log::trace;

use crate::scene::SceneState;

/// Degrees of spin or orbit applied per key event
pub const ANGLE_STEP_DEGREES: f32 = 1.0;
/// Eye movement along Z per key event
pub const EYE_STEP: f32 = 0.01;

/// Keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    A,
    D,
}

/// What the platform should do with the event after it was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyResponse {
    /// The event moved the camera or orbit; default handling (page scroll) should be suppressed
    pub suppress_default: bool,
}

/// Tracks held keys and applies their effect on every key-down event
#[derive(Debug, Clone, Default)]
pub struct InputController {
    held: HashSet<Key>,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Record a press and apply every held key's effect once.
    ///
    /// Within each pair the first key wins when both are held: `A` over `D`,
    /// `ArrowUp` over `ArrowDown`, `ArrowLeft` over `ArrowRight`.
    pub fn key_down(&mut self, key: Key, scene: &mut SceneState) -> KeyResponse {
        self.held.insert(key);
        let mut response = KeyResponse::default();

        if self.is_held(Key::A) {
            scene.spin_degrees -= ANGLE_STEP_DEGREES;
        } else if self.is_held(Key::D) {
            scene.spin_degrees += ANGLE_STEP_DEGREES;
        }

        if self.is_held(Key::ArrowUp) {
            scene.camera.eye.z += EYE_STEP;
            response.suppress_default = true;
        } else if self.is_held(Key::ArrowDown) {
            scene.camera.eye.z -= EYE_STEP;
            response.suppress_default = true;
        }

        if self.is_held(Key::ArrowLeft) {
            scene.orbit_degrees += ANGLE_STEP_DEGREES;
            response.suppress_default = true;
        } else if self.is_held(Key::ArrowRight) {
            scene.orbit_degrees -= ANGLE_STEP_DEGREES;
            response.suppress_default = true;
        }

        trace!(
            "key {:?}: spin {} eye z {} orbit {}",
            key,
            scene.spin_degrees,
            scene.camera.eye.z,
            scene.orbit_degrees
        );
        response
    }

    /// Forget a key; releasing never changes the scene
    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn release_all(&mut self) {
        self.held.clear();
    }
}
