//! Ghost-text input: previews suggestion variants and handles the keyboard gestures.

pub mod events;
pub mod input;
pub mod keymap;

pub use events::{GhostInputEvent, KeyOutcome};
pub use input::{DEFAULT_PLACEHOLDER, GhostInput, GhostState, KeyHint};
pub use keymap::{
    GESTURE_BINDINGS, Gesture, KeyDownEvent, KeystrokeError, KeystrokeResult, Keystroke, Modifiers,
};
