use std::fmt;

use snafu::{Snafu, ensure};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum KeystrokeError {
    #[snafu(display("empty keystroke"))]
    EmptyKeystroke { stage: &'static str },

    #[snafu(display("unknown modifier `{modifier}` in `{source_text}`"))]
    UnknownModifier {
        stage: &'static str,
        modifier: String,
        source_text: String,
    },
}

pub type KeystrokeResult<T> = Result<T, KeystrokeError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub control: bool,
    pub alt: bool,
    pub shift: bool,
    /// Cmd on macOS, the Windows/Super key elsewhere.
    pub platform: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn control() -> Self {
        Self {
            control: true,
            ..Self::default()
        }
    }

    pub fn platform() -> Self {
        Self {
            platform: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::none()
    }

    /// Ctrl or Cmd alone, the "secondary" chord used for variant cycling.
    pub fn is_secondary_only(&self) -> bool {
        *self == Self::control() || *self == Self::platform()
    }

    /// Modifiers that turn a key into a shortcut rather than text.
    fn is_shortcut(&self) -> bool {
        self.control || self.alt || self.platform
    }
}

/// A key press in the `ctrl-tab` notation used for bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Keystroke {
    pub modifiers: Modifiers,
    pub key: String,
    /// Text the key would insert, if any.
    pub key_char: Option<String>,
}

impl Keystroke {
    /// Parses `[modifier-]*key`, e.g. `tab`, `ctrl-tab`, `cmd-tab`, `shift-a`, `space`.
    pub fn parse(source: &str) -> KeystrokeResult<Self> {
        let source_text = source.trim();
        ensure!(
            !source_text.is_empty(),
            EmptyKeystrokeSnafu {
                stage: "parse-keystroke",
            }
        );

        // A trailing `-` is the minus key itself, as in `ctrl--`.
        let (prefix, key) = match source_text.strip_suffix("--") {
            Some(prefix) => (prefix, "-"),
            None => match source_text.rsplit_once('-') {
                Some((prefix, key)) if !key.is_empty() => (prefix, key),
                _ => ("", source_text),
            },
        };

        let mut modifiers = Modifiers::none();
        for modifier in prefix.split('-').filter(|part| !part.is_empty()) {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.control = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "cmd" | "super" | "win" | "platform" => modifiers.platform = true,
                _ => {
                    return UnknownModifierSnafu {
                        stage: "parse-keystroke",
                        modifier: modifier.to_string(),
                        source_text: source_text.to_string(),
                    }
                    .fail();
                }
            }
        }

        Ok(Self::new(modifiers, key))
    }

    pub fn new(modifiers: Modifiers, key: &str) -> Self {
        let key = if key.chars().count() == 1 {
            key.to_string()
        } else {
            key.to_ascii_lowercase()
        };
        let key_char = text_for(&modifiers, &key);
        Self {
            modifiers,
            key,
            key_char,
        }
    }

    /// The keystroke that types `character` with no shortcut modifiers.
    pub fn character(character: char) -> Self {
        let modifiers = Modifiers {
            shift: character.is_uppercase(),
            ..Modifiers::none()
        };
        Self {
            modifiers,
            key: character.to_lowercase().collect(),
            key_char: Some(character.to_string()),
        }
    }
}

fn text_for(modifiers: &Modifiers, key: &str) -> Option<String> {
    if modifiers.is_shortcut() {
        return None;
    }
    if key == "space" {
        return Some(" ".to_string());
    }

    let mut chars = key.chars();
    let character = chars.next()?;
    if chars.next().is_some() || character.is_control() {
        return None;
    }

    Some(if modifiers.shift {
        character.to_uppercase().collect()
    } else {
        character.to_string()
    })
}

impl fmt::Display for Keystroke {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.control {
            formatter.write_str("ctrl-")?;
        }
        if self.modifiers.alt {
            formatter.write_str("alt-")?;
        }
        if self.modifiers.shift {
            formatter.write_str("shift-")?;
        }
        if self.modifiers.platform {
            formatter.write_str("cmd-")?;
        }
        formatter.write_str(&self.key)
    }
}

/// Key-down event as delivered by the focused input. There is no key-up handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDownEvent {
    pub keystroke: Keystroke,
    /// Auto-repeat while the key is held down.
    pub is_held: bool,
}

impl KeyDownEvent {
    pub fn new(keystroke: Keystroke) -> Self {
        Self {
            keystroke,
            is_held: false,
        }
    }

    pub fn held(keystroke: Keystroke) -> Self {
        Self {
            keystroke,
            is_held: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    Accept,
    Dismiss,
    CycleVariant,
}

/// Fixed bindings. Ctrl and Cmd both cycle so the chord works on every platform.
pub const GESTURE_BINDINGS: [(&str, Gesture); 4] = [
    ("tab", Gesture::Accept),
    ("escape", Gesture::Dismiss),
    ("ctrl-tab", Gesture::CycleVariant),
    ("cmd-tab", Gesture::CycleVariant),
];

impl Gesture {
    /// Resolves the gesture bound to `keystroke`. The chorded form is matched first so
    /// `ctrl-tab` can never fall through to a plain accept.
    pub fn for_keystroke(keystroke: &Keystroke) -> Option<Self> {
        let modifiers = &keystroke.modifiers;
        match keystroke.key.as_str() {
            "tab" if modifiers.is_secondary_only() => Some(Self::CycleVariant),
            "tab" if modifiers.is_empty() => Some(Self::Accept),
            "escape" if modifiers.is_empty() => Some(Self::Dismiss),
            _ => None,
        }
    }

    /// Label for the keyboard hint row.
    pub fn key_label(self) -> &'static str {
        match self {
            Self::Accept => "Tab",
            Self::Dismiss => "Esc",
            Self::CycleVariant => "Ctrl+Tab",
        }
    }
}
