use crate::suggestion::Suggestion;

/// Notifications emitted by the ghost input for its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GhostInputEvent {
    /// The active variant was committed into the value. Carries its sources.
    Accepted(Suggestion),
    /// Value and variants were cleared.
    Dismissed,
    VariantCycled { index: usize, total: usize },
}

/// What happened to a single key-down event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not handled; the platform default applies.
    Ignored,
    /// Ordinary typing changed the value.
    Edited,
    /// Auto-repeat of a gesture key. Swallowed without effect.
    Suppressed,
    /// A gesture fired and the platform default must not run.
    Gesture(GhostInputEvent),
}

impl KeyOutcome {
    pub fn prevents_default(&self) -> bool {
        matches!(self, Self::Suppressed | Self::Gesture(_))
    }

    pub fn event(&self) -> Option<&GhostInputEvent> {
        match self {
            Self::Gesture(event) => Some(event),
            _ => None,
        }
    }

    pub fn into_event(self) -> Option<GhostInputEvent> {
        match self {
            Self::Gesture(event) => Some(event),
            _ => None,
        }
    }
}
