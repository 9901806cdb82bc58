use super::events::{GhostInputEvent, KeyOutcome};
use super::keymap::{Gesture, KeyDownEvent};
use crate::suggestion::Suggestion;

pub const DEFAULT_PLACEHOLDER: &str = "Commencez à taper...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostState {
    /// No variants and no typed text.
    Empty,
    /// The variant at the index is shown as ghost text over an empty value.
    Previewing(usize),
    /// The operator typed or accepted text.
    Editing,
}

/// Entry in the keyboard hint row under the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHint {
    pub gesture: Gesture,
    pub keys: &'static str,
    pub label: String,
}

/// Text input that previews suggestion variants as ghost text and reacts to the
/// accept / dismiss / cycle gestures while focused.
#[derive(Debug, Clone)]
pub struct GhostInput {
    value: String,
    variants: Vec<Suggestion>,
    active_index: usize,
    focused: bool,
    placeholder: String,
}

impl Default for GhostInput {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER)
    }
}

impl GhostInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            value: String::new(),
            variants: Vec::new(),
            active_index: 0,
            focused: false,
            placeholder: placeholder.into(),
        }
    }

    pub fn state(&self) -> GhostState {
        if !self.value.is_empty() {
            GhostState::Editing
        } else if self.variants.is_empty() {
            GhostState::Empty
        } else {
            GhostState::Previewing(self.active_index)
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn variants(&self) -> &[Suggestion] {
        &self.variants
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn current_variant(&self) -> Option<&Suggestion> {
        self.variants.get(self.active_index)
    }

    /// Text drawn over the empty input.
    pub fn ghost_text(&self) -> Option<&str> {
        if !self.value.is_empty() {
            return None;
        }
        self.current_variant().map(|variant| variant.text.as_str())
    }

    /// Placeholder shown when there is neither a value nor a variant.
    pub fn placeholder(&self) -> Option<&str> {
        (self.value.is_empty() && self.variants.is_empty()).then_some(self.placeholder.as_str())
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Replaces the variant list. The same list supplied again keeps the position the
    /// operator cycled to; anything else starts over at the first variant.
    pub fn set_variants(&mut self, variants: Vec<Suggestion>) {
        if variants == self.variants {
            return;
        }
        tracing::debug!(count = variants.len(), "ghost variants replaced");
        self.variants = variants;
        self.active_index = 0;
    }

    pub fn clear_variants(&mut self) {
        self.variants.clear();
        self.active_index = 0;
    }

    pub fn insert_text(&mut self, text: &str) {
        self.value.push_str(text);
    }

    pub fn backspace(&mut self) -> bool {
        self.value.pop().is_some()
    }

    /// Hands the committed text to the caller and empties the input.
    pub fn take_value(&mut self) -> String {
        std::mem::take(&mut self.value)
    }

    pub fn accept(&mut self) -> Option<GhostInputEvent> {
        let variant = self.current_variant()?.clone();
        self.value.clone_from(&variant.text);
        Some(GhostInputEvent::Accepted(variant))
    }

    /// Commits a suggestion picked outside the variant list, such as the panel's
    /// "use" action.
    pub fn accept_suggestion(&mut self, suggestion: Suggestion) -> GhostInputEvent {
        self.value.clone_from(&suggestion.text);
        GhostInputEvent::Accepted(suggestion)
    }

    pub fn dismiss(&mut self) -> GhostInputEvent {
        self.value.clear();
        self.clear_variants();
        GhostInputEvent::Dismissed
    }

    pub fn cycle_variant(&mut self) -> Option<GhostInputEvent> {
        let total = self.variants.len();
        if total <= 1 {
            return None;
        }
        self.active_index = (self.active_index + 1) % total;
        Some(GhostInputEvent::VariantCycled {
            index: self.active_index,
            total,
        })
    }

    fn can_perform(&self, gesture: Gesture) -> bool {
        match gesture {
            Gesture::Accept => self.current_variant().is_some(),
            Gesture::Dismiss => true,
            Gesture::CycleVariant => self.variants.len() > 1,
        }
    }

    pub fn handle_key(&mut self, event: &KeyDownEvent) -> KeyOutcome {
        if !self.focused {
            return KeyOutcome::Ignored;
        }

        let keystroke = &event.keystroke;
        if let Some(gesture) = Gesture::for_keystroke(keystroke) {
            if !self.can_perform(gesture) {
                return KeyOutcome::Ignored;
            }
            if event.is_held {
                return KeyOutcome::Suppressed;
            }

            let fired = match gesture {
                Gesture::Accept => self.accept(),
                Gesture::Dismiss => Some(self.dismiss()),
                Gesture::CycleVariant => self.cycle_variant(),
            };
            return fired.map_or(KeyOutcome::Ignored, KeyOutcome::Gesture);
        }

        if keystroke.key == "backspace" && keystroke.modifiers.is_empty() {
            return if self.backspace() {
                KeyOutcome::Edited
            } else {
                KeyOutcome::Ignored
            };
        }

        match keystroke.key_char.as_deref() {
            Some(text) => {
                self.insert_text(text);
                KeyOutcome::Edited
            }
            None => KeyOutcome::Ignored,
        }
    }

    pub fn hints(&self) -> Vec<KeyHint> {
        let mut hints = Vec::new();
        if self.current_variant().is_some() {
            hints.push(KeyHint {
                gesture: Gesture::Accept,
                keys: Gesture::Accept.key_label(),
                label: "pour accepter".to_string(),
            });
        }
        hints.push(KeyHint {
            gesture: Gesture::Dismiss,
            keys: Gesture::Dismiss.key_label(),
            label: "pour ignorer".to_string(),
        });
        if self.variants.len() > 1 {
            hints.push(KeyHint {
                gesture: Gesture::CycleVariant,
                keys: Gesture::CycleVariant.key_label(),
                label: format!(
                    "variante suivante ({}/{})",
                    self.active_index + 1,
                    self.variants.len()
                ),
            });
        }
        hints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ghost::keymap::Keystroke;
    use crate::suggestion::Source;

    fn key(source: &str) -> KeyDownEvent {
        KeyDownEvent::new(Keystroke::parse(source).expect("valid keystroke"))
    }

    fn focused_with(texts: &[&str]) -> GhostInput {
        let mut input = GhostInput::default();
        input.focus();
        input.set_variants(texts.iter().map(|text| Suggestion::new(*text)).collect());
        input
    }

    #[test]
    fn starts_empty_with_placeholder() {
        let input = GhostInput::default();
        assert_eq!(input.state(), GhostState::Empty);
        assert_eq!(input.placeholder(), Some(DEFAULT_PLACEHOLDER));
        assert_eq!(input.ghost_text(), None);
    }

    #[test]
    fn tab_accepts_the_previewed_variant() {
        let source = Source {
            title: "Suivi".into(),
            snippet: "48h".into(),
            url: "/kb/suivi".into(),
        };
        let mut input = GhostInput::default();
        input.focus();
        input.set_variants(vec![Suggestion::new("Hello").with_sources(vec![source.clone()])]);
        assert_eq!(input.state(), GhostState::Previewing(0));
        assert_eq!(input.ghost_text(), Some("Hello"));

        let outcome = input.handle_key(&key("tab"));

        assert!(outcome.prevents_default());
        assert_eq!(
            outcome.into_event(),
            Some(GhostInputEvent::Accepted(
                Suggestion::new("Hello").with_sources(vec![source])
            ))
        );
        assert_eq!(input.value(), "Hello");
        assert_eq!(input.state(), GhostState::Editing);
        assert_eq!(input.ghost_text(), None);
    }

    #[test]
    fn cycling_then_accepting_commits_the_second_variant() {
        let mut input = focused_with(&["A", "B"]);

        let cycled = input.handle_key(&key("ctrl-tab"));
        assert_eq!(
            cycled.event(),
            Some(&GhostInputEvent::VariantCycled { index: 1, total: 2 })
        );
        assert_eq!(input.value(), "");
        assert_eq!(input.ghost_text(), Some("B"));

        input.handle_key(&key("tab"));
        assert_eq!(input.value(), "B");
    }

    #[test]
    fn cycling_wraps_around() {
        let mut input = focused_with(&["A", "B", "C"]);
        for _ in 0..3 {
            input.handle_key(&key("cmd-tab"));
        }
        assert_eq!(input.active_index(), 0);
        assert_eq!(input.state(), GhostState::Previewing(0));
    }

    #[test]
    fn cycle_chord_with_one_variant_does_nothing() {
        let mut input = focused_with(&["only"]);

        let outcome = input.handle_key(&key("ctrl-tab"));

        assert_eq!(outcome, KeyOutcome::Ignored);
        assert_eq!(input.value(), "");
        assert_eq!(input.active_index(), 0);
    }

    #[test]
    fn escape_clears_value_and_variants_once() {
        let mut input = focused_with(&["A", "B"]);
        input.handle_key(&key("tab"));

        let outcome = input.handle_key(&key("escape"));

        assert_eq!(outcome, KeyOutcome::Gesture(GhostInputEvent::Dismissed));
        assert_eq!(input.value(), "");
        assert!(input.variants().is_empty());
        assert_eq!(input.state(), GhostState::Empty);
    }

    #[test]
    fn tab_without_variant_keeps_platform_default() {
        let mut input = GhostInput::default();
        input.focus();
        assert_eq!(input.handle_key(&key("tab")), KeyOutcome::Ignored);
    }

    #[test]
    fn typing_over_ghost_text_switches_to_editing() {
        let mut input = focused_with(&["Bonjour"]);

        assert_eq!(input.handle_key(&key("shift-m")), KeyOutcome::Edited);
        input.handle_key(&key("e"));
        input.handle_key(&key("r"));
        input.handle_key(&key("backspace"));

        assert_eq!(input.value(), "Me");
        assert_eq!(input.state(), GhostState::Editing);
        assert_eq!(input.ghost_text(), None);
    }

    #[test]
    fn keys_are_ignored_without_focus() {
        let mut input = focused_with(&["A"]);
        input.blur();

        assert_eq!(input.handle_key(&key("tab")), KeyOutcome::Ignored);
        assert_eq!(input.handle_key(&key("x")), KeyOutcome::Ignored);
        assert_eq!(input.value(), "");
    }

    #[test]
    fn held_gesture_keys_fire_once() {
        let mut input = focused_with(&["A", "B"]);
        let chord = Keystroke::parse("ctrl-tab").expect("valid keystroke");

        input.handle_key(&KeyDownEvent::new(chord.clone()));
        let repeated = input.handle_key(&KeyDownEvent::held(chord));

        assert_eq!(repeated, KeyOutcome::Suppressed);
        assert_eq!(input.active_index(), 1);
    }

    #[test]
    fn identical_variants_keep_the_cycled_position() {
        let mut input = focused_with(&["A", "B"]);
        input.cycle_variant();

        input.set_variants(vec![Suggestion::new("A"), Suggestion::new("B")]);
        assert_eq!(input.active_index(), 1);

        input.set_variants(vec![Suggestion::new("C"), Suggestion::new("D")]);
        assert_eq!(input.active_index(), 0);
    }

    #[test]
    fn new_variants_while_editing_keep_the_typed_value() {
        let mut input = focused_with(&["A"]);
        input.insert_text("draft");

        input.set_variants(vec![Suggestion::new("B")]);

        assert_eq!(input.value(), "draft");
        assert_eq!(input.state(), GhostState::Editing);
    }

    #[test]
    fn hints_show_the_variant_counter() {
        let mut input = focused_with(&["A", "B"]);
        input.cycle_variant();

        let hints = input.hints();

        assert_eq!(hints.len(), 3);
        assert_eq!(hints[2].keys, "Ctrl+Tab");
        assert_eq!(hints[2].label, "variante suivante (2/2)");
        assert_eq!(focused_with(&[]).hints().len(), 1);
    }

    #[test]
    fn explicit_suggestion_is_committed_without_touching_variants() {
        let mut input = focused_with(&["A", "B"]);

        let event = input.accept_suggestion(Suggestion::new("Depuis le panneau"));

        assert_eq!(
            event,
            GhostInputEvent::Accepted(Suggestion::new("Depuis le panneau"))
        );
        assert_eq!(input.value(), "Depuis le panneau");
        assert_eq!(input.variants().len(), 2);
    }

    #[test]
    fn take_value_empties_the_input() {
        let mut input = focused_with(&["Merci"]);
        input.accept();

        assert_eq!(input.take_value(), "Merci");
        assert_eq!(input.value(), "");
        assert_eq!(input.ghost_text(), Some("Merci"));
    }
}
