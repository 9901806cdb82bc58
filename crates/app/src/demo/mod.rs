//! Canned scenarios for trying the ghost input without a live suggestion feed.

use std::collections::BTreeMap;

use serde::Deserialize;
use snafu::ResultExt;

use crate::error::{AppResult, KeystrokeSnafu, ScenarioCatalogSnafu};
use crate::ghost::{GhostInput, KeyDownEvent, KeyOutcome, Keystroke};
use crate::suggestion::Suggestion;

pub const FALLBACK_SCENARIO: &str = "suivi";

const BUILTIN_CATALOG: &str = include_str!("scenarios.json");

#[derive(Debug, Clone, Deserialize)]
struct ScenarioEntry {
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: BTreeMap<String, ScenarioEntry>,
}

impl ScenarioCatalog {
    pub fn builtin() -> AppResult<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(raw: &str) -> AppResult<Self> {
        let scenarios = serde_json::from_str(raw).context(ScenarioCatalogSnafu {
            stage: "parse-scenario-catalog",
        })?;
        Ok(Self { scenarios })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    /// Variants for `scenario`, or those of the fallback scenario for unknown names.
    pub fn suggestions(&self, scenario: &str) -> &[Suggestion] {
        self.scenarios
            .get(scenario)
            .or_else(|| {
                tracing::debug!(scenario, "unknown scenario, using {FALLBACK_SCENARIO}");
                self.scenarios.get(FALLBACK_SCENARIO)
            })
            .map(|entry| entry.suggestions.as_slice())
            .unwrap_or_default()
    }
}

/// Feeds whitespace-separated keystrokes (`"ctrl-tab tab"`) to a focused input.
pub fn replay_keys(input: &mut GhostInput, keys: &str) -> AppResult<Vec<KeyOutcome>> {
    keys.split_whitespace()
        .map(|binding| {
            let keystroke = Keystroke::parse(binding).context(KeystrokeSnafu {
                stage: "replay-keys",
            })?;
            Ok(input.handle_key(&KeyDownEvent::new(keystroke)))
        })
        .collect()
}
