//! Suggestion feed: accumulation of streamed text and the panel that offers it.

pub mod accumulator;
pub mod panel;
pub mod types;

pub use accumulator::SuggestionAccumulator;
pub use panel::{PanelFrames, PanelUpdate, PanelView, SuggestionPanel};
pub use types::{Source, Suggestion};
