use snafu::Snafu;
use souffle_gateway::GatewayError;
use souffle_stream::TransportError;

use crate::ghost::KeystrokeError;
use crate::settings::SettingsError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("conversation request failed on `{stage}`: {source}"))]
    Gateway {
        stage: &'static str,
        source: GatewayError,
    },
    #[snafu(display("suggestion feed unavailable on `{stage}`: {source}"))]
    Transport {
        stage: &'static str,
        source: TransportError,
    },
    #[snafu(display("invalid keystroke on `{stage}`: {source}"))]
    Keystroke {
        stage: &'static str,
        source: KeystrokeError,
    },
    #[snafu(display("failed to parse scenario catalog on `{stage}`: {source}"))]
    ScenarioCatalog {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("settings unavailable on `{stage}`: {source}"))]
    Settings {
        stage: &'static str,
        source: SettingsError,
    },
    #[snafu(display("suggestion feed failed for conversation {conversation_id}: {message}"))]
    FeedFailed {
        stage: &'static str,
        conversation_id: String,
        message: String,
    },
}

pub type AppResult<T> = Result<T, AppError>;
