use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GatewayError {
    #[snafu(display("failed to build HTTP client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("{operation} request failed on `{stage}`: {source}"))]
    Request {
        stage: &'static str,
        operation: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("{operation} failed with HTTP status {status}"))]
    Status {
        stage: &'static str,
        operation: &'static str,
        status: u16,
    },
    #[snafu(display("failed to decode {operation} response on `{stage}`: {source}"))]
    Decode {
        stage: &'static str,
        operation: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("conversation '{id}' was not found"))]
    ConversationNotFound { stage: &'static str, id: String },
}

impl GatewayError {
    /// HTTP status embedded in the error, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request { source, .. } | Self::Decode { source, .. } => {
                source.status().map(|status| status.as_u16())
            }
            Self::BuildClient { .. } | Self::ConversationNotFound { .. } => None,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
