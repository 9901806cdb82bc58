use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("failed to build stream client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("cannot open event source for {url} on `{stage}`: {source}"))]
    OpenEventSource {
        stage: &'static str,
        url: String,
        source: reqwest_eventsource::CannotCloneRequestError,
    },
    #[snafu(display("event stream failed on `{stage}`: {source}"))]
    EventSource {
        stage: &'static str,
        source: reqwest_eventsource::Error,
    },
    #[snafu(display("connection lost on `{stage}`: {details}"))]
    Disconnected {
        stage: &'static str,
        details: String,
    },
}

pub type TransportResult<T> = Result<T, TransportError>;
