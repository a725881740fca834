use std::time::Duration;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ChatApiError {
    #[snafu(display("chat id '{raw}' is invalid for {id_type}"))]
    InvalidId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
    },
    #[snafu(display("chat service base url '{url}' is invalid on `{stage}`: {source}"))]
    InvalidBaseUrl {
        stage: &'static str,
        url: String,
        source: url::ParseError,
    },
    #[snafu(display("chat service base url '{url}' cannot carry path segments on `{stage}`"))]
    UnsupportedBaseUrl { stage: &'static str, url: String },
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("chat service request to {url} failed on `{stage}`: {source}"))]
    Transport {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("chat service returned status {status} on `{stage}`: {body}"))]
    UnexpectedStatus {
        stage: &'static str,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to decode chat service payload on `{stage}`: {source}"))]
    Decode {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("chat service call `{stage}` did not settle within {timeout:?}"))]
    RequestTimeout {
        stage: &'static str,
        timeout: Duration,
    },
}

impl ChatApiError {
    /// Pipeline stage that produced the error, for structured logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidId { stage, .. }
            | Self::InvalidBaseUrl { stage, .. }
            | Self::UnsupportedBaseUrl { stage, .. }
            | Self::BuildClient { stage, .. }
            | Self::Transport { stage, .. }
            | Self::UnexpectedStatus { stage, .. }
            | Self::Decode { stage, .. }
            | Self::RequestTimeout { stage, .. } => stage,
        }
    }
}

pub type ChatApiResult<T> = Result<T, ChatApiError>;
