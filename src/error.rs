//! Error types for backend calls, media playback and location reads.

use thiserror::Error;

use crate::loading::LoadingStep;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}: {detail}")]
    Status {
        endpoint: &'static str,
        status: u16,
        detail: String,
    },

    #[error("malformed response from {endpoint}: {detail}")]
    Malformed {
        endpoint: &'static str,
        detail: String,
    },
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("could not decode audio: {0}")]
    Decode(String),

    #[error("failed to launch player `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("location permission denied")]
    Denied,

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// A loading step failed; the session cannot start.
#[derive(Debug, Error)]
#[error("loading failed while {step}: {source}")]
pub struct LoadingError {
    pub step: LoadingStep,
    #[source]
    pub source: BackendError,
}
