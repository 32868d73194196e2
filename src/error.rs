use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a report run.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot open log file '{}'", path.display())]
    OpenLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed reading log file '{}'", path.display())]
    ReadLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("failed to write CSV report")]
    Csv(#[from] csv::Error),

    #[error("failed to write JSON report")]
    Json(#[from] serde_json::Error),

    #[error("failed to write report")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read providers file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed providers file '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("at least one geolocation provider is required")]
    NoProviders,

    #[error("provider #{index} has an empty label")]
    EmptyLabel { index: usize },

    #[error("provider '{label}' URL has no {{ip}} placeholder")]
    MissingPlaceholder { label: String },
}

/// Why a single provider produced no location. Never fatal.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("response body is not JSON: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("response body is not a JSON object")]
    UnexpectedShape,

    #[error("provider reported status '{0}'")]
    Rejected(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err)
        } else {
            Self::Transport(err)
        }
    }
}
