//! Errors raised while resolving a navigation link
//!
//! The unified resolver turns every one of these into a warning and an
//! absent result. The shape-asserting variants hand them to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid @iot.navigationLink {link}: {source}")]
    InvalidLink {
        link: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid @iot.navigationLink {link}: unsupported scheme \"{scheme}\"")]
    UnsupportedScheme { link: String, scheme: String },

    #[error("could not establish connection to {link}: {source}")]
    Connection {
        link: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{link} answered with HTTP {status}")]
    Status {
        link: String,
        status: reqwest::StatusCode,
    },

    #[error("could not read response body of {link}: {source}")]
    Body {
        link: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not parse response of {link} as JSON: {source}")]
    Parse {
        link: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response of {link} is not a JSON object")]
    NotAnObject { link: String },

    #[error("response of {link} has no \"{field}\" field")]
    MissingField { link: String, field: &'static str },

    #[error("\"value\" of {link} is not an array of entities")]
    InvalidValue { link: String },
}

impl ResolveError {
    /// The navigation link the error refers to
    pub fn link(&self) -> &str {
        match self {
            ResolveError::InvalidLink { link, .. }
            | ResolveError::UnsupportedScheme { link, .. }
            | ResolveError::Connection { link, .. }
            | ResolveError::Status { link, .. }
            | ResolveError::Body { link, .. }
            | ResolveError::Parse { link, .. }
            | ResolveError::NotAnObject { link }
            | ResolveError::MissingField { link, .. }
            | ResolveError::InvalidValue { link } => link,
        }
    }
}
