//! Error types for remote fetches and the loading coordinator

use std::error::Error as _;

use thiserror::Error;

use crate::model::RenderTarget;

/// Failure of a single remote request.
///
/// Whether a failure is fatal to the session or isolated to one panel is
/// decided by the caller, not by the variant.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request for {operation} failed: {source}")]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} returned HTTP {status}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation} returned query errors: {messages}")]
    GraphQl {
        operation: &'static str,
        messages: String,
    },

    #[error("could not decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation} timed out after {elapsed_ms}ms")]
    Timeout {
        operation: &'static str,
        elapsed_ms: u64,
    },

    #[error("unknown service name '{0}'")]
    UnknownService(String),
}

#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// No service order means nothing downstream can render
    #[error("playlist metadata unavailable for genre '{genre}'")]
    MetadataUnavailable {
        genre: String,
        #[source]
        source: FetchError,
    },

    #[error("genre catalog unavailable")]
    CatalogUnavailable(#[source] FetchError),

    #[error("unknown genre '{0}'")]
    UnknownGenre(String),

    #[error("unknown loading flag '{0}'")]
    UnknownFlag(String),

    #[error("unknown sort field '{0}'")]
    UnknownSortField(String),

    #[error("no render target mounted for {0}")]
    MissingRenderTarget(RenderTarget),
}

impl CoordinatorError {
    /// Message shown in the error banner
    pub fn user_message(&self) -> String {
        match self {
            Self::MetadataUnavailable { .. } | Self::CatalogUnavailable(_) => {
                "We couldn't load the playlists right now. Please try again.".to_string()
            }
            Self::UnknownGenre(genre) => format!("'{}' is not an available genre.", genre),
            other => format!("Something went wrong: {}", other),
        }
    }

    /// Full source chain, for the banner's technical details section
    pub fn technical_detail(&self) -> String {
        let mut detail = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        detail
    }

    /// Programmer errors are bugs in the caller rather than remote failures
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownFlag(_) | Self::MissingRenderTarget(_) | Self::UnknownSortField(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technical_detail_walks_the_source_chain() {
        let err = CoordinatorError::MetadataUnavailable {
            genre: "pop".to_string(),
            source: FetchError::Status {
                operation: "GetPlaylistMetadata",
                status: 503,
                body: String::new(),
            },
        };

        assert_eq!(
            err.technical_detail(),
            "playlist metadata unavailable for genre 'pop': GetPlaylistMetadata returned HTTP 503"
        );
        assert!(!err.is_programmer_error());
    }

    #[test]
    fn unknown_flag_is_a_programmer_error() {
        assert!(CoordinatorError::UnknownFlag("bogus".into()).is_programmer_error());
        assert!(
            CoordinatorError::MissingRenderTarget(RenderTarget::MainPlaylist).is_programmer_error()
        );
    }
}
