use chirp_error::{ChirpError, ErrorCode, ErrorContext};
use thiserror::Error;

use super::cursor::CursorState;

/// Errors raised while planning, fetching or reading a search scan.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("operator '{operator}' is not supported on search column '{column}'")]
    UnsupportedOperator { column: String, operator: String },

    #[error("search column '{column}' must be compared with a non-null constant, got {found}")]
    NonConstantParameter { column: String, found: String },

    #[error("search column '{column}' is constrained more than once")]
    DuplicateSearchTerm { column: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        timed_out: bool,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{url} answered with HTTP status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("failed reading response body: {0}")]
    BodyRead(#[source] std::io::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("response is not a JSON object")]
    MissingResultRoot,

    #[error("response holds more than {limit} records")]
    CapacityExceeded { limit: usize },

    #[error("cannot {operation} a scan cursor in state '{state}'")]
    InvalidState {
        operation: &'static str,
        state: CursorState,
    },
}

impl ScanError {
    /// Errors that mean "the remote side gave us nothing usable"; these are
    /// the ones the source's failure policy may turn into an empty result.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            ScanError::Transport { .. }
                | ScanError::UnexpectedStatus { .. }
                | ScanError::BodyRead(_)
                | ScanError::MalformedResponse(_)
                | ScanError::MissingResultRoot
        )
    }

    pub fn is_translation_error(&self) -> bool {
        matches!(
            self,
            ScanError::UnsupportedOperator { .. }
                | ScanError::NonConstantParameter { .. }
                | ScanError::DuplicateSearchTerm { .. }
        )
    }

    pub fn to_chirp_error(&self) -> ChirpError {
        let message = self.to_string();
        match self {
            ScanError::UnsupportedOperator { column, operator } => {
                ChirpError::new(ErrorCode::UnsupportedOperator, message)
                    .with_context(ErrorContext::Pushdown {
                        column: column.clone(),
                        operator: operator.clone(),
                        reason: "the search API only accepts an exact search term".to_string(),
                    })
                    .with_hint(format!(
                        "Use {} = '<term>' and filter other conditions on returned columns",
                        column
                    ))
            }
            ScanError::NonConstantParameter { column, .. } => {
                ChirpError::new(ErrorCode::NonConstantParameter, message)
                    .with_context(ErrorContext::Pushdown {
                        column: column.clone(),
                        operator: "=".to_string(),
                        reason: "the search term must be known before the request is sent"
                            .to_string(),
                    })
                    .with_hint("Compare the search column with a string literal")
            }
            ScanError::DuplicateSearchTerm { column } => {
                ChirpError::new(ErrorCode::DuplicateSearchTerm, message)
                    .with_context(ErrorContext::Pushdown {
                        column: column.clone(),
                        operator: "=".to_string(),
                        reason: "the search API accepts a single search term".to_string(),
                    })
                    .with_hint("Combine the terms into one search string")
            }
            ScanError::Transport { url, timed_out, .. } => {
                let code = if *timed_out {
                    ErrorCode::FetchTimeout
                } else {
                    ErrorCode::FetchFailed
                };
                ChirpError::new(code, message).with_context(ErrorContext::Fetch {
                    url: url.clone(),
                    status: None,
                })
            }
            ScanError::UnexpectedStatus { url, status } => {
                ChirpError::new(ErrorCode::UnexpectedStatus, message).with_context(
                    ErrorContext::Fetch {
                        url: url.clone(),
                        status: Some(*status),
                    },
                )
            }
            ScanError::BodyRead(_) => ChirpError::new(ErrorCode::FetchFailed, message),
            ScanError::MalformedResponse(_) | ScanError::MissingResultRoot => {
                ChirpError::new(ErrorCode::MalformedResponse, message)
                    .with_hint("Check that the endpoint returns a search result document")
            }
            ScanError::CapacityExceeded { limit } => {
                ChirpError::new(ErrorCode::CapacityExceeded, message)
                    .with_context(ErrorContext::Capacity { limit: *limit })
                    .with_hint("Raise search.max_results or narrow the search term")
            }
            ScanError::InvalidState { .. } => ChirpError::new(ErrorCode::InternalState, message),
        }
    }
}

impl From<ScanError> for datafusion::error::DataFusionError {
    fn from(err: ScanError) -> Self {
        err.to_chirp_error().into()
    }
}
