//! Scan cursor: one fetch, then row-at-a-time reads with restart.
//!
//! ```text
//! Created -> Fetching -> Ready | FetchFailed
//! Ready -> Iterating -> Exhausted
//! Ready | Iterating | Exhausted -- restart --> position 0
//! FetchFailed -- restart --> FetchFailed
//! any -- close --> Ended
//! ```

use std::fmt;

use chirp_common::config::{FailurePolicy, SearchSourceConfig};
use tracing::{info, warn};

use super::builder::{read_response, TweetCollection, TweetField};
use super::error::ScanError;
use super::fetch::HttpFetcher;
use super::pushdown::RequestPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Created,
    Fetching,
    Ready,
    FetchFailed,
    Iterating,
    Exhausted,
    Ended,
}

impl CursorState {
    pub fn as_str(self) -> &'static str {
        match self {
            CursorState::Created => "created",
            CursorState::Fetching => "fetching",
            CursorState::Ready => "ready",
            CursorState::FetchFailed => "fetch_failed",
            CursorState::Iterating => "iterating",
            CursorState::Exhausted => "exhausted",
            CursorState::Ended => "ended",
        }
    }
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an output column takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    /// Echo of the pushed-down search term.
    SearchTerm,
    Field(TweetField),
    Null,
}

/// Output column mapping, resolved once per scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    sources: Vec<ColumnSource>,
}

impl Projection {
    /// Map each column name (case-sensitive) to its source. The search
    /// column wins over a record field of the same name.
    pub fn new<S: AsRef<str>>(columns: &[S], search_column: &str) -> Self {
        let sources = columns
            .iter()
            .map(|name| {
                let name = name.as_ref();
                if name == search_column {
                    ColumnSource::SearchTerm
                } else {
                    TweetField::from_name(name)
                        .map(ColumnSource::Field)
                        .unwrap_or(ColumnSource::Null)
                }
            })
            .collect();
        Self { sources }
    }

    pub fn sources(&self) -> &[ColumnSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// One materialized row, aligned with a [`Projection`].
pub type Row = Vec<Option<String>>;

#[derive(Debug)]
pub struct ScanCursor {
    url: String,
    explain: String,
    search_term: Option<String>,
    capacity: usize,
    policy: FailurePolicy,
    state: CursorState,
    tweets: Option<TweetCollection>,
    position: usize,
}

impl ScanCursor {
    pub fn new(plan: &RequestPlan, config: &SearchSourceConfig) -> Self {
        Self {
            url: plan.request().url(),
            explain: plan.explain(),
            search_term: plan.search_term().map(str::to_string),
            capacity: config.max_results,
            policy: config.on_fetch_failure,
            state: CursorState::Created,
            tweets: None,
            position: 0,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One-line description of the remote request. Never touches the network.
    pub fn explain(&self) -> &str {
        &self.explain
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search_term.as_deref()
    }

    /// Number of fetched records.
    pub fn len(&self) -> usize {
        self.tweets.as_ref().map_or(0, TweetCollection::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Perform the single remote fetch of this scan.
    ///
    /// Fetch failures either fail the scan or leave it empty, depending on
    /// the configured [`FailurePolicy`]. Exceeding the record capacity is
    /// always an error.
    pub fn open(&mut self, fetcher: &dyn HttpFetcher) -> Result<(), ScanError> {
        if self.state != CursorState::Created {
            return Err(ScanError::InvalidState {
                operation: "open",
                state: self.state,
            });
        }

        self.state = CursorState::Fetching;
        match self.fetch(fetcher) {
            Ok(tweets) => {
                info!(url = %self.url, rows = tweets.len(), "Fetched search results");
                self.tweets = Some(tweets);
                self.position = 0;
                self.state = CursorState::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = CursorState::FetchFailed;
                if err.is_fetch_failure() && self.policy == FailurePolicy::Empty {
                    warn!(url = %self.url, error = %err, "Search fetch failed, returning no rows");
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    fn fetch(&self, fetcher: &dyn HttpFetcher) -> Result<TweetCollection, ScanError> {
        let response = fetcher.fetch(&self.url)?;
        if !response.is_success() {
            return Err(ScanError::UnexpectedStatus {
                url: self.url.clone(),
                status: response.status,
            });
        }

        match read_response(response.body, self.capacity)? {
            Some(tweets) => Ok(tweets),
            None => {
                warn!(url = %self.url, "Search response has no results array");
                Ok(TweetCollection::new(self.capacity))
            }
        }
    }

    /// Next row, or `None` once the records are used up. A failed fetch
    /// reads as zero rows.
    pub fn next_row(&mut self, projection: &Projection) -> Result<Option<Row>, ScanError> {
        match self.state {
            CursorState::Ready | CursorState::Iterating => {}
            CursorState::FetchFailed | CursorState::Exhausted => return Ok(None),
            state => {
                return Err(ScanError::InvalidState {
                    operation: "read",
                    state,
                })
            }
        }

        let Some(tweet) = self.tweets.as_ref().and_then(|t| t.get(self.position)) else {
            self.state = CursorState::Exhausted;
            return Ok(None);
        };

        let row = projection
            .sources()
            .iter()
            .map(|source| match source {
                ColumnSource::SearchTerm => self.search_term.clone(),
                ColumnSource::Field(field) => tweet.get(*field).map(str::to_string),
                ColumnSource::Null => None,
            })
            .collect();

        self.position += 1;
        self.state = CursorState::Iterating;
        Ok(Some(row))
    }

    /// Rewind to the first record without fetching again. After a failed
    /// fetch this is a no-op.
    pub fn restart(&mut self) -> Result<(), ScanError> {
        match self.state {
            CursorState::Ready | CursorState::FetchFailed => {}
            CursorState::Iterating | CursorState::Exhausted => {
                self.state = CursorState::Iterating;
            }
            state => {
                return Err(ScanError::InvalidState {
                    operation: "restart",
                    state,
                })
            }
        }
        self.position = 0;
        Ok(())
    }

    /// Release fetched records. Safe to call more than once.
    pub fn close(&mut self) {
        self.tweets = None;
        self.position = 0;
        self.state = CursorState::Ended;
    }
}
