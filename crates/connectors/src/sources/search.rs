//! Keyword-search API data source.
//!
//! Exposes one page of a search endpoint's JSON results as a table. A
//! predicate `q = '<term>'` on the search column becomes the remote query;
//! all other predicates are left for DataFusion to evaluate.
//!
//! Pipeline, leaves first:
//!
//! - [`encode`]: percent-encoding of parameter values
//! - [`pushdown`]: predicate classification and request planning
//! - [`events`] / [`builder`]: streaming JSON into bounded `Tweet` records
//! - [`fetch`]: the blocking HTTP capability
//! - [`cursor`]: the scan state machine serving rows
//! - [`provider`]: `TableProvider` / `ExecutionPlan` glue
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chirp_common::config::SearchSourceConfig;
use datafusion::prelude::SessionContext;

use crate::sources::SourceProvider;

pub mod builder;
pub mod cursor;
pub mod encode;
pub mod error;
pub mod events;
pub mod fetch;
pub mod provider;
pub mod pushdown;

pub use error::ScanError;
pub use fetch::{HttpFetcher, ReqwestFetcher};
pub use provider::{register_search_table, search_schema, SearchExec, SearchTableProvider};

/// Registers search tables, fetching with `reqwest` unless another
/// [`HttpFetcher`] is supplied.
#[derive(Default)]
pub struct SearchSourceProvider {
    fetcher: Option<Arc<dyn HttpFetcher>>,
}

impl SearchSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetcher(fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            fetcher: Some(fetcher),
        }
    }
}

#[async_trait]
impl SourceProvider for SearchSourceProvider {
    fn type_name(&self) -> &'static str {
        "search"
    }

    async fn register(&self, context: &SessionContext, config: &SearchSourceConfig) -> Result<()> {
        let fetcher: Arc<dyn HttpFetcher> = match &self.fetcher {
            Some(fetcher) => fetcher.clone(),
            None => Arc::new(ReqwestFetcher::from_config(config)),
        };
        register_search_table(context, config, fetcher)
    }
}
