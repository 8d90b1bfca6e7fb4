//! Data source abstractions and implementations.
//!
//! Each data source implements the `SourceProvider` trait, which registers
//! it with a DataFusion `SessionContext`.
//!
//! # Supported Sources
//!
//! | Source Type | Implementation | Description |
//! |-------------|----------------|-------------|
//! | `search`    | `SearchSourceProvider` | Keyword-search JSON APIs, one page per scan |

use anyhow::Result;
use async_trait::async_trait;
use chirp_common::config::SearchSourceConfig;
use datafusion::prelude::SessionContext;

pub mod search;

#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Returns the type of source this provider handles (e.g., "search")
    fn type_name(&self) -> &'static str;

    /// Registers the source with the given configuration
    async fn register(&self, context: &SessionContext, config: &SearchSourceConfig)
        -> Result<()>;
}
