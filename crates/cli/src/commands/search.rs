//! `search`: look up one term without writing SQL.

use anyhow::Result;
use chirp_common::config::SearchSourceConfig;
use chirp_error::ChirpError;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::logical_expr::{ident, lit};
use datafusion::prelude::SessionContext;

use crate::output::{self, OutputFormat};

pub async fn search(
    ctx: &SessionContext,
    config: &SearchSourceConfig,
    term: &str,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let batches = search_batches(ctx, config, term, limit).await?;
    output::print_batches(format, &batches)
}

/// Equivalent to `SELECT * FROM <table> WHERE <search column> = <term>`,
/// built without SQL text so the term needs no quoting.
pub(crate) async fn search_batches(
    ctx: &SessionContext,
    config: &SearchSourceConfig,
    term: &str,
    limit: Option<usize>,
) -> std::result::Result<Vec<RecordBatch>, ChirpError> {
    let mut df = ctx
        .table(config.name.as_str())
        .await?
        .filter(ident(&config.search_column).eq(lit(term)))?;
    if limit.is_some() {
        df = df.limit(0, limit)?;
    }
    Ok(df.collect().await?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chirp_connectors::sources::search::fetch::{FetchResponse, HttpFetcher};
    use chirp_connectors::sources::search::ScanError;
    use chirp_connectors::sources::SourceProvider;
    use chirp_connectors::SearchSourceProvider;
    use datafusion::arrow::array::{Array, StringArray};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    pub(crate) struct CannedFetcher {
        body: String,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl CannedFetcher {
        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HttpFetcher for CannedFetcher {
        fn fetch(&self, url: &str) -> std::result::Result<FetchResponse, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            Ok(FetchResponse::new(
                200,
                std::io::Cursor::new(self.body.clone().into_bytes()),
            ))
        }
    }

    /// A context with the default `tweets` table served from `body`.
    pub(crate) async fn context_with(body: &str) -> (SessionContext, Arc<CannedFetcher>) {
        let fetcher = Arc::new(CannedFetcher {
            body: body.to_string(),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        });
        let ctx = SessionContext::new();
        let provider = SearchSourceProvider::with_fetcher(fetcher.clone());
        provider
            .register(&ctx, &SearchSourceConfig::default())
            .await
            .unwrap();
        (ctx, fetcher)
    }

    const BODY: &str = r#"{"results":[
        {"id":"1","text":"it's here","from_user":"a"},
        {"id":"2","text":"again","from_user":"b"},
        {"id":"3","text":"more","from_user":"c"}
    ]}"#;

    #[tokio::test]
    async fn test_search_pushes_term_with_quotes() {
        let (ctx, fetcher) = context_with(BODY).await;
        let batches = search_batches(&ctx, &SearchSourceConfig::default(), "it's", None)
            .await
            .unwrap();

        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 3);
        assert_eq!(
            fetcher.urls.lock().unwrap().as_slice(),
            &["http://search.twitter.com/search.json?q=it%27s".to_string()]
        );

        let q = batches[0]
            .column_by_name("q")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap()
            .clone();
        assert!((0..q.len()).all(|i| q.value(i) == "it's"));
    }

    #[tokio::test]
    async fn test_search_limit() {
        let (ctx, _) = context_with(BODY).await;
        let batches = search_batches(&ctx, &SearchSourceConfig::default(), "x", Some(2))
            .await
            .unwrap();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 2);
    }
}
