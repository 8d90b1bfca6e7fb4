//! DataFusion table provider and execution plan for the search source.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use chirp_common::config::SearchSourceConfig;
use datafusion::arrow::array::{ArrayRef, StringBuilder};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::record_batch::{RecordBatch, RecordBatchOptions};
use datafusion::catalog::Session;
use datafusion::common::stats::Precision;
use datafusion::datasource::{TableProvider, TableType};
use datafusion::error::{DataFusionError, Result};
use datafusion::execution::TaskContext;
use datafusion::logical_expr::{Expr, TableProviderFilterPushDown};
use datafusion::physical_expr::EquivalenceProperties;
use datafusion::physical_plan::execution_plan::{Boundedness, EmissionType};
use datafusion::physical_plan::stream::RecordBatchStreamAdapter;
use datafusion::physical_plan::{
    DisplayAs, DisplayFormatType, ExecutionPlan, Partitioning, PlanProperties,
    SendableRecordBatchStream, Statistics,
};
use datafusion::prelude::SessionContext;

use super::builder::TweetField;
use super::cursor::{Projection, ScanCursor};
use super::fetch::HttpFetcher;
use super::pushdown::{plan_request, RequestPlan};

/// Rows a single search page usually holds; only used as a planner hint.
const ESTIMATED_ROWS: usize = 15;

/// Ten record columns plus the search column, all nullable text.
pub fn search_schema(search_column: &str) -> SchemaRef {
    let mut fields: Vec<Field> = TweetField::ALL
        .iter()
        .filter(|field| field.name() != search_column)
        .map(|field| Field::new(field.name(), DataType::Utf8, true))
        .collect();
    fields.push(Field::new(search_column, DataType::Utf8, true));
    Arc::new(Schema::new(fields))
}

/// Register the search source as a table named after `config.name`.
pub fn register_search_table(
    context: &SessionContext,
    config: &SearchSourceConfig,
    fetcher: Arc<dyn HttpFetcher>,
) -> anyhow::Result<()> {
    let provider = SearchTableProvider::new(config.clone(), fetcher);
    context.register_table(config.name.as_str(), Arc::new(provider))?;
    tracing::info!(
        table = %config.name,
        endpoint = %config.endpoint,
        "Registered search source"
    );
    Ok(())
}

#[derive(Debug)]
pub struct SearchTableProvider {
    config: SearchSourceConfig,
    schema: SchemaRef,
    fetcher: Arc<dyn HttpFetcher>,
}

impl SearchTableProvider {
    pub fn new(config: SearchSourceConfig, fetcher: Arc<dyn HttpFetcher>) -> Self {
        let schema = search_schema(&config.search_column);
        Self {
            config,
            schema,
            fetcher,
        }
    }

    fn plan<'a, I>(&self, filters: I) -> std::result::Result<RequestPlan, DataFusionError>
    where
        I: IntoIterator<Item = &'a Expr>,
    {
        Ok(plan_request(
            &self.config.endpoint,
            filters,
            &self.schema,
            &self.config.search_column,
        )?)
    }
}

#[async_trait]
impl TableProvider for SearchTableProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn table_type(&self) -> TableType {
        TableType::Base
    }

    fn statistics(&self) -> Option<Statistics> {
        Some(estimated_statistics(&self.schema, None))
    }

    fn supports_filters_pushdown(
        &self,
        filters: &[&Expr],
    ) -> Result<Vec<TableProviderFilterPushDown>> {
        let plan = self.plan(filters.iter().copied())?;
        Ok(plan
            .classifications()
            .iter()
            .map(|class| class.to_filter_pushdown())
            .collect())
    }

    async fn scan(
        &self,
        _state: &dyn Session,
        projection: Option<&Vec<usize>>,
        filters: &[Expr],
        limit: Option<usize>,
    ) -> Result<Arc<dyn ExecutionPlan>> {
        let plan = self.plan(filters)?;
        let schema = match projection {
            Some(indices) => Arc::new(self.schema.project(indices)?),
            None => self.schema.clone(),
        };

        Ok(Arc::new(SearchExec::new(
            plan,
            self.config.clone(),
            self.fetcher.clone(),
            schema,
            limit,
        )))
    }
}

/// Leaf plan performing one search request and emitting a single batch.
#[derive(Debug)]
pub struct SearchExec {
    plan: RequestPlan,
    config: SearchSourceConfig,
    fetcher: Arc<dyn HttpFetcher>,
    schema: SchemaRef,
    limit: Option<usize>,
    cache: PlanProperties,
}

impl SearchExec {
    pub fn new(
        plan: RequestPlan,
        config: SearchSourceConfig,
        fetcher: Arc<dyn HttpFetcher>,
        schema: SchemaRef,
        limit: Option<usize>,
    ) -> Self {
        let cache = PlanProperties::new(
            EquivalenceProperties::new(schema.clone()),
            Partitioning::UnknownPartitioning(1),
            EmissionType::Incremental,
            Boundedness::Bounded,
        );

        Self {
            plan,
            config,
            fetcher,
            schema,
            limit,
            cache,
        }
    }

    pub fn request_plan(&self) -> &RequestPlan {
        &self.plan
    }
}

impl DisplayAs for SearchExec {
    fn fmt_as(&self, _t: DisplayFormatType, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SearchExec: {}", self.plan.explain())?;
        if let Some(limit) = self.limit {
            write!(f, ", limit={}", limit)?;
        }
        Ok(())
    }
}

impl ExecutionPlan for SearchExec {
    fn name(&self) -> &str {
        "SearchExec"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn properties(&self) -> &PlanProperties {
        &self.cache
    }

    fn children(&self) -> Vec<&Arc<dyn ExecutionPlan>> {
        vec![]
    }

    fn with_new_children(
        self: Arc<Self>,
        _: Vec<Arc<dyn ExecutionPlan>>,
    ) -> Result<Arc<dyn ExecutionPlan>> {
        Ok(self)
    }

    fn execute(
        &self,
        _partition: usize,
        _context: Arc<TaskContext>,
    ) -> Result<SendableRecordBatchStream> {
        let plan = self.plan.clone();
        let config = self.config.clone();
        let fetcher = self.fetcher.clone();
        let schema = self.schema.clone();
        let limit = self.limit;

        // the fetch and the parser block, so keep them off the async workers
        let stream = futures::stream::once(async move {
            tokio::task::spawn_blocking(move || {
                read_batch(&plan, &config, fetcher.as_ref(), schema, limit)
            })
            .await
            .map_err(|e| DataFusionError::External(Box::new(e)))?
        });

        Ok(Box::pin(RecordBatchStreamAdapter::new(
            self.schema.clone(),
            stream,
        )))
    }

    fn partition_statistics(&self, _partition: Option<usize>) -> Result<Statistics> {
        Ok(estimated_statistics(&self.schema, self.limit))
    }
}

fn estimated_statistics(schema: &Schema, limit: Option<usize>) -> Statistics {
    let mut stats = Statistics::new_unknown(schema);
    stats.num_rows = Precision::Inexact(limit.map_or(ESTIMATED_ROWS, |l| l.min(ESTIMATED_ROWS)));
    stats
}

/// Run one scan to completion and collect its rows into a batch with
/// `schema`. Blocks on the network.
pub fn read_batch(
    plan: &RequestPlan,
    config: &SearchSourceConfig,
    fetcher: &dyn HttpFetcher,
    schema: SchemaRef,
    limit: Option<usize>,
) -> Result<RecordBatch> {
    let columns: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let projection = Projection::new(&columns, &config.search_column);

    let mut cursor = ScanCursor::new(plan, config);
    cursor.open(fetcher)?;

    let mut builders: Vec<StringBuilder> =
        (0..projection.len()).map(|_| StringBuilder::new()).collect();
    let mut rows = 0;
    while limit.is_none_or(|limit| rows < limit) {
        let Some(row) = cursor.next_row(&projection)? else {
            break;
        };
        for (builder, value) in builders.iter_mut().zip(row) {
            builder.append_option(value);
        }
        rows += 1;
    }
    cursor.close();

    tracing::debug!(url = %plan.request(), rows, "SearchExec: batch complete");

    let arrays: Vec<ArrayRef> = builders
        .into_iter()
        .map(|mut builder| Arc::new(builder.finish()) as ArrayRef)
        .collect();
    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::search::error::ScanError;
    use crate::sources::search::fetch::FetchResponse;
    use chirp_error::{ChirpError, ErrorCode};
    use datafusion::arrow::array::{Array, StringArray};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct StaticFetcher {
        body: &'static str,
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        fn new(body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                body,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl HttpFetcher for StaticFetcher {
        fn fetch(&self, _url: &str) -> std::result::Result<FetchResponse, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchResponse::new(200, self.body.as_bytes()))
        }
    }

    const RESPONSE: &str = r#"{"results":[
        {"id":"1","text":"learning rust","from_user":"alice","iso_language_code":"en"},
        {"id":"2","text":"rust async","from_user":"bob","iso_language_code":"en"},
        {"id":"3","text":"rust en français","from_user":"carol","iso_language_code":"fr"}
    ]}"#;

    fn context(fetcher: Arc<StaticFetcher>) -> SessionContext {
        let ctx = SessionContext::new();
        register_search_table(&ctx, &SearchSourceConfig::default(), fetcher).unwrap();
        ctx
    }

    fn strings(batch: &RecordBatch, column: &str) -> Vec<Option<String>> {
        let array = batch
            .column_by_name(column)
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        (0..array.len())
            .map(|i| (!array.is_null(i)).then(|| array.value(i).to_string()))
            .collect()
    }

    #[test]
    fn test_schema_layout() {
        let schema = search_schema("q");
        assert_eq!(schema.fields().len(), 11);
        assert_eq!(schema.field(0).name(), "id");
        assert_eq!(schema.field(10).name(), "q");
        assert!(schema.fields().iter().all(|f| f.is_nullable()));

        let schema = search_schema("text");
        assert_eq!(schema.fields().len(), 10);
        assert_eq!(schema.field(9).name(), "text");
    }

    #[test]
    fn test_statistics_are_an_estimate() {
        let provider = SearchTableProvider::new(
            SearchSourceConfig::default(),
            StaticFetcher::new(RESPONSE),
        );
        let stats = provider.statistics().unwrap();
        assert_eq!(stats.num_rows, Precision::Inexact(15));
        assert_eq!(
            estimated_statistics(&provider.schema, Some(4)).num_rows,
            Precision::Inexact(4)
        );
    }

    #[tokio::test]
    async fn test_search_term_is_echoed() {
        let fetcher = StaticFetcher::new(RESPONSE);
        let ctx = context(fetcher.clone());

        let batches = ctx
            .sql("SELECT id, from_user, q FROM tweets WHERE q = 'rust'")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();

        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(
            strings(batch, "q"),
            vec![Some("rust".to_string()); 3]
        );
        assert_eq!(strings(batch, "id")[2].as_deref(), Some("3"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_local_filters_are_applied_by_the_engine() {
        let ctx = context(StaticFetcher::new(RESPONSE));
        let batches = ctx
            .sql(
                "SELECT from_user FROM tweets \
                 WHERE q = 'rust' AND iso_language_code = 'en' ORDER BY from_user",
            )
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();

        let users: Vec<_> = batches
            .iter()
            .flat_map(|b| strings(b, "from_user"))
            .collect();
        assert_eq!(
            users,
            vec![Some("alice".to_string()), Some("bob".to_string())]
        );
    }

    #[tokio::test]
    async fn test_limit_and_count() {
        let ctx = context(StaticFetcher::new(RESPONSE));

        let batches = ctx
            .sql("SELECT id FROM tweets WHERE q = 'rust' LIMIT 2")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 2);

        let count = ctx
            .sql("SELECT * FROM tweets WHERE q = 'rust'")
            .await
            .unwrap()
            .count()
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_explain_shows_remote_request() {
        let ctx = context(StaticFetcher::new(RESPONSE));
        let batches = ctx
            .sql("EXPLAIN SELECT text FROM tweets WHERE q = 'hello world'")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();

        let plans = datafusion::arrow::util::pretty::pretty_format_batches(&batches)
            .unwrap()
            .to_string();
        assert!(
            plans.contains("SearchExec: Search: http://search.twitter.com/search.json?q=hello%20world"),
            "{}",
            plans
        );
    }

    #[tokio::test]
    async fn test_unsupported_operator_fails_planning() {
        let fetcher = StaticFetcher::new(RESPONSE);
        let ctx = context(fetcher.clone());
        let err = ctx
            .sql("SELECT id FROM tweets WHERE q <> 'rust'")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap_err();

        let chirp = ChirpError::from(err);
        assert_eq!(chirp.code, ErrorCode::UnsupportedOperator);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pattern_match_on_search_column_fails_planning() {
        for sql in [
            "SELECT id FROM tweets WHERE q LIKE 'rust%'",
            "SELECT id FROM tweets WHERE q ILIKE '%Rust%'",
        ] {
            let fetcher = StaticFetcher::new(RESPONSE);
            let ctx = context(fetcher.clone());
            let err = ctx.sql(sql).await.unwrap().collect().await.unwrap_err();

            let chirp = ChirpError::from(err);
            assert_eq!(chirp.code, ErrorCode::UnsupportedOperator, "{}", sql);
            assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0, "{}", sql);
        }
    }

    #[test]
    fn test_read_batch_with_empty_projection() {
        let fetcher = StaticFetcher::new(RESPONSE);
        let plan = RequestPlan::unfiltered("http://search.example.com/search.json");
        let schema = Arc::new(Schema::empty());
        let batch = read_batch(
            &plan,
            &SearchSourceConfig::default(),
            fetcher.as_ref(),
            schema,
            None,
        )
        .unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 0);
    }
}
