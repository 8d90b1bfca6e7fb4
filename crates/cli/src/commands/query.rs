//! `query` and `explain`: arbitrary SQL over the registered search table.

use anyhow::Result;
use chirp_error::ChirpError;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;

use crate::output::{self, OutputFormat};

pub async fn query(ctx: &SessionContext, sql: &str, format: OutputFormat) -> Result<()> {
    let batches = run_sql(ctx, sql).await?;
    output::print_batches(format, &batches)
}

/// Print the logical and physical plans. The physical plan shows the
/// remote request; nothing is fetched.
pub async fn explain(ctx: &SessionContext, sql: &str, format: OutputFormat) -> Result<()> {
    let batches = explain_sql(ctx, sql).await?;
    output::print_batches(format, &batches)
}

pub(crate) async fn run_sql(
    ctx: &SessionContext,
    sql: &str,
) -> std::result::Result<Vec<RecordBatch>, ChirpError> {
    tracing::debug!(sql, "Running query");
    let df = ctx.sql(sql).await?;
    Ok(df.collect().await?)
}

pub(crate) async fn explain_sql(
    ctx: &SessionContext,
    sql: &str,
) -> std::result::Result<Vec<RecordBatch>, ChirpError> {
    let df = ctx.sql(sql).await?.explain(false, false)?;
    Ok(df.collect().await?)
}
