//! Structured output handling for CLI commands.

use anyhow::Result;
use chirp_error::ChirpError;
use datafusion::arrow::json::writer::JsonArray;
use datafusion::arrow::json::WriterBuilder;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::pretty::pretty_format_batches;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::exit_codes;

#[derive(clap::ValueEnum, Clone, Debug, Default, PartialEq, Eq, Copy)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl OutputFormat {
    /// Returns true if the output format is intended for machine consumption
    pub fn is_machine_readable(&self) -> bool {
        match self {
            OutputFormat::Human => false,
            OutputFormat::Json => true,
        }
    }
}

/// Envelope for JSON output responses
#[derive(Serialize)]
pub struct CommandResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> CommandResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            exit_code: Some(exit_codes::SUCCESS),
            data,
        }
    }

    pub fn error(message: String, exit_code: i32, data: T) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message),
            exit_code: Some(exit_code),
            data,
        }
    }
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct QueryOutput {
    pub row_count: usize,
    pub rows: Vec<serde_json::Value>,
}

#[derive(Serialize, Default)]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ChirpError>,
}

/// Convert batches into one JSON object per row. Null cells are kept as
/// explicit `null` so every row has the same keys.
pub fn batches_to_json(batches: &[RecordBatch]) -> Result<QueryOutput> {
    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());
    for batch in batches {
        writer.write(batch)?;
    }
    writer.finish()?;

    let buf = writer.into_inner();
    let rows: Vec<serde_json::Value> = if buf.is_empty() {
        Vec::new()
    } else {
        serde_json::from_slice(&buf)?
    };

    Ok(QueryOutput {
        row_count: rows.len(),
        rows,
    })
}

/// Print query results in the requested format
pub fn print_batches(format: OutputFormat, batches: &[RecordBatch]) -> Result<()> {
    match format {
        OutputFormat::Human => {
            let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
            println!("{}", pretty_format_batches(batches)?);
            println!("{}", format!("{} row(s)", rows).dimmed());
            Ok(())
        }
        OutputFormat::Json => print_success(format, batches_to_json(batches)?),
    }
}

/// Print the output to stdout in the requested format
pub fn print_output<T: Serialize>(format: OutputFormat, data: T) -> Result<()> {
    match format {
        OutputFormat::Human => {
            // human output is printed by the command itself
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&data)?;
            println!("{}", json);
        }
    }
    Ok(())
}

/// Print a structured success response for machine outputs
pub fn print_success<T: Serialize>(format: OutputFormat, data: T) -> Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    print_output(format, CommandResponse::success(data))
}

/// Print a structured error response for machine outputs.
/// In Human mode errors are printed to stderr by main's error handler.
pub fn print_error(
    format: OutputFormat,
    message: &str,
    exit_code: i32,
    error: Option<ChirpError>,
) -> Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    let response = CommandResponse::error(message.to_string(), exit_code, ErrorDetail { error });
    print_output(format, response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirp_error::ErrorCode;
    use datafusion::arrow::array::{Int64Array, StringArray};
    use datafusion::arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, true),
            Field::new("to_user", DataType::Utf8, true),
            Field::new("n", DataType::Int64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![Some("1"), Some("2")])),
                Arc::new(StringArray::from(vec![None, Some("bob")])),
                Arc::new(Int64Array::from(vec![10, 20])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_batches_to_json_keeps_nulls() {
        let output = batches_to_json(&[batch()]).unwrap();
        assert_eq!(output.row_count, 2);
        assert_eq!(
            output.rows[0],
            serde_json::json!({"id": "1", "to_user": null, "n": 10})
        );
        assert_eq!(output.rows[1]["to_user"], "bob");
    }

    #[test]
    fn test_batches_to_json_without_rows() {
        assert_eq!(batches_to_json(&[]).unwrap(), QueryOutput::default());
    }

    #[test]
    fn test_error_response_shape() {
        let err = ChirpError::new(ErrorCode::UnsupportedOperator, "bad operator");
        let response = CommandResponse::error(
            err.to_string(),
            exit_codes::QUERY_ERROR,
            ErrorDetail { error: Some(err) },
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["exit_code"], 5);
        assert_eq!(json["error"]["code"], "CHIRP-2001");
    }

    #[test]
    fn test_machine_readable() {
        assert!(!OutputFormat::Human.is_machine_readable());
        assert!(OutputFormat::Json.is_machine_readable());
    }
}
