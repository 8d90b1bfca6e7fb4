use crate::{ChirpError, ErrorCode, ErrorContext};
use datafusion::error::DataFusionError;

impl From<DataFusionError> for ChirpError {
    fn from(err: DataFusionError) -> Self {
        match err.find_root() {
            // Errors raised by the connector travel through DataFusion boxed.
            DataFusionError::External(inner) => match inner.downcast_ref::<ChirpError>() {
                Some(chirp) => chirp.clone(),
                None => ChirpError::new(ErrorCode::DataFusionInternal, inner.to_string()),
            },
            DataFusionError::SchemaError(schema_err, _) => match schema_err.as_ref() {
                datafusion::common::SchemaError::FieldNotFound {
                    field,
                    valid_fields,
                } => {
                    let available: Vec<String> =
                        valid_fields.iter().map(|f| f.name.clone()).collect();

                    let hint = find_closest_match(&field.name, &available);

                    let mut error = ChirpError::new(
                        ErrorCode::PlanningFailed,
                        format!("Column '{}' not found", field.name),
                    );
                    if let Some(closest) = hint {
                        error = error.with_hint(format!("Did you mean '{}'?", closest));
                    }
                    error
                }
                _ => ChirpError::new(ErrorCode::PlanningFailed, schema_err.to_string()),
            },
            DataFusionError::Plan(msg) => ChirpError::new(ErrorCode::PlanningFailed, msg.clone()),
            DataFusionError::SQL(parse_err, _) => {
                ChirpError::new(ErrorCode::PlanningFailed, parse_err.to_string())
            }
            root => ChirpError::new(ErrorCode::DataFusionInternal, root.to_string()),
        }
    }
}

impl From<ChirpError> for DataFusionError {
    fn from(err: ChirpError) -> Self {
        DataFusionError::External(Box::new(err))
    }
}

impl From<std::io::Error> for ChirpError {
    fn from(err: std::io::Error) -> Self {
        ChirpError::new(ErrorCode::FetchFailed, err.to_string())
    }
}

impl From<serde_json::Error> for ChirpError {
    fn from(err: serde_json::Error) -> Self {
        ChirpError::new(ErrorCode::SerializationFailed, err.to_string()).with_context(
            ErrorContext::Generic {
                data: [(
                    "line".to_string(),
                    serde_json::Value::from(err.line()),
                )]
                .into_iter()
                .collect(),
            },
        )
    }
}

fn find_closest_match(target: &str, options: &[String]) -> Option<String> {
    let mut best_match: Option<&str> = None;
    let mut min_distance = usize::MAX;

    for option in options {
        let distance = levenshtein(target, option);
        if distance < min_distance && distance <= 3 {
            min_distance = distance;
            best_match = Some(option.as_str());
        }
    }

    best_match.map(|s| s.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
