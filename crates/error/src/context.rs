//! # Error Contexts
//!
//! Structured metadata attached to errors for programmatic handling.

use serde::{de, Deserialize, Deserializer, Serialize};

/// Structured context for chirp errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    /// Context for CHIRP-2001..2003 (predicate translation)
    Pushdown {
        column: String,
        operator: String,
        reason: String,
    },

    /// Context for CHIRP-1001..1004 (remote fetch)
    Fetch {
        url: String,
        #[serde(default, deserialize_with = "optional_number")]
        status: Option<u16>,
    },

    /// Context for CHIRP-2004 (CapacityExceeded)
    Capacity {
        #[serde(deserialize_with = "number")]
        limit: usize,
    },

    /// Context for CHIRP-3001/3002 (config errors)
    Config {
        file_path: Option<String>,
        field: Option<String>,
    },

    /// Generic key-value context for extensibility
    Generic {
        #[serde(flatten)]
        data: std::collections::HashMap<String, serde_json::Value>,
    },
}

// Tagged enums buffer their fields before decoding them. With serde_json's
// `arbitrary_precision` a buffered number is a map that only
// `serde_json::Number` knows how to read, so integers go through it.
fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    unsigned(serde_json::Number::deserialize(deserializer)?)
}

fn optional_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    Option::<serde_json::Number>::deserialize(deserializer)?
        .map(unsigned)
        .transpose()
}

fn unsigned<T: TryFrom<u64>, E: de::Error>(number: serde_json::Number) -> Result<T, E> {
    number
        .as_u64()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| E::custom(format!("{} is out of range", number)))
}
