use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following CHIRP-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Remote fetch errors
/// - **2000-2999**: Query planning and result errors
/// - **3000-3999**: Configuration errors
/// - **5000-5999**: Internal/System errors
///
/// Codes are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Fetch Errors (1000-1999) ===
    /// CHIRP-1001: Request to the search endpoint failed
    FetchFailed = 1001,
    /// CHIRP-1002: Request timed out
    FetchTimeout = 1002,
    /// CHIRP-1003: Endpoint answered with a non-success status
    UnexpectedStatus = 1003,
    /// CHIRP-1004: Response body is not valid JSON
    MalformedResponse = 1004,

    // === Query Errors (2000-2999) ===
    /// CHIRP-2001: Non-equality operator on the search column
    UnsupportedOperator = 2001,
    /// CHIRP-2002: Search term is not a constant
    NonConstantParameter = 2002,
    /// CHIRP-2003: More than one search term in a query
    DuplicateSearchTerm = 2003,
    /// CHIRP-2004: Response holds more records than allowed
    CapacityExceeded = 2004,
    /// CHIRP-2005: SQL could not be planned
    PlanningFailed = 2005,

    // === Configuration Errors (3000-3999) ===
    /// CHIRP-3001: Configuration file could not be parsed
    InvalidConfig = 3001,
    /// CHIRP-3002: Configuration value failed validation
    ConfigViolation = 3002,

    // === Internal Errors (5000-5999) ===
    /// CHIRP-5001: Internal DataFusion error
    DataFusionInternal = 5001,
    /// CHIRP-5002: Serialization/deserialization failed
    SerializationFailed = 5002,
    /// CHIRP-5003: Cursor used in a state that does not allow the call
    InternalState = 5003,

    /// CHIRP-9999: Unknown/unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "CHIRP-2002")
    pub fn as_str(&self) -> String {
        format!("CHIRP-{:04}", self.as_u16())
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Fetch,
            2000..=2999 => ErrorCategory::Query,
            3000..=3999 => ErrorCategory::Config,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let num: u16 = s
            .strip_prefix("CHIRP-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::FetchFailed),
            1002 => Ok(Self::FetchTimeout),
            1003 => Ok(Self::UnexpectedStatus),
            1004 => Ok(Self::MalformedResponse),
            2001 => Ok(Self::UnsupportedOperator),
            2002 => Ok(Self::NonConstantParameter),
            2003 => Ok(Self::DuplicateSearchTerm),
            2004 => Ok(Self::CapacityExceeded),
            2005 => Ok(Self::PlanningFailed),
            3001 => Ok(Self::InvalidConfig),
            3002 => Ok(Self::ConfigViolation),
            5001 => Ok(Self::DataFusionInternal),
            5002 => Ok(Self::SerializationFailed),
            5003 => Ok(Self::InternalState),
            9999 => Ok(Self::Unknown),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// High-level error category, used for exit-code mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCategory {
    Fetch,
    Query,
    Config,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_formatting() {
        assert_eq!(ErrorCode::FetchFailed.as_str(), "CHIRP-1001");
        assert_eq!(ErrorCode::UnsupportedOperator.as_str(), "CHIRP-2001");
        assert_eq!(ErrorCode::Unknown.as_str(), "CHIRP-9999");
    }

    #[test]
    fn test_error_code_parsing() {
        assert_eq!(
            ErrorCode::try_from("CHIRP-2003".to_string()).unwrap(),
            ErrorCode::DuplicateSearchTerm
        );
        assert_eq!(
            ErrorCode::try_from("CHIRP-9999".to_string()).unwrap(),
            ErrorCode::Unknown
        );
    }

    #[test]
    fn test_error_code_parsing_errors() {
        assert!(ErrorCode::try_from("INVALID".to_string()).is_err());
        assert!(ErrorCode::try_from("CHIRP-0000".to_string()).is_err());
        assert!(ErrorCode::try_from("CHIRP-ABC".to_string()).is_err());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(ErrorCode::FetchTimeout.category(), ErrorCategory::Fetch);
        assert_eq!(ErrorCode::CapacityExceeded.category(), ErrorCategory::Query);
        assert_eq!(ErrorCode::InvalidConfig.category(), ErrorCategory::Config);
        assert_eq!(ErrorCode::InternalState.category(), ErrorCategory::Internal);
        assert_eq!(ErrorCode::Unknown.category(), ErrorCategory::Internal);
    }
}
