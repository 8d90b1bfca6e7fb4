//! Predicate pushdown for the search API.
//!
//! The remote API accepts exactly one filter: a free-text search term. A
//! predicate `<search column> = '<literal>'` is therefore translated into the
//! `q` request parameter and reported as handled remotely; every other
//! predicate stays with the query engine, which re-applies it to the rows we
//! return.

use std::fmt;

use datafusion::arrow::datatypes::{Field, Schema};
use datafusion::logical_expr::{BinaryExpr, Expr, Like, Operator, TableProviderFilterPushDown};
use datafusion::scalar::ScalarValue;
use tracing::debug;

use super::encode::percent_encode;
use super::error::ScanError;

/// Request parameter carrying the search term.
pub const SEARCH_PARAM: &str = "q";

/// How a single predicate is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Enforced by the remote API through a request parameter.
    Pushdown,
    /// Must be re-checked by the caller against fetched rows.
    Local,
}

impl Classification {
    pub fn to_filter_pushdown(self) -> TableProviderFilterPushDown {
        match self {
            Classification::Pushdown => TableProviderFilterPushDown::Exact,
            Classification::Local => TableProviderFilterPushDown::Unsupported,
        }
    }
}

/// A single `key=value` request parameter. The value is kept decoded;
/// encoding happens when the parameter is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    key: String,
    value: String,
}

impl QueryParam {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for QueryParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, percent_encode(&self.value))
    }
}

/// Endpoint plus the ordered parameters derived from pushed-down predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    endpoint: String,
    params: Vec<QueryParam>,
}

impl RemoteRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    fn push(&mut self, param: QueryParam) {
        self.params.push(param);
    }

    /// Render the request URL. The first parameter is joined with `?` unless
    /// the endpoint already carries a query string.
    pub fn url(&self) -> String {
        let mut url = self.endpoint.clone();
        let mut separator = if self.endpoint.contains('?') { '&' } else { '?' };
        for param in &self.params {
            url.push(separator);
            url.push_str(&param.to_string());
            separator = '&';
        }
        url
    }
}

impl fmt::Display for RemoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Output of [`plan_request`]: the request, one classification per input
/// predicate (same order), and the search term for echo-back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPlan {
    request: RemoteRequest,
    classifications: Vec<Classification>,
    search_term: Option<String>,
}

impl RequestPlan {
    /// A plan without predicates: the bare endpoint.
    pub fn unfiltered(endpoint: impl Into<String>) -> Self {
        Self {
            request: RemoteRequest::new(endpoint),
            classifications: Vec::new(),
            search_term: None,
        }
    }

    pub fn request(&self) -> &RemoteRequest {
        &self.request
    }

    pub fn classifications(&self) -> &[Classification] {
        &self.classifications
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search_term.as_deref()
    }

    /// The predicates the caller still has to evaluate, in their original
    /// order. `predicates` must be the list the plan was built from.
    pub fn retain_local<'a, T>(&self, predicates: &'a [T]) -> Vec<&'a T> {
        debug_assert_eq!(predicates.len(), self.classifications.len());
        predicates
            .iter()
            .zip(&self.classifications)
            .filter(|(_, class)| **class == Classification::Local)
            .map(|(predicate, _)| predicate)
            .collect()
    }

    /// One-line description used in plan explanations.
    pub fn explain(&self) -> String {
        format!("Search: {}", self.request)
    }
}

/// Translate one predicate into a request parameter.
///
/// Returns `Ok(None)` when the predicate is not about the search column (or
/// has a shape we do not inspect). Predicates on the search column must be
/// `column = <non-null literal>`; anything else cannot be sent to the API
/// and is rejected.
pub fn translate_predicate(
    predicate: &Expr,
    schema: &Schema,
    search_column: &str,
) -> Result<Option<QueryParam>, ScanError> {
    let (left, op, right) = match predicate {
        Expr::BinaryExpr(BinaryExpr { left, op, right }) => (left, op, right),
        // pattern matches are operators too, just not binary ones
        Expr::Like(like) | Expr::SimilarTo(like) => {
            return match search_field(&like.expr, schema, search_column) {
                Some(field) => Err(ScanError::UnsupportedOperator {
                    column: field.name().clone(),
                    operator: pattern_operator(predicate, like),
                }),
                None => Ok(None),
            };
        }
        _ => return Ok(None),
    };
    let Some(field) = search_field(left, schema, search_column) else {
        return Ok(None);
    };

    if *op != Operator::Eq {
        return Err(ScanError::UnsupportedOperator {
            column: field.name().clone(),
            operator: op.to_string(),
        });
    }

    let term = match right.as_ref() {
        Expr::Literal(value, _) => literal_text(value),
        _ => None,
    };
    match term {
        Some(term) => Ok(Some(QueryParam::new(SEARCH_PARAM, term))),
        None => Err(ScanError::NonConstantParameter {
            column: field.name().clone(),
            found: right.to_string(),
        }),
    }
}

/// The schema field `expr` refers to, if it is a bare reference to the
/// search column.
fn search_field<'s>(expr: &Expr, schema: &'s Schema, search_column: &str) -> Option<&'s Field> {
    let Expr::Column(column) = expr else {
        return None;
    };
    schema
        .field_with_name(&column.name)
        .ok()
        .filter(|field| field.name() == search_column)
}

fn pattern_operator(predicate: &Expr, like: &Like) -> String {
    let name = match (predicate, like.case_insensitive) {
        (Expr::SimilarTo(_), _) => "SIMILAR TO",
        (_, true) => "ILIKE",
        (_, false) => "LIKE",
    };
    if like.negated {
        format!("NOT {}", name)
    } else {
        name.to_string()
    }
}

fn literal_text(value: &ScalarValue) -> Option<String> {
    match value {
        ScalarValue::Utf8(Some(s))
        | ScalarValue::LargeUtf8(Some(s))
        | ScalarValue::Utf8View(Some(s)) => Some(s.clone()),
        v if v.is_null() => None,
        v => Some(v.to_string()),
    }
}

/// Fold [`translate_predicate`] over `predicates`, building the remote
/// request and classifying every predicate.
pub fn plan_request<'a, I>(
    endpoint: &str,
    predicates: I,
    schema: &Schema,
    search_column: &str,
) -> Result<RequestPlan, ScanError>
where
    I: IntoIterator<Item = &'a Expr>,
{
    let mut plan = RequestPlan::unfiltered(endpoint);

    for predicate in predicates {
        match translate_predicate(predicate, schema, search_column)? {
            Some(param) => {
                if param.key() == SEARCH_PARAM {
                    if plan.search_term.is_some() {
                        return Err(ScanError::DuplicateSearchTerm {
                            column: search_column.to_string(),
                        });
                    }
                    plan.search_term = Some(param.value().to_string());
                }
                plan.request.push(param);
                plan.classifications.push(Classification::Pushdown);
            }
            None => plan.classifications.push(Classification::Local),
        }
    }

    debug!(
        url = %plan.request,
        pushdown = plan.request.params().len(),
        local = plan.classifications.len() - plan.request.params().len(),
        "Planned search request"
    );

    Ok(plan)
}
