//! Request body validation for `POST /query`
//!
//! Validation runs on the raw body bytes so every failure mode (empty body,
//! broken JSON, wrong shape) produces the same structured error list.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// One validation problem, located by path into the request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationIssue {
    fn new(loc: Vec<Value>, msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    /// Body exceeded the accepted size, or could not be read at all
    pub fn body_too_large(limit: usize) -> Self {
        Self::new(
            vec![json!("body")],
            format!("Request body must be at most {} bytes", limit),
            "too_long",
        )
    }
}

/// Parse a query request, or report every problem found
pub fn validate_query(body: &[u8]) -> Result<QueryRequest, Vec<ValidationIssue>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(vec![ValidationIssue::new(
            vec![json!("body")],
            "Field required",
            "missing",
        )]);
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        vec![ValidationIssue::new(
            vec![json!("body"), json!(e.column())],
            format!("JSON decode error: {}", e),
            "json_invalid",
        )]
    })?;

    let Some(object) = value.as_object() else {
        return Err(vec![ValidationIssue::new(
            vec![json!("body")],
            "Input should be a valid dictionary or object",
            "model_attributes_type",
        )]);
    };

    match object.get("query") {
        None => Err(vec![ValidationIssue::new(
            vec![json!("body"), json!("query")],
            "Field required",
            "missing",
        )]),
        Some(Value::String(query)) => Ok(QueryRequest {
            query: query.clone(),
        }),
        Some(_) => Err(vec![ValidationIssue::new(
            vec![json!("body"), json!("query")],
            "Input should be a valid string",
            "string_type",
        )]),
    }
}
