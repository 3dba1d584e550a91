use crate::core::error::{CheckerError, Result};
use crate::core::query::MatchMode;
use crate::core::services::SearchParams;
use crate::db::models::CredentialMatch;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

/// Longest accepted query string, in characters
pub const MAX_QUERY_LENGTH: usize = 1000;

/// Field names a request body may carry, with their camelCase aliases
const REQUEST_FIELDS: [(&str, &str); 3] = [
    ("query_string", "queryString"),
    ("ignore_case", "ignoreCase"),
    ("include_substring_matches", "includeSubstringMatches"),
];

fn default_ignore_case() -> bool {
    true
}

/// Body of POST /search/password and POST /search/username
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    #[serde(default, alias = "queryString")]
    pub query_string: Option<String>,
    #[serde(default = "default_ignore_case", alias = "ignoreCase")]
    pub ignore_case: bool,
    #[serde(default, alias = "includeSubstringMatches")]
    pub include_substring_matches: bool,
}

impl SearchRequest {
    /// Check the request shape and turn it into search parameters
    pub fn validate(self) -> Result<SearchParams> {
        let query_string = self
            .query_string
            .ok_or_else(|| CheckerError::validation("query_string", "field is required"))?;

        let length = query_string.chars().count();
        if length == 0 {
            return Err(CheckerError::validation("query_string", "must not be empty"));
        }
        if length > MAX_QUERY_LENGTH {
            return Err(CheckerError::validation(
                "query_string",
                format!("must be at most {} characters, got {}", MAX_QUERY_LENGTH, length),
            ));
        }

        Ok(SearchParams {
            query_string,
            mode: MatchMode {
                ignore_case: self.ignore_case,
                include_substring_matches: self.include_substring_matches,
            },
        })
    }
}

/// Map a body that could not be parsed to a validation error, naming the
/// offending field when the parser reports one
pub fn rejection_to_validation(rejection: JsonRejection) -> CheckerError {
    let text = rejection.body_text();
    CheckerError::validation(rejected_field(&text), text)
}

fn rejected_field(text: &str) -> &'static str {
    let path = text
        .split_once("target type: ")
        .and_then(|(_, rest)| rest.split_once(": "))
        .map(|(path, _)| path);

    REQUEST_FIELDS
        .iter()
        .find(|(snake, camel)| path == Some(*snake) || path == Some(*camel))
        .map(|(snake, _)| *snake)
        .unwrap_or("body")
}

/// One entry of a search response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StringMatch {
    pub matched_string: String,
    pub source: String,
}

impl From<CredentialMatch> for StringMatch {
    fn from(m: CredentialMatch) -> Self {
        Self {
            matched_string: m.matched_string,
            source: m.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SearchRequest {
        serde_json::from_str(json).unwrap()
    }

    fn field_of(err: CheckerError) -> String {
        match err {
            CheckerError::ValidationError { field, .. } => field,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let params = parse(r#"{"query_string": "hunter2"}"#).validate().unwrap();
        assert_eq!(params.query_string, "hunter2");
        assert!(params.mode.ignore_case);
        assert!(!params.mode.include_substring_matches);
    }

    #[test]
    fn test_camel_case_aliases() {
        let params = parse(r#"{"queryString": "x", "ignoreCase": false, "includeSubstringMatches": true}"#)
            .validate()
            .unwrap();
        assert_eq!(params.query_string, "x");
        assert!(!params.mode.ignore_case);
        assert!(params.mode.include_substring_matches);
    }

    #[test]
    fn test_missing_and_empty_rejected() {
        assert_eq!(field_of(parse("{}").validate().unwrap_err()), "query_string");
        assert_eq!(
            field_of(parse(r#"{"query_string": ""}"#).validate().unwrap_err()),
            "query_string"
        );
    }

    #[test]
    fn test_length_counts_characters() {
        let at_limit = "é".repeat(MAX_QUERY_LENGTH);
        let request = SearchRequest {
            query_string: Some(at_limit),
            ignore_case: true,
            include_substring_matches: false,
        };
        assert!(request.validate().is_ok());

        let request = SearchRequest {
            query_string: Some("a".repeat(MAX_QUERY_LENGTH + 1)),
            ignore_case: true,
            include_substring_matches: false,
        };
        assert_eq!(field_of(request.validate().unwrap_err()), "query_string");
    }

    #[test]
    fn test_rejected_field_from_parser_message() {
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: ignoreCase: invalid type: string \"yes\", expected a boolean at line 1 column 30"
            ),
            "ignore_case"
        );
        assert_eq!(
            rejected_field("Failed to parse the request body as JSON: expected value at line 1 column 1"),
            "body"
        );
    }
}
