//! API request and response DTOs

use crate::search::SearchResult;
use crate::stats::StatisticsData;
use serde::{Deserialize, Serialize};

/// Envelope for endpoints that return only success or failure
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub result: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            result: true,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: false,
            error: Some(message.into()),
        }
    }
}

/// Response body of `GET /api/statistics`
#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub result: bool,
    pub statistics: StatisticsData,
}

/// Response body of `GET /api/search`
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub result: bool,
    pub count: usize,
    pub data: Vec<SearchResult>,
}

/// Query parameters of `GET /api/search`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub site: Option<String>,

    #[serde(default)]
    pub offset: Option<usize>,

    #[serde(default)]
    pub limit: Option<usize>,
}

/// Form body of `POST /api/indexPage`
#[derive(Debug, Deserialize)]
pub struct IndexPageForm {
    #[serde(default)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response_omits_error() {
        let json = serde_json::to_string(&ApiResponse::ok()).unwrap();
        assert_eq!(json, r#"{"result":true}"#);
    }

    #[test]
    fn test_error_response_includes_message() {
        let json = serde_json::to_string(&ApiResponse::error("nope")).unwrap();
        assert_eq!(json, r#"{"result":false,"error":"nope"}"#);
    }
}
