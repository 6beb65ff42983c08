//! graphql types
//!
//! wrappers for responses from a data model's graphql endpoint.

use serde::{Deserialize, Serialize};

/// body returned by a data model's graphql endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlResponse<T> {
    /// `None` when the query failed as a whole
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

impl<T> GraphQlResponse<T> {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// one entry of the `errors` array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    /// positions in the query text the error refers to
    #[serde(default)]
    pub locations: Vec<GraphQlLocation>,
    /// field path into `data`, names and list indices
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
}

/// 1-based line and column in the query text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlLocation {
    pub line: i64,
    pub column: i64,
}

/// `listX` / `getX` connection payload returned by the data model endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlConnection<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// absent unless the query selects `pageInfo`
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

/// cursor state of a connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_array_is_optional() {
        let ok: GraphQlResponse<serde_json::Value> =
            serde_json::from_str(r#"{"data": {"listBlade": {"items": []}}}"#).unwrap();
        assert!(!ok.has_errors());

        let failed: GraphQlResponse<serde_json::Value> = serde_json::from_str(
            r#"{"data": null, "errors": [{"message": "Unknown field 'blades'", "locations": [{"line": 1, "column": 9}], "path": ["listWindTurbine", 0]}]}"#,
        )
        .unwrap();
        assert!(failed.has_errors());
        assert!(failed.data.is_none());
        assert_eq!(failed.errors[0].locations[0].column, 9);
        assert_eq!(failed.errors[0].path.len(), 2);
    }

    #[test]
    fn test_connection_page_info() {
        let raw = serde_json::json!({
            "items": [{"externalId": "turbine:1"}],
            "pageInfo": {"hasNextPage": true, "endCursor": "abc"}
        });
        let connection: GraphQlConnection<serde_json::Value> =
            serde_json::from_value(raw).unwrap();
        assert_eq!(connection.items.len(), 1);
        let page_info = connection.page_info.unwrap();
        assert!(page_info.has_next_page);
        assert_eq!(page_info.end_cursor.as_deref(), Some("abc"));
    }
}
