//! main client
//!
//! http access to the instance endpoints and a data model's graphql endpoint,
//! plus the [`QueryTransport`] implementation the query executor runs on.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::graphql::GraphQlResponse;
use crate::ids::{DataModelId, InstanceRef, ViewId};
use crate::instances::{
    AggregateRequest, AggregateResponse, AppliedInstance, AppliedList, ApplyRequest, ByIdsRequest,
    DeleteRequest, Instance, InstanceApply, InstanceList, ListRequest, SearchRequest, SourceRef,
    INSTANCE_ITEM_LIMIT,
};
use crate::pagination::{Page, Paginator};
use crate::query::{QueryBuilder, QueryRequest, QueryResponse, QueryTransport};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// data modeling client for one cdf project
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    http: reqwest::Client,
}

impl Client {
    /// create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = match &config.http_client {
            Some(http) => http.clone(),
            None => {
                let mut headers = HeaderMap::new();
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {}", config.token)).map_err(|err| {
                        Error::Config(format!("invalid api token header value: {err}"))
                    })?,
                );
                headers.insert(
                    "x-cdp-sdk",
                    HeaderValue::from_str(&format!("CognitePygenRust:{}", env!("CARGO_PKG_VERSION")))
                        .map_err(|err| Error::Config(format!("invalid sdk header value: {err}")))?,
                );
                headers.insert(
                    "x-cdp-app",
                    HeaderValue::from_str(&config.client_name)
                        .map_err(|err| Error::Config(format!("invalid client name: {err}")))?,
                );
                headers.extend(config.extra_headers.clone());

                let mut builder = reqwest::Client::builder()
                    .default_headers(headers)
                    .user_agent(config.user_agent.clone())
                    .timeout(config.timeout)
                    .danger_accept_invalid_certs(!config.verify_ssl);
                if let Some(customize) = &config.http_client_builder {
                    builder = customize(builder);
                }
                builder.build()?
            }
        };

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    /// access the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// run one round of a multi-step query
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        self.post("query", request).await
    }

    /// run a query builder to completion and unpack the result
    pub async fn execute_query(
        &self,
        builder: &mut QueryBuilder,
    ) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
        builder.execute(self).await
    }

    pub async fn aggregate(&self, request: &AggregateRequest) -> Result<AggregateResponse> {
        self.post("aggregate", request).await
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Instance>> {
        let list: InstanceList = self.post("search", request).await?;
        Ok(list.items)
    }

    /// fetch one page of a list request
    pub async fn list(&self, request: &ListRequest) -> Result<InstanceList> {
        self.post("list", request).await
    }

    /// follow list cursors until exhausted or `limit` instances are collected
    pub async fn list_all(&self, request: ListRequest, limit: Option<u64>) -> Result<Vec<Instance>> {
        let request = match limit {
            Some(0) => return Ok(Vec::new()),
            Some(limit) => request.with_limit(limit),
            None => request,
        };

        let paginator = Paginator::new(
            |cursor: Option<String>| {
                let mut request = request.clone();
                request.cursor = cursor;
                async move { self.list(&request).await }
            },
            |list: InstanceList| {
                Ok(Page {
                    items: list.items,
                    next_cursor: list.next_cursor,
                })
            },
        );

        let limit = limit.map(|limit| usize::try_from(limit).unwrap_or(usize::MAX));
        paginator.collect_up_to(limit).await
    }

    /// fetch instances by id, reading properties through `sources`
    pub async fn retrieve(&self, ids: &[InstanceRef], sources: &[ViewId]) -> Result<Vec<Instance>> {
        let sources: Vec<SourceRef> = sources
            .iter()
            .map(|view| SourceRef {
                source: view.clone(),
            })
            .collect();

        let mut items = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(INSTANCE_ITEM_LIMIT) {
            let request = ByIdsRequest {
                items: chunk.to_vec(),
                sources: sources.clone(),
            };
            let list: InstanceList = self.post("byids", &request).await?;
            items.extend(list.items);
        }
        Ok(items)
    }

    /// create or update nodes and edges
    pub async fn apply(&self, items: Vec<InstanceApply>, replace: bool) -> Result<Vec<AppliedInstance>> {
        let mut applied = Vec::with_capacity(items.len());
        for chunk in items.chunks(INSTANCE_ITEM_LIMIT) {
            let request = ApplyRequest {
                items: chunk.to_vec(),
                auto_create_direct_relations: true,
                replace,
            };
            let result: AppliedList = self.post("", &request).await?;
            applied.extend(result.items);
        }
        Ok(applied)
    }

    /// delete instances, returning the ids the service deleted
    pub async fn delete(&self, ids: Vec<InstanceRef>) -> Result<Vec<InstanceRef>> {
        let mut deleted = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(INSTANCE_ITEM_LIMIT) {
            let request = DeleteRequest {
                items: chunk.to_vec(),
            };
            let result: DeleteRequest = self.post("delete", &request).await?;
            deleted.extend(result.items);
        }
        Ok(deleted)
    }

    /// execute a raw graphql query against a data model
    pub async fn graphql_query(
        &self,
        data_model: &DataModelId,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<GraphQlResponse<serde_json::Value>> {
        self.graphql(data_model, query, variables).await
    }

    /// execute a graphql query and deserialize into a typed response
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        data_model: &DataModelId,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<GraphQlResponse<T>> {
        self.graphql_with(data_model, query, variables, |url, body| async move {
            let response = self.http.post(url).json(&body).send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok((status, text))
        })
        .await
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.instances_url(endpoint)?;
        let body = serde_json::to_value(body)?;
        self.post_with(url, body, |url, body| async move {
            let response = self.http.post(url).json(&body).send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok((status, text))
        })
        .await
    }
}

#[async_trait]
impl QueryTransport for Client {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        Client::query(self, request).await
    }

    async fn aggregate(&self, request: &AggregateRequest) -> Result<AggregateResponse> {
        Client::aggregate(self, request).await
    }
}

fn parse_api_response<T: DeserializeOwned>(status: StatusCode, text: String) -> Result<T> {
    if !status.is_success() {
        return Err(Error::from_api_body(status.as_u16(), text));
    }
    Ok(serde_json::from_str(&text)?)
}

fn parse_graphql_response<T: DeserializeOwned>(
    status: StatusCode,
    text: String,
) -> Result<GraphQlResponse<T>> {
    let parsed: GraphQlResponse<T> = serde_json::from_str(&text)?;
    if !parsed.errors.is_empty() {
        let message = parsed
            .errors
            .first()
            .map(|err| err.message.clone())
            .unwrap_or_else(|| "graphql error".to_string());
        return Err(Error::GraphQl {
            status: Some(status.as_u16()),
            errors: parsed.errors,
            body: text,
            message,
        });
    }

    if !status.is_success() {
        return Err(Error::GraphQl {
            status: Some(status.as_u16()),
            errors: Vec::new(),
            body: text,
            message: format!("graphql http error: {}", status),
        });
    }

    Ok(parsed)
}

impl Client {
    pub(crate) async fn post_with<T, F, Fut>(
        &self,
        url: Url,
        body: serde_json::Value,
        send: F,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce(Url, serde_json::Value) -> Fut,
        Fut: Future<Output = Result<(StatusCode, String)>>,
    {
        debug!(url = %url, "posting to data modeling api");
        let (status, text) = send(url, body).await?;
        parse_api_response(status, text)
    }

    pub(crate) async fn graphql_with<T: DeserializeOwned, F, Fut>(
        &self,
        data_model: &DataModelId,
        query: &str,
        variables: Option<serde_json::Value>,
        send: F,
    ) -> Result<GraphQlResponse<T>>
    where
        F: FnOnce(Url, serde_json::Value) -> Fut,
        Fut: Future<Output = Result<(StatusCode, String)>>,
    {
        let url = self.config.graphql_url(data_model)?;
        let body = serde_json::json!({
            "query": query,
            "variables": variables.unwrap_or_else(|| serde_json::json!({})),
        });

        debug!(url = %url, "posting graphql query");
        let (status, text) = send(url, body).await?;
        parse_graphql_response(status, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryStep;
    use serde::Deserialize;

    fn test_config() -> ClientConfig {
        ClientConfig::new("http://localhost:1234", "windfarm", "test-token")
    }

    fn test_client(config: ClientConfig) -> Client {
        config.validate().unwrap();
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("test http client");
        Client {
            config: Arc::new(config),
            http,
        }
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_list_all_zero_limit_sends_nothing() {
        // nothing listens on the discard port, so any request would fail
        let client = test_client(ClientConfig::new("http://127.0.0.1:9", "windfarm", "t"));
        let request = ListRequest::nodes(&ViewId::new("power", "WindTurbine", "1"));
        let items = client.list_all(request, Some(0)).await.unwrap();
        assert!(items.is_empty());
    }

    fn data_model() -> DataModelId {
        DataModelId::new("power", "WindFarm", "1")
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_post_with_parses_query_response() {
        let client = test_client(test_config());
        let builder = QueryBuilder::new()
            .with_step(QueryStep::nodes("turbines", None))
            .unwrap();
        let url = client.config.instances_url("query").unwrap();
        let body = serde_json::to_value(builder.build()).unwrap();

        let response: QueryResponse = client
            .post_with(url, body, |url, body| async move {
                assert_eq!(url.path(), "/api/v1/projects/windfarm/models/instances/query");
                assert!(body["with"]["turbines"]["nodes"].is_object());
                Ok((
                    StatusCode::OK,
                    r#"{"items": {"turbines": []}, "nextCursor": {"turbines": null}}"#.to_string(),
                ))
            })
            .await
            .unwrap();

        assert!(response.items["turbines"].is_empty());
        assert_eq!(response.next_cursor["turbines"], None);
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_post_with_api_error() {
        let client = test_client(test_config());
        let url = client.config.instances_url("query").unwrap();
        let err = client
            .post_with::<QueryResponse, _, _>(url, serde_json::json!({}), |_url, _body| async move {
                Ok((
                    StatusCode::REQUEST_TIMEOUT,
                    r#"{"error": {"code": 408, "message": "Graph query timed out"}}"#.to_string(),
                ))
            })
            .await
            .unwrap_err();
        assert!(err.is_request_too_large());
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_graphql_sets_url_and_body() {
        let client = test_client(test_config());
        let response = client
            .graphql_with::<serde_json::Value, _, _>(
                &data_model(),
                "query { listWindTurbine { items { name } } }",
                None,
                |url, body| async move {
                    assert_eq!(
                        url.path(),
                        "/api/v1/projects/windfarm/userapis/spaces/power/datamodels/WindFarm/versions/1/graphql"
                    );
                    assert_eq!(body["query"], "query { listWindTurbine { items { name } } }");
                    assert_eq!(body["variables"], serde_json::json!({}));
                    Ok((
                        StatusCode::OK,
                        r#"{"data": {"listWindTurbine": {"items": [{"name": "wt-1"}]}}}"#.to_string(),
                    ))
                },
            )
            .await
            .unwrap();

        assert_eq!(
            response.data.unwrap()["listWindTurbine"]["items"][0]["name"],
            "wt-1"
        );
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_graphql_error() {
        let client = test_client(test_config());
        let err = client
            .graphql_with::<serde_json::Value, _, _>(
                &data_model(),
                "query { ok }",
                None,
                |_url, _body| async move {
                    Ok((
                        StatusCode::OK,
                        "{\"data\": null, \"errors\": [{\"message\": \"boom\"}]}".to_string(),
                    ))
                },
            )
            .await;

        assert!(matches!(err, Err(Error::GraphQl { .. })));
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_graphql_typed_success() {
        #[derive(Debug, Deserialize)]
        struct Data {
            value: i64,
        }
        let client = test_client(test_config());
        let response = client
            .graphql_with::<Data, _, _>(&data_model(), "query { value }", None, |_url, _body| async move {
                Ok((StatusCode::OK, "{\"data\": {\"value\": 7}}".to_string()))
            })
            .await
            .unwrap();

        assert_eq!(response.data.unwrap().value, 7);
    }

    #[test]
    fn test_invalid_token_header() {
        let config = ClientConfig::new("http://localhost:1234", "windfarm", "bad\ntoken");
        let err = Client::new(config).err().expect("expected error");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_new_uses_prebuilt_http_client() {
        let config = ClientConfig::new("http://localhost:1234", "windfarm", "")
            .with_http_client(reqwest::Client::new());
        let client = Client::new(config).unwrap();
        assert_eq!(client.config().project(), "windfarm");
    }

    #[test]
    fn test_parse_api_response_success() {
        let text = r#"{"items": [], "nextCursor": "abc"}"#.to_string();
        let parsed: InstanceList = parse_api_response(StatusCode::OK, text).unwrap();
        assert!(parsed.items.is_empty());
        assert_eq!(parsed.next_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parse_api_response_error() {
        let text = r#"{"error": {"code": 400, "message": "Invalid view", "missing": [{"space": "s"}]}}"#.to_string();
        let err = parse_api_response::<InstanceList>(StatusCode::BAD_REQUEST, text).unwrap_err();
        assert!(matches!(
            err,
            Error::Api {
                status: 400,
                code: 400,
                ref missing,
                ..
            } if missing.len() == 1
        ));
    }

    #[test]
    fn test_parse_graphql_response_http_error() {
        let text = "{\"data\": null}".to_string();
        let err =
            parse_graphql_response::<serde_json::Value>(StatusCode::BAD_GATEWAY, text).unwrap_err();
        assert!(matches!(
            err,
            Error::GraphQl {
                status: Some(502),
                ..
            }
        ));
    }
}
